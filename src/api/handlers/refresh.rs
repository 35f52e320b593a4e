use axum::{Json, extract::Extension, http::StatusCode, response::Response};
use serde_json::Value;
use tracing::instrument;

use super::{ApiError, Envelope, ErrorEnvelope, payload_from, respond};
use crate::api::{
    identity::{Identity, TokenBundle},
    validation::{RefreshRequest, ValidationError},
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    description = "`username` is required when the identity provider client has a secret.",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = Envelope<TokenBundle>),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorEnvelope),
        (status = 422, description = "Validation error", body = ErrorEnvelope),
        (status = 503, description = "Identity provider unavailable", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    identity: Extension<Identity>,
    payload: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    let payload = payload_from(payload)?;
    let request = RefreshRequest::from_payload(&payload)?;
    if request.username.is_none() && identity.refresh_requires_username() {
        return Err(ValidationError::missing("username").into());
    }

    let tokens = identity.refresh(&request).await?;

    Ok(respond(StatusCode::OK, "Token refreshed successfully", tokens))
}
