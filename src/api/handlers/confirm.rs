use axum::{Json, extract::Extension, http::StatusCode, response::Response};
use serde_json::Value;
use tracing::instrument;

use super::{ApiError, Envelope, ErrorEnvelope, payload_from, respond};
use crate::api::{
    identity::{Confirmation, Identity},
    validation::ConfirmationRequest,
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/confirm",
    request_body = ConfirmationRequest,
    responses(
        (status = 200, description = "Account confirmed", body = Envelope<Confirmation>),
        (status = 400, description = "Invalid or expired confirmation code", body = ErrorEnvelope),
        (status = 404, description = "Unknown username", body = ErrorEnvelope),
        (status = 422, description = "Validation error", body = ErrorEnvelope),
        (status = 503, description = "Identity provider unavailable", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn confirm(
    identity: Extension<Identity>,
    payload: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    let payload = payload_from(payload)?;
    let request = ConfirmationRequest::from_payload(&payload)?;

    let confirmation = identity.confirm(&request).await?;

    Ok(respond(
        StatusCode::OK,
        "User confirmed successfully",
        confirmation,
    ))
}
