use axum::{Json, extract::Extension, http::StatusCode, response::Response};
use serde_json::Value;
use tracing::instrument;

use super::{ApiError, Envelope, ErrorEnvelope, payload_from, respond};
use crate::api::{
    identity::{Identity, TokenBundle},
    validation::LoginRequest,
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued", body = Envelope<TokenBundle>),
        (status = 401, description = "Invalid username or password", body = ErrorEnvelope),
        (status = 403, description = "Account not confirmed", body = ErrorEnvelope),
        (status = 422, description = "Validation error", body = ErrorEnvelope),
        (status = 503, description = "Identity provider unavailable", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    identity: Extension<Identity>,
    payload: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    let payload = payload_from(payload)?;
    let request = LoginRequest::from_payload(&payload)?;

    // Unknown user and wrong password both surface as InvalidCredentials.
    let tokens = identity.login(&request).await?;

    Ok(respond(StatusCode::OK, "Login successful", tokens))
}
