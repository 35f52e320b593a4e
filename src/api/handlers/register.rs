use axum::{Json, extract::Extension, http::StatusCode, response::Response};
use serde_json::Value;
use tracing::{info, instrument};

use super::{ApiError, Envelope, ErrorEnvelope, payload_from, respond};
use crate::api::{
    identity::{Identity, Registration},
    validation::RegistrationRequest,
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegistrationRequest,
    responses(
        (status = 201, description = "Account created", body = Envelope<Registration>),
        (status = 400, description = "Malformed body or weak password", body = ErrorEnvelope),
        (status = 409, description = "Username or email already registered", body = ErrorEnvelope),
        (status = 422, description = "Validation error", body = ErrorEnvelope),
        (status = 503, description = "Identity provider unavailable", body = ErrorEnvelope)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    identity: Extension<Identity>,
    payload: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    let payload = payload_from(payload)?;
    let request = RegistrationRequest::from_payload(&payload)?;

    let registration = identity.register(&request).await?;
    info!(username = %registration.username, "account registered");

    let message = if registration.confirmation_required {
        "User registered successfully. Please check your email for confirmation."
    } else {
        "User registered successfully"
    };

    Ok(respond(StatusCode::CREATED, message, registration))
}
