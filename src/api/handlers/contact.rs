use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::{ApiError, Envelope, ErrorEnvelope, payload_from, respond};
use crate::api::{access::ApiKeyGate, email::Mailer, validation::ContactMessage};

const CONTACT_SENT: &str = "Mensaje enviado exitosamente. Te responderemos pronto.";

/// Echo of an accepted submission.
#[derive(ToSchema, Serialize, Debug)]
pub struct ContactSubmission {
    #[schema(example = "Juan Pérez")]
    pub full_name: String,
    #[schema(example = "juan.perez@example.com")]
    pub email: String,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/v1/contact",
    request_body = ContactMessage,
    params(
        ("X-API-Key" = Option<String>, Header, description = "Required when API key enforcement is enabled")
    ),
    responses(
        (status = 200, description = "Contact notification sent", body = Envelope<ContactSubmission>),
        (status = 400, description = "Malformed body", body = ErrorEnvelope),
        (status = 403, description = "Invalid or missing API key", body = ErrorEnvelope),
        (status = 422, description = "Validation error", body = ErrorEnvelope),
        (status = 502, description = "Email provider rejected the message", body = ErrorEnvelope),
        (status = 503, description = "Email provider unavailable", body = ErrorEnvelope)
    ),
    security(("api_key" = [])),
    tag = "contact"
)]
#[instrument(skip_all)]
pub async fn contact(
    headers: HeaderMap,
    gate: Extension<Arc<ApiKeyGate>>,
    mailer: Extension<Mailer>,
    payload: Option<Json<Value>>,
) -> Result<Response, ApiError> {
    // The key is checked before the body is even looked at.
    if !gate.allows_headers(&headers) {
        debug!("contact submission without a valid API key");
        return Err(ApiError::Forbidden);
    }

    let payload = payload_from(payload)?;
    let message = ContactMessage::from_payload(&payload)?;

    let receipt = mailer.send(&message).await?;
    info!(id = %receipt.provider_message_id, "contact form delivered");

    let submission = ContactSubmission {
        full_name: message.full_name,
        email: message.email,
        timestamp: Utc::now(),
    };

    Ok(respond(StatusCode::OK, CONTACT_SENT, submission))
}
