use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use tracing::{info, instrument};

use super::{ApiError, Envelope, ErrorEnvelope, bearer_token, respond};
use crate::api::identity::{Identity, Revocation};

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Session revoked", body = Envelope<Revocation>),
        (status = 401, description = "Missing, invalid or expired access token", body = ErrorEnvelope),
        (status = 503, description = "Identity provider unavailable", body = ErrorEnvelope)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    identity: Extension<Identity>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)?;

    let revocation = identity.logout(token).await?;
    info!("session revoked");

    Ok(respond(
        StatusCode::OK,
        "User logged out successfully",
        revocation,
    ))
}
