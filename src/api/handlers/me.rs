use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use tracing::instrument;

use super::{ApiError, Envelope, ErrorEnvelope, bearer_token, respond};
use crate::api::identity::{CurrentUserView, Identity};

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Authenticated user", body = Envelope<CurrentUserView>),
        (status = 401, description = "Missing, invalid or expired access token", body = ErrorEnvelope),
        (status = 503, description = "Identity provider unavailable", body = ErrorEnvelope)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn me(identity: Extension<Identity>, headers: HeaderMap) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)?;

    // Re-resolved on every call, never cached.
    let user = identity.current_user(token).await?;

    Ok(respond(
        StatusCode::OK,
        "User information retrieved successfully",
        user,
    ))
}
