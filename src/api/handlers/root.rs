use axum::response::{IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct Welcome {
    message: String,
    version: String,
    docs: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = Welcome)
    ),
    tag = "health",
)]
pub async fn root() -> impl IntoResponse {
    Json(Welcome {
        message: format!("Welcome to {}", env!("CARGO_PKG_NAME")),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/docs".to_string(),
    })
}
