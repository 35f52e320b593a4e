use crate::api::{
    access::{ApiKeyGate, CorsConfig},
    email::Mailer,
    handlers::{confirm, contact, health, login, logout, me, refresh, register, root},
    identity::Identity,
};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    http::{
        HeaderName, HeaderValue, Request,
        header::{CACHE_CONTROL, EXPIRES, PRAGMA},
    },
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    trace::TraceLayer,
};
use tracing::{Span, debug_span, info};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod access;
pub mod email;
pub mod handlers;
pub mod identity;
pub mod openapi;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

const REQUEST_ID: &str = "x-request-id";

/// Build the application router with its delegates.
///
/// CORS is applied by [`new`] so tests can drive the router without it.
#[must_use]
pub fn router(identity: Identity, mailer: Mailer, gate: ApiKeyGate) -> Router {
    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .route("/api/v1/auth/register", post(register::register))
        .route("/api/v1/auth/confirm", post(confirm::confirm))
        .route("/api/v1/auth/login", post(login::login))
        .route("/api/v1/auth/refresh", post(refresh::refresh))
        .route("/api/v1/auth/me", get(me::me))
        .route("/api/v1/auth/logout", post(logout::logout))
        .route("/api/v1/contact", post(contact::contact))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(SetResponseHeaderLayer::overriding(
                    CACHE_CONTROL,
                    HeaderValue::from_static("no-cache, no-store, must-revalidate"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    PRAGMA,
                    HeaderValue::from_static("no-cache"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    EXPIRES,
                    HeaderValue::from_static("0"),
                ))
                .layer(Extension(identity))
                .layer(Extension(mailer))
                .layer(Extension(Arc::new(gate))),
        )
}

/// Serve the gateway until ctrl-c or SIGTERM.
/// # Errors
/// Returns an error if the CORS policy is invalid or the server fails to start
pub async fn new(
    port: u16,
    identity: Identity,
    mailer: Mailer,
    gate: ApiKeyGate,
    cors: &CorsConfig,
) -> Result<()> {
    let app = router(identity, mailer, gate).layer(cors.layer()?);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            info!("Failed to listen for ctrl-c: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                info!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    // Headers are not recorded: they carry bearer tokens and API keys.
    debug_span!("http-request", method, path, request_id)
}
