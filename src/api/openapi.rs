use crate::api::{
    email::ContactReceipt,
    handlers::{
        ErrorEnvelope, confirm, contact, contact::ContactSubmission, health, login, logout, me,
        refresh, register, root,
    },
    identity::{Confirmation, CurrentUserView, Registration, Revocation, TokenBundle},
    validation::{
        ConfirmationRequest, ContactMessage, FieldError, LoginRequest, RefreshRequest,
        RegistrationRequest,
    },
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        register::register,
        confirm::confirm,
        login::login,
        refresh::refresh,
        me::me,
        logout::logout,
        contact::contact,
    ),
    components(schemas(
        RegistrationRequest,
        ConfirmationRequest,
        LoginRequest,
        RefreshRequest,
        ContactMessage,
        Registration,
        Confirmation,
        TokenBundle,
        CurrentUserView,
        Revocation,
        ContactSubmission,
        ContactReceipt,
        ErrorEnvelope,
        FieldError,
        health::Health,
        root::Welcome,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Account lifecycle delegated to the identity provider"),
        (name = "contact", description = "Landing page contact form"),
        (name = "health", description = "Service status"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                crate::api::access::API_KEY_HEADER,
            ))),
        );
    }
}

/// `OpenAPI` document for every route, served at `/api-docs/openapi.json`.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
