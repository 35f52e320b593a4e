//! # Urbex API gateway
//!
//! `urbex` is a thin REST gateway in front of two managed services: an identity
//! provider (Amazon Cognito user pools) and a transactional email provider
//! (Mailgun). It owns no storage and keeps no cross-request state.
//!
//! ## Request flow
//!
//! Every request runs the same one-way pipeline:
//!
//! 1. **Validation** (`api::validation`): raw JSON is turned into typed records or a
//!    `ValidationError` listing every offending field. Nothing reaches a provider
//!    before validation succeeds.
//! 2. **Delegation** (`api::identity`, `api::email`): the only modules that talk to
//!    a provider. Provider error codes are translated once, there, into a small
//!    closed taxonomy.
//! 3. **Response mapping** (`api::handlers`): results become the uniform
//!    `{success, message, data}` envelope, failures the `{success: false, message}`
//!    envelope with a fixed status per taxonomy kind.
//!
//! ## Security properties
//!
//! - Tokens are opaque: they are issued and verified by the identity provider and
//!   forwarded verbatim. No token cryptography happens here.
//! - A wrong password and an unknown username produce byte-identical login failures.
//! - The contact route sits behind a static API-key allow-set, checked before the
//!   body is validated.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
