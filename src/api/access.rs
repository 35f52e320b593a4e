//! Cross-cutting access policy: static API keys and CORS.

use anyhow::{Context, Result, anyhow};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use constant_time_eq::constant_time_eq;
use secrecy::{ExposeSecret, SecretString};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

pub const API_KEY_HEADER: &str = "x-api-key";
const WILDCARD: &str = "*";

/// Static API-key comparison for the routes that require it.
#[derive(Clone, Debug, Default)]
pub struct ApiKeyGate {
    enforce: bool,
    keys: Vec<SecretString>,
}

impl ApiKeyGate {
    /// Blank entries are dropped.
    ///
    /// # Errors
    /// Returns an error when the gate is enforced without any key, which would lock every
    /// caller out.
    pub fn new(enforce: bool, keys: Vec<String>) -> Result<Self> {
        let keys: Vec<SecretString> = keys
            .into_iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(SecretString::from)
            .collect();

        if enforce && keys.is_empty() {
            return Err(anyhow!(
                "API key enforcement is enabled but no API keys are configured"
            ));
        }

        Ok(Self { enforce, keys })
    }

    /// Gate that lets every request through.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_enforced(&self) -> bool {
        self.enforce
    }

    /// Every configured key is compared in constant time, so a near match takes as long as a miss.
    #[must_use]
    pub fn allows(&self, presented: Option<&str>) -> bool {
        if !self.enforce {
            return true;
        }
        presented.is_some_and(|key| {
            self.keys.iter().fold(false, |matched, allowed| {
                constant_time_eq(allowed.expose_secret().as_bytes(), key.as_bytes()) | matched
            })
        })
    }

    #[must_use]
    pub fn allows_headers(&self, headers: &HeaderMap) -> bool {
        self.allows(headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()))
    }
}

/// Allow-lists for the CORS layer, `*` meaning any.
#[derive(Clone, Debug)]
pub struct CorsConfig {
    origins: Vec<String>,
    methods: Vec<String>,
    headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        let any = vec![WILDCARD.to_string()];
        Self {
            origins: any.clone(),
            methods: any.clone(),
            headers: any,
        }
    }
}

impl CorsConfig {
    #[must_use]
    pub fn new(origins: Vec<String>, methods: Vec<String>, headers: Vec<String>) -> Self {
        Self {
            origins,
            methods,
            headers,
        }
    }

    /// Build the layer; fails on values that are not valid origins, methods or header names.
    ///
    /// # Errors
    /// Returns an error if any entry cannot be parsed.
    pub fn layer(&self) -> Result<CorsLayer> {
        let origins = if is_wildcard(&self.origins) {
            AllowOrigin::from(Any)
        } else {
            let origins = self
                .origins
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .with_context(|| format!("Invalid CORS origin: {origin}"))
                })
                .collect::<Result<Vec<_>>>()?;
            AllowOrigin::list(origins)
        };

        let methods = if is_wildcard(&self.methods) {
            AllowMethods::from(Any)
        } else {
            let methods = self
                .methods
                .iter()
                .map(|method| {
                    Method::from_bytes(method.to_uppercase().as_bytes())
                        .with_context(|| format!("Invalid CORS method: {method}"))
                })
                .collect::<Result<Vec<_>>>()?;
            AllowMethods::list(methods)
        };

        let headers = if is_wildcard(&self.headers) {
            AllowHeaders::from(Any)
        } else {
            let headers = self
                .headers
                .iter()
                .map(|header| {
                    HeaderName::from_bytes(header.to_lowercase().as_bytes())
                        .with_context(|| format!("Invalid CORS header: {header}"))
                })
                .collect::<Result<Vec<_>>>()?;
            AllowHeaders::list(headers)
        };

        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers))
    }
}

fn is_wildcard(values: &[String]) -> bool {
    values.is_empty() || values.iter().any(|value| value.trim() == WILDCARD)
}
