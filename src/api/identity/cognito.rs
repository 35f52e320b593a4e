//! Cognito user pool implementation of [`IdentityProvider`].
//!
//! Talks to the public JSON 1.1 endpoint (`cognito-idp.<region>.amazonaws.com`).
//! Every operation used here is authorized by the app client id or the caller's
//! own access token, so no request signing is involved. When the app client has
//! a secret, `SECRET_HASH` is `base64(HMAC-SHA256(secret, username + client_id))`.
//!
//! All provider error codes are translated in [`classify`]; nothing else in the
//! crate inspects Cognito's fault shapes.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use reqwest::{Client, header::CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use sha2::Sha256;
use std::time::Duration;
use tracing::{Instrument, debug, error, info_span, instrument, warn};
use url::Url;

use super::{
    Confirmation, CurrentUserView, IdentityError, IdentityProvider, Registration, Revocation,
    TOKEN_TYPE, TokenBundle, display_name,
};
use crate::api::validation::{
    ConfirmationRequest, LoginRequest, RefreshRequest, RegistrationRequest,
};

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_EXPIRES_IN_SECONDS: u64 = 3600;
const AMZ_JSON: &str = "application/x-amz-json-1.1";
const AMZ_TARGET: &str = "x-amz-target";
const AMZ_ERROR_TYPE: &str = "x-amzn-errortype";
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug)]
pub struct CognitoConfig {
    user_pool_id: String,
    client_id: String,
    client_secret: Option<SecretString>,
    region: String,
    endpoint: Option<String>,
    timeout: Duration,
}

impl CognitoConfig {
    #[must_use]
    pub fn new(user_pool_id: String, client_id: String) -> Self {
        Self {
            user_pool_id,
            client_id,
            client_secret: None,
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_region(mut self, region: String) -> Self {
        self.region = region;
        self
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: Option<SecretString>) -> Self {
        self.client_secret = secret;
        self
    }

    /// Override the regional endpoint (local stacks, tests).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout = Duration::from_secs(seconds.max(1));
        self
    }

    #[must_use]
    pub fn user_pool_id(&self) -> &str {
        &self.user_pool_id
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn has_client_secret(&self) -> bool {
        self.client_secret.is_some()
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| {
            format!("https://cognito-idp.{}.amazonaws.com/", self.region)
        })
    }

    /// Check the settings before the server starts.
    ///
    /// # Errors
    /// Returns an error if an identifier is empty, the pool id belongs to another
    /// region, or the endpoint is not a URL.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(anyhow!("Cognito client id must not be empty"));
        }
        // Pool ids look like `<region>_<id>`.
        let Some((pool_region, _)) = self.user_pool_id.split_once('_') else {
            return Err(anyhow!(
                "Invalid Cognito user pool id: {}",
                self.user_pool_id
            ));
        };
        if pool_region != self.region {
            return Err(anyhow!(
                "Cognito user pool {} is not in region {}",
                self.user_pool_id,
                self.region
            ));
        }
        let endpoint = self.endpoint();
        Url::parse(&endpoint).with_context(|| format!("Invalid Cognito endpoint: {endpoint}"))?;
        Ok(())
    }

    /// `SECRET_HASH` for `username`, or `None` when the client has no secret.
    fn secret_hash(&self, username: &str) -> Option<String> {
        let secret = self.client_secret.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
        mac.update(username.as_bytes());
        mac.update(self.client_id.as_bytes());
        Some(Base64::encode_string(&mac.finalize().into_bytes()))
    }
}

/// Identity operations, used to pick the provider target and to classify faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Register,
    Confirm,
    Login,
    Refresh,
    CurrentUser,
    Logout,
}

impl Operation {
    const fn target(self) -> &'static str {
        match self {
            Self::Register => "SignUp",
            Self::Confirm => "ConfirmSignUp",
            Self::Login | Self::Refresh => "InitiateAuth",
            Self::CurrentUser => "GetUser",
            Self::Logout => "GlobalSignOut",
        }
    }
}

/// Map a Cognito fault code onto the gateway taxonomy.
pub(crate) fn classify(operation: Operation, code: &str) -> IdentityError {
    match (operation, code) {
        (Operation::Register, "UsernameExistsException" | "AliasExistsException") => {
            IdentityError::AlreadyExists
        }
        // InvalidParameter on sign-up is a password the pool refuses to accept at all,
        // e.g. one with leading or trailing whitespace.
        (Operation::Register, "InvalidPasswordException" | "InvalidParameterException") => {
            IdentityError::WeakCredential
        }
        // The account exists but its code never left the provider.
        (Operation::Register, "CodeDeliveryFailureException") => IdentityError::UpstreamUnavailable(
            "confirmation code could not be delivered".to_string(),
        ),
        // NotAuthorized here means the account is already confirmed, i.e. the code was consumed.
        (
            Operation::Confirm,
            "CodeMismatchException"
            | "ExpiredCodeException"
            | "NotAuthorizedException"
            | "TooManyFailedAttemptsException",
        ) => IdentityError::InvalidCode,
        (Operation::Confirm, "UserNotFoundException") => IdentityError::NotFound,
        // Unknown user and wrong password must stay indistinguishable.
        (
            Operation::Login,
            "NotAuthorizedException" | "UserNotFoundException" | "PasswordResetRequiredException",
        ) => IdentityError::InvalidCredentials,
        (Operation::Login, "UserNotConfirmedException") => IdentityError::NotConfirmed,
        (Operation::Refresh, "NotAuthorizedException" | "UserNotFoundException") => {
            IdentityError::InvalidToken
        }
        (
            Operation::CurrentUser | Operation::Logout,
            "NotAuthorizedException" | "UserNotFoundException",
        ) => IdentityError::Unauthorized,
        (_, other) => {
            IdentityError::UpstreamUnavailable(format!("unmapped identity provider fault: {other}"))
        }
    }
}

/// Strip protocol prefixes/suffixes: `aws.protocoljson#Code` and `Code:http://...`.
fn normalize_fault_code(raw: &str) -> String {
    let code = raw.rsplit('#').next().unwrap_or(raw);
    code.split(':').next().unwrap_or(code).trim().to_string()
}

fn fault_code(header: Option<&str>, body: &str) -> Option<String> {
    serde_json::from_str::<ProviderFault>(body)
        .ok()
        .and_then(|fault| fault.kind)
        .or_else(|| header.map(str::to_string))
        .map(|raw| normalize_fault_code(&raw))
        .filter(|code| !code.is_empty())
}

#[derive(Deserialize)]
struct ProviderFault {
    #[serde(rename = "__type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpOutput {
    user_confirmed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthOutput {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    expires_in: Option<u64>,
    id_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetUserOutput {
    username: String,
    #[serde(default)]
    user_attributes: Vec<AttributeType>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType {
    name: String,
    value: Option<String>,
}

fn current_user_view(output: GetUserOutput) -> CurrentUserView {
    let mut view = CurrentUserView {
        username: output.username,
        ..CurrentUserView::default()
    };

    for AttributeType { name, value } in output.user_attributes {
        let Some(value) = value else {
            continue;
        };
        match name.as_str() {
            "sub" => view.sub = Some(value),
            "email" => view.email = Some(value),
            "email_verified" => view.email_verified = value.eq_ignore_ascii_case("true"),
            "given_name" => view.first_name = Some(value),
            "family_name" => view.last_name = Some(value),
            "phone_number" => view.phone_number = Some(value),
            "phone_number_verified" => {
                view.phone_number_verified = value.eq_ignore_ascii_case("true");
            }
            other => {
                if let Some(custom) = other.strip_prefix("custom:") {
                    view.custom_attributes.insert(custom.to_string(), value);
                }
            }
        }
    }

    view.name = display_name(view.first_name.as_deref(), view.last_name.as_deref());
    view
}

/// `previous_refresh` is echoed back when the provider does not rotate refresh tokens.
fn token_bundle(
    result: AuthenticationResult,
    previous_refresh: Option<&str>,
) -> Result<TokenBundle, IdentityError> {
    let refresh_token = result
        .refresh_token
        .or_else(|| previous_refresh.map(str::to_string))
        .ok_or_else(|| {
            IdentityError::UpstreamUnavailable("identity provider issued no refresh token".into())
        })?;

    Ok(TokenBundle {
        access_token: result.access_token,
        refresh_token,
        id_token: result.id_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: result
            .expires_in
            .filter(|seconds| *seconds > 0)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECONDS),
    })
}

#[derive(Debug)]
pub struct CognitoClient {
    config: CognitoConfig,
    http: Client,
}

impl CognitoClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: CognitoConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout())
            .build()
            .context("Failed to build identity provider HTTP client")?;
        Ok(Self { config, http })
    }

    #[must_use]
    pub fn config(&self) -> &CognitoConfig {
        &self.config
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: Operation,
        body: &Value,
    ) -> Result<T, IdentityError> {
        let target = operation.target();
        let payload = serde_json::to_vec(body)
            .map_err(|err| IdentityError::UpstreamUnavailable(err.to_string()))?;

        let span = info_span!("identity.call", rpc.system = "cognito", rpc.method = target);
        let response = self
            .http
            .post(self.config.endpoint())
            .header(CONTENT_TYPE, AMZ_JSON)
            .header(AMZ_TARGET, format!("{TARGET_PREFIX}.{target}"))
            .body(payload)
            .send()
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Identity provider {} request failed: {}", target, err);
                IdentityError::UpstreamUnavailable(err.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|err| {
                error!("Malformed identity provider {} response: {}", target, err);
                IdentityError::UpstreamUnavailable(format!("malformed {target} response"))
            });
        }

        let header_code = response
            .headers()
            .get(AMZ_ERROR_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        let Some(code) = fault_code(header_code.as_deref(), &body) else {
            warn!("Identity provider {} failed with {} and no fault code", target, status);
            return Err(IdentityError::UpstreamUnavailable(format!(
                "{target} failed with {status}"
            )));
        };

        let error = classify(operation, &code);
        if matches!(error, IdentityError::UpstreamUnavailable(_)) {
            warn!(fault = %code, %status, "identity provider {} failed", target);
        } else {
            debug!(fault = %code, %status, "identity provider {} rejected request", target);
        }
        Err(error)
    }

    fn with_secret_hash(&self, body: &mut Map<String, Value>, key: &str, username: &str) {
        if let Some(hash) = self.config.secret_hash(username) {
            body.insert(key.to_string(), Value::String(hash));
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<Registration, IdentityError> {
        let mut attributes = vec![json!({ "Name": "email", "Value": request.email })];
        if let Some(first_name) = &request.first_name {
            attributes.push(json!({ "Name": "given_name", "Value": first_name }));
        }
        if let Some(last_name) = &request.last_name {
            attributes.push(json!({ "Name": "family_name", "Value": last_name }));
        }

        let mut body = Map::new();
        body.insert("ClientId".into(), json!(self.config.client_id()));
        body.insert("Username".into(), json!(request.username));
        body.insert("Password".into(), json!(request.password.expose_secret()));
        body.insert("UserAttributes".into(), Value::Array(attributes));
        self.with_secret_hash(&mut body, "SecretHash", &request.username);

        let output: SignUpOutput = self.call(Operation::Register, &Value::Object(body)).await?;

        Ok(Registration {
            username: request.username.clone(),
            confirmation_required: !output.user_confirmed,
        })
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn confirm(
        &self,
        request: &ConfirmationRequest,
    ) -> Result<Confirmation, IdentityError> {
        let mut body = Map::new();
        body.insert("ClientId".into(), json!(self.config.client_id()));
        body.insert("Username".into(), json!(request.username));
        body.insert("ConfirmationCode".into(), json!(request.confirmation_code));
        self.with_secret_hash(&mut body, "SecretHash", &request.username);

        let _: serde::de::IgnoredAny = self.call(Operation::Confirm, &Value::Object(body)).await?;

        Ok(Confirmation { confirmed: true })
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn login(&self, request: &LoginRequest) -> Result<TokenBundle, IdentityError> {
        let mut parameters = Map::new();
        parameters.insert("USERNAME".into(), json!(request.username));
        parameters.insert("PASSWORD".into(), json!(request.password.expose_secret()));
        self.with_secret_hash(&mut parameters, "SECRET_HASH", &request.username);

        let body = json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": self.config.client_id(),
            "AuthParameters": parameters,
        });
        let output: InitiateAuthOutput = self.call(Operation::Login, &body).await?;

        match output.authentication_result {
            Some(result) => token_bundle(result, None),
            None => {
                // Challenges (MFA, forced password change) are not supported by this gateway.
                debug!(
                    challenge = output.challenge_name.as_deref().unwrap_or("none"),
                    "login answered with a challenge"
                );
                Err(IdentityError::InvalidCredentials)
            }
        }
    }

    // SECRET_HASH is derived from the username.
    fn refresh_requires_username(&self) -> bool {
        self.config.has_client_secret()
    }

    #[instrument(skip(self, request))]
    async fn refresh(&self, request: &RefreshRequest) -> Result<TokenBundle, IdentityError> {
        let mut parameters = Map::new();
        parameters.insert("REFRESH_TOKEN".into(), json!(request.refresh_token));
        if let Some(username) = &request.username {
            self.with_secret_hash(&mut parameters, "SECRET_HASH", username);
        }

        let body = json!({
            "AuthFlow": "REFRESH_TOKEN_AUTH",
            "ClientId": self.config.client_id(),
            "AuthParameters": parameters,
        });
        let output: InitiateAuthOutput = self.call(Operation::Refresh, &body).await?;

        let result = output
            .authentication_result
            .ok_or(IdentityError::InvalidToken)?;
        token_bundle(result, Some(&request.refresh_token))
    }

    #[instrument(skip_all)]
    async fn current_user(&self, bearer_token: &str) -> Result<CurrentUserView, IdentityError> {
        let body = json!({ "AccessToken": bearer_token });
        let output: GetUserOutput = self.call(Operation::CurrentUser, &body).await?;
        Ok(current_user_view(output))
    }

    #[instrument(skip_all)]
    async fn logout(&self, bearer_token: &str) -> Result<Revocation, IdentityError> {
        let body = json!({ "AccessToken": bearer_token });
        let _: serde::de::IgnoredAny = self.call(Operation::Logout, &body).await?;
        Ok(Revocation { revoked: true })
    }
}
