//! `CognitoClient` against an in-process imitation of the Cognito JSON 1.1 API.

use anyhow::{Result, anyhow};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::net::TcpListener;
use urbex::api::{
    identity::{CognitoClient, CognitoConfig, IdentityError, IdentityProvider},
    validation::{
        ConfirmationRequest, LoginRequest, Payload, RefreshRequest, RegistrationRequest,
    },
};

const POOL_ID: &str = "us-east-1_TestPool";
const CLIENT_ID: &str = "test-client-id";

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<(String, Value)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn fault(code: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "__type": code, "message": "rejected by fake" })),
    )
        .into_response()
}

fn authentication(refresh: Option<&str>) -> Response {
    let mut result = json!({
        "AccessToken": "access-1",
        "ExpiresIn": 3600,
        "IdToken": "id-1",
        "TokenType": "Bearer",
    });
    if let Some(token) = refresh {
        result["RefreshToken"] = json!(token);
    }
    Json(json!({ "AuthenticationResult": result, "ChallengeParameters": {} })).into_response()
}

async fn fake_cognito(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Cognito speaks application/x-amz-json-1.1, which the Json extractor refuses.
    let body: Value = serde_json::from_slice(&body).unwrap_or_default();
    let target = headers
        .get("x-amz-target")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .trim_start_matches("AWSCognitoIdentityProviderService.")
        .to_string();
    recorder
        .calls
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((target.clone(), body.clone()));

    let text = |pointer: &str| {
        body.pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match target.as_str() {
        "SignUp" => match (text("/Username").as_str(), text("/Password").as_str()) {
            ("taken", _) => fault("UsernameExistsException"),
            ("undeliverable", _) => fault("CodeDeliveryFailureException"),
            (_, "weakpassword") => fault("InvalidPasswordException"),
            (_, password) if password.trim() != password => fault("InvalidParameterException"),
            _ => Json(json!({ "UserConfirmed": false, "UserSub": "sub-1" })).into_response(),
        },
        "ConfirmSignUp" => match (text("/Username").as_str(), text("/ConfirmationCode").as_str()) {
            ("ghost", _) => fault("UserNotFoundException"),
            ("confirmed", _) => fault("NotAuthorizedException"),
            (_, "123456") => Json(json!({})).into_response(),
            _ => fault("CodeMismatchException"),
        },
        "InitiateAuth" => match text("/AuthFlow").as_str() {
            "USER_PASSWORD_AUTH" => match (
                text("/AuthParameters/USERNAME").as_str(),
                text("/AuthParameters/PASSWORD").as_str(),
            ) {
                ("juan", "s3cret-pass") => authentication(Some("refresh-1")),
                ("pending", _) => fault("UserNotConfirmedException"),
                ("mfa", _) => Json(json!({
                    "ChallengeName": "SOFTWARE_TOKEN_MFA",
                    "Session": "session",
                    "ChallengeParameters": {}
                }))
                .into_response(),
                // Fault code only in the header, the way some gateways answer.
                ("ghost", _) => (
                    StatusCode::BAD_REQUEST,
                    [(
                        "x-amzn-errortype",
                        "UserNotFoundException:http://internal.amazon.com/coral/",
                    )],
                    "{}",
                )
                    .into_response(),
                _ => fault("NotAuthorizedException"),
            },
            "REFRESH_TOKEN_AUTH" => match text("/AuthParameters/REFRESH_TOKEN").as_str() {
                "refresh-1" => authentication(None),
                "rotating" => authentication(Some("refresh-2")),
                _ => fault("NotAuthorizedException"),
            },
            _ => fault("InvalidParameterException"),
        },
        "GetUser" => match text("/AccessToken").as_str() {
            "access-1" => Json(json!({
                "Username": "juan",
                "UserAttributes": [
                    { "Name": "sub", "Value": "sub-1" },
                    { "Name": "email", "Value": "juan.perez@example.com" },
                    { "Name": "email_verified", "Value": "true" },
                    { "Name": "given_name", "Value": "Juan" },
                    { "Name": "family_name", "Value": "Pérez" },
                    { "Name": "custom:plan", "Value": "pro" }
                ]
            }))
            .into_response(),
            "throttled" => fault("TooManyRequestsException"),
            "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            "slow" => {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({ "Username": "juan", "UserAttributes": [] })).into_response()
            }
            _ => fault("NotAuthorizedException"),
        },
        "GlobalSignOut" => match text("/AccessToken").as_str() {
            "access-1" => Json(json!({})).into_response(),
            _ => fault("NotAuthorizedException"),
        },
        _ => fault("UnknownOperationException"),
    }
}

async fn spawn_fake() -> Result<(String, Recorder)> {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/", post(fake_cognito))
        .with_state(recorder.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{addr}/"), recorder))
}

async fn client(secret: Option<&str>) -> Result<(CognitoClient, Recorder)> {
    let (endpoint, recorder) = spawn_fake().await?;
    let config = CognitoConfig::new(POOL_ID.to_string(), CLIENT_ID.to_string())
        .with_endpoint(Some(endpoint))
        .with_client_secret(secret.map(|value| SecretString::from(value.to_string())))
        .with_timeout_seconds(1);
    config.validate()?;
    Ok((CognitoClient::new(config)?, recorder))
}

fn payload(value: Value) -> Result<Payload> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("payload must be an object")),
    }
}

fn registration(username: &str, password: &str) -> Result<RegistrationRequest> {
    Ok(RegistrationRequest::from_payload(&payload(json!({
        "username": username,
        "email": "juan.perez@example.com",
        "password": password,
        "first_name": "Juan",
        "last_name": "Pérez"
    }))?)?)
}

fn login(username: &str, password: &str) -> Result<LoginRequest> {
    Ok(LoginRequest::from_payload(&payload(json!({
        "username": username,
        "password": password
    }))?)?)
}

fn confirmation(username: &str, code: &str) -> Result<ConfirmationRequest> {
    Ok(ConfirmationRequest::from_payload(&payload(json!({
        "username": username,
        "confirmation_code": code
    }))?)?)
}

fn refresh(token: &str) -> Result<RefreshRequest> {
    Ok(RefreshRequest::from_payload(&payload(json!({
        "refresh_token": token
    }))?)?)
}

#[tokio::test]
async fn register_sends_attributes_and_maps_faults() -> Result<()> {
    let (client, recorder) = client(None).await?;

    let registration_result = client.register(&registration("juan", "s3cret-pass")?).await?;
    assert_eq!(registration_result.username, "juan");
    assert!(registration_result.confirmation_required);

    let calls = recorder.calls();
    let (target, body) = calls.first().ok_or_else(|| anyhow!("no call recorded"))?;
    assert_eq!(target, "SignUp");
    assert_eq!(body["ClientId"], CLIENT_ID);
    assert!(body.get("SecretHash").is_none());
    let attributes = body["UserAttributes"]
        .as_array()
        .ok_or_else(|| anyhow!("UserAttributes missing"))?;
    assert!(attributes.contains(&json!({ "Name": "given_name", "Value": "Juan" })));
    assert!(attributes.contains(&json!({ "Name": "family_name", "Value": "Pérez" })));

    assert_eq!(
        client.register(&registration("taken", "s3cret-pass")?).await,
        Err(IdentityError::AlreadyExists)
    );
    assert_eq!(
        client.register(&registration("ana", "weakpassword")?).await,
        Err(IdentityError::WeakCredential)
    );
    // Whitespace survives local validation and is refused by the pool.
    assert_eq!(
        client.register(&registration("ana", " Passw0rd123 ")?).await,
        Err(IdentityError::WeakCredential)
    );
    assert!(matches!(
        client.register(&registration("undeliverable", "s3cret-pass")?).await,
        Err(IdentityError::UpstreamUnavailable(reason)) if reason.contains("delivered")
    ));
    Ok(())
}

#[tokio::test]
async fn secret_hash_is_sent_when_configured() -> Result<()> {
    let (client, recorder) = client(Some("client-secret")).await?;

    client.register(&registration("juan", "s3cret-pass")?).await?;
    client.login(&login("juan", "s3cret-pass")?).await?;

    let calls = recorder.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].1["SecretHash"].as_str().is_some_and(|h| !h.is_empty()));
    assert_eq!(
        calls[0].1["SecretHash"],
        calls[1].1["AuthParameters"]["SECRET_HASH"]
    );
    Ok(())
}

#[tokio::test]
async fn confirm_maps_codes() -> Result<()> {
    let (client, _) = client(None).await?;

    assert!(client.confirm(&confirmation("juan", "123456")?).await?.confirmed);
    assert_eq!(
        client.confirm(&confirmation("juan", "000000")?).await,
        Err(IdentityError::InvalidCode)
    );
    assert_eq!(
        client.confirm(&confirmation("confirmed", "123456")?).await,
        Err(IdentityError::InvalidCode)
    );
    assert_eq!(
        client.confirm(&confirmation("ghost", "123456")?).await,
        Err(IdentityError::NotFound)
    );
    Ok(())
}

#[tokio::test]
async fn login_returns_tokens_and_hides_unknown_users() -> Result<()> {
    let (client, _) = client(None).await?;

    let tokens = client.login(&login("juan", "s3cret-pass")?).await?;
    assert_eq!(tokens.access_token, "access-1");
    assert_eq!(tokens.refresh_token, "refresh-1");
    assert_eq!(tokens.id_token.as_deref(), Some("id-1"));
    assert_eq!(tokens.token_type, "bearer");
    assert_eq!(tokens.expires_in, 3600);

    let wrong_password = client.login(&login("juan", "wrong-pass")?).await;
    let unknown_user = client.login(&login("ghost", "s3cret-pass")?).await;
    assert_eq!(wrong_password, Err(IdentityError::InvalidCredentials));
    assert_eq!(unknown_user, wrong_password);

    assert_eq!(
        client.login(&login("pending", "s3cret-pass")?).await,
        Err(IdentityError::NotConfirmed)
    );
    assert_eq!(
        client.login(&login("mfa", "s3cret-pass")?).await,
        Err(IdentityError::InvalidCredentials)
    );
    Ok(())
}

#[tokio::test]
async fn refresh_echoes_or_forwards_refresh_token() -> Result<()> {
    let (client, _) = client(None).await?;

    let tokens = client.refresh(&refresh("refresh-1")?).await?;
    assert_eq!(tokens.access_token, "access-1");
    assert_eq!(tokens.refresh_token, "refresh-1");

    let rotated = client.refresh(&refresh("rotating")?).await?;
    assert_eq!(rotated.refresh_token, "refresh-2");

    assert_eq!(
        client.refresh(&refresh("forged")?).await,
        Err(IdentityError::InvalidToken)
    );
    Ok(())
}

#[tokio::test]
async fn refresh_needs_username_only_with_client_secret() -> Result<()> {
    let (plain, _) = client(None).await?;
    assert!(!plain.refresh_requires_username());

    let (signed, recorder) = client(Some("client-secret")).await?;
    assert!(signed.refresh_requires_username());

    let request = RefreshRequest::from_payload(&payload(json!({
        "refresh_token": "refresh-1",
        "username": "juan"
    }))?)?;
    signed.refresh(&request).await?;
    let calls = recorder.calls();
    let (_, body) = calls.first().ok_or_else(|| anyhow!("no call recorded"))?;
    assert!(
        body["AuthParameters"]["SECRET_HASH"]
            .as_str()
            .is_some_and(|hash| !hash.is_empty())
    );
    Ok(())
}

#[tokio::test]
async fn current_user_projects_attributes() -> Result<()> {
    let (client, _) = client(None).await?;

    let user = client.current_user("access-1").await?;
    assert_eq!(user.username, "juan");
    assert_eq!(user.sub.as_deref(), Some("sub-1"));
    assert_eq!(user.email.as_deref(), Some("juan.perez@example.com"));
    assert!(user.email_verified);
    assert_eq!(user.name.as_deref(), Some("Juan Pérez"));
    assert_eq!(
        user.custom_attributes.get("plan").map(String::as_str),
        Some("pro")
    );

    assert_eq!(
        client.current_user("expired").await,
        Err(IdentityError::Unauthorized)
    );
    Ok(())
}

#[tokio::test]
async fn logout_revokes_or_rejects() -> Result<()> {
    let (client, _) = client(None).await?;

    assert!(client.logout("access-1").await?.revoked);
    assert_eq!(
        client.logout("expired").await,
        Err(IdentityError::Unauthorized)
    );
    Ok(())
}

#[tokio::test]
async fn unmapped_faults_and_timeouts_are_upstream_unavailable() -> Result<()> {
    let (client, _) = client(None).await?;

    for token in ["throttled", "broken", "slow"] {
        let result = client.current_user(token).await;
        assert!(
            matches!(result, Err(IdentityError::UpstreamUnavailable(_))),
            "{token}: {result:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_provider_is_upstream_unavailable() -> Result<()> {
    // Bind and drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let config = CognitoConfig::new(POOL_ID.to_string(), CLIENT_ID.to_string())
        .with_endpoint(Some(format!("http://{addr}/")))
        .with_timeout_seconds(1);
    let client = CognitoClient::new(config)?;

    assert!(matches!(
        client.login(&login("juan", "s3cret-pass")?).await,
        Err(IdentityError::UpstreamUnavailable(_))
    ));
    Ok(())
}
