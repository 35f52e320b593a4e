use crate::{
    api::{
        self,
        access::{ApiKeyGate, CorsConfig},
        email::{ContactMailer, MailgunClient, MailgunConfig, Mailer},
        identity::{CognitoClient, CognitoConfig, Identity},
    },
    cli::commands::{access, cognito, mailgun},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upstream_timeout_seconds: u64,
    pub cognito: cognito::Options,
    pub mailgun: mailgun::Options,
    pub access: access::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a provider setting is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let cognito_config = CognitoConfig::new(args.cognito.user_pool_id, args.cognito.client_id)
        .with_region(args.cognito.region)
        .with_client_secret(args.cognito.client_secret.map(SecretString::from))
        .with_endpoint(args.cognito.endpoint)
        .with_timeout_seconds(args.upstream_timeout_seconds);
    cognito_config
        .validate()
        .context("Invalid identity provider configuration")?;

    let mailgun_config = MailgunConfig::new(
        SecretString::from(args.mailgun.api_key),
        args.mailgun.domain,
    )
    .with_base_url(args.mailgun.base_url)
    .with_sender(args.mailgun.sender)
    .with_timeout_seconds(args.upstream_timeout_seconds);
    mailgun_config
        .validate()
        .context("Invalid email provider configuration")?;

    let gate = ApiKeyGate::new(args.access.require_api_key, args.access.api_keys)?;
    let cors = CorsConfig::new(
        args.access.cors_origins,
        args.access.cors_methods,
        args.access.cors_headers,
    );

    let identity: Identity = Arc::new(CognitoClient::new(cognito_config)?);
    let mailer: Mailer = Arc::new(ContactMailer::new(
        MailgunClient::new(mailgun_config)?,
        args.mailgun.admin_email,
    ));

    api::new(args.port, identity, mailer, gate, &cors).await
}

fn log_startup_args(args: &Args) {
    let cognito_endpoint = args.cognito.endpoint.clone().unwrap_or_else(|| {
        format!("https://cognito-idp.{}.amazonaws.com/", args.cognito.region)
    });
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("cognito_user_pool_id", args.cognito.user_pool_id.clone()),
        ("cognito_client_id", args.cognito.client_id.clone()),
        (
            "cognito_client_secret_set",
            args.cognito.client_secret.is_some().to_string(),
        ),
        ("cognito_endpoint", cognito_endpoint),
        ("mailgun_domain", args.mailgun.domain.clone()),
        ("mailgun_base_url", args.mailgun.base_url.clone()),
        ("admin_email", args.mailgun.admin_email.clone()),
        (
            "upstream_timeout",
            format!("{}s", args.upstream_timeout_seconds),
        ),
        (
            "api_key_required",
            args.access.require_api_key.to_string(),
        ),
        ("api_keys", args.access.api_keys.len().to_string()),
        ("cors_origins", args.access.cors_origins.join(",")),
    ];
    log_entries("Startup configuration", &entries);
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", urbex_banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn urbex_banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    URBEX_BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

const URBEX_BANNER: &str = r"
  _   _ ____  ____  _______  __
 | | | |  _ \| __ )| ____\ \/ /
 | | | | |_) |  _ \|  _|  \  /
 | |_| |  _ <| |_) | |___ /  \
  \___/|_| \_\____/|_____/_/\_\ {VERSION}";
