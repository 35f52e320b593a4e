use clap::{Arg, ArgMatches, Command};

pub const ARG_COGNITO_USER_POOL_ID: &str = "cognito-user-pool-id";
pub const ARG_COGNITO_CLIENT_ID: &str = "cognito-client-id";
pub const ARG_COGNITO_CLIENT_SECRET: &str = "cognito-client-secret";
pub const ARG_COGNITO_REGION: &str = "cognito-region";
pub const ARG_COGNITO_ENDPOINT: &str = "cognito-endpoint";

#[derive(Debug, Clone)]
pub struct Options {
    pub user_pool_id: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // Helper to filter empty strings which clap might pass through if env vars are set to ""
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let read_required = |id: &str| {
            get_non_empty(id).ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            user_pool_id: read_required(ARG_COGNITO_USER_POOL_ID)?,
            client_id: read_required(ARG_COGNITO_CLIENT_ID)?,
            client_secret: get_non_empty(ARG_COGNITO_CLIENT_SECRET),
            region: read_required(ARG_COGNITO_REGION)?,
            endpoint: get_non_empty(ARG_COGNITO_ENDPOINT),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_COGNITO_USER_POOL_ID)
                .long(ARG_COGNITO_USER_POOL_ID)
                .help("Cognito user pool id, example: us-east-1_AbCdEf123")
                .env("URBEX_COGNITO_USER_POOL_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_COGNITO_CLIENT_ID)
                .long(ARG_COGNITO_CLIENT_ID)
                .help("Cognito app client id")
                .env("URBEX_COGNITO_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_COGNITO_CLIENT_SECRET)
                .long(ARG_COGNITO_CLIENT_SECRET)
                .help("Cognito app client secret, used to compute SECRET_HASH")
                .env("URBEX_COGNITO_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_COGNITO_REGION)
                .long(ARG_COGNITO_REGION)
                .help("AWS region of the user pool")
                .env("URBEX_COGNITO_REGION")
                .default_value("us-east-1"),
        )
        .arg(
            Arg::new(ARG_COGNITO_ENDPOINT)
                .long(ARG_COGNITO_ENDPOINT)
                .help("Override the Cognito endpoint (local stacks)")
                .long_help(
                    "Override the Cognito endpoint. Defaults to https://cognito-idp.<region>.amazonaws.com/",
                )
                .env("URBEX_COGNITO_ENDPOINT"),
        )
}
