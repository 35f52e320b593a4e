use clap::{Arg, ArgMatches, Command};

pub const ARG_API_KEYS: &str = "api-keys";
pub const ARG_REQUIRE_API_KEY: &str = "require-api-key";
pub const ARG_CORS_ALLOWED_ORIGINS: &str = "cors-allowed-origins";
pub const ARG_CORS_ALLOWED_METHODS: &str = "cors-allowed-methods";
pub const ARG_CORS_ALLOWED_HEADERS: &str = "cors-allowed-headers";

#[derive(Debug, Clone)]
pub struct Options {
    pub api_keys: Vec<String>,
    pub require_api_key: bool,
    pub cors_origins: Vec<String>,
    pub cors_methods: Vec<String>,
    pub cors_headers: Vec<String>,
}

impl Options {
    /// Parse API key and CORS arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the API key gate is enforced without any key.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let list = |id: &str| -> Vec<String> {
            matches
                .get_many::<String>(id)
                .map(|values| {
                    values
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        };

        let api_keys = list(ARG_API_KEYS);
        let require_api_key = matches
            .get_one::<bool>(ARG_REQUIRE_API_KEY)
            .copied()
            .unwrap_or(true);

        if require_api_key && api_keys.is_empty() {
            anyhow::bail!(
                "--{ARG_API_KEYS} must list at least one key while --{ARG_REQUIRE_API_KEY} is true"
            );
        }

        Ok(Self {
            api_keys,
            require_api_key,
            cors_origins: list(ARG_CORS_ALLOWED_ORIGINS),
            cors_methods: list(ARG_CORS_ALLOWED_METHODS),
            cors_headers: list(ARG_CORS_ALLOWED_HEADERS),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_KEYS)
                .long(ARG_API_KEYS)
                .help("Comma separated API keys accepted on the contact route")
                .env("URBEX_API_KEYS")
                .hide_env_values(true)
                .value_delimiter(','),
        )
        .arg(
            Arg::new(ARG_REQUIRE_API_KEY)
                .long(ARG_REQUIRE_API_KEY)
                .help("Enforce the API key check on the contact route")
                .env("URBEX_REQUIRE_API_KEY")
                .default_value("true")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_CORS_ALLOWED_ORIGINS)
                .long(ARG_CORS_ALLOWED_ORIGINS)
                .help("Comma separated CORS origins, * allows any")
                .env("URBEX_CORS_ALLOWED_ORIGINS")
                .default_value("*")
                .value_delimiter(','),
        )
        .arg(
            Arg::new(ARG_CORS_ALLOWED_METHODS)
                .long(ARG_CORS_ALLOWED_METHODS)
                .help("Comma separated CORS methods, * allows any")
                .env("URBEX_CORS_ALLOWED_METHODS")
                .default_value("*")
                .value_delimiter(','),
        )
        .arg(
            Arg::new(ARG_CORS_ALLOWED_HEADERS)
                .long(ARG_CORS_ALLOWED_HEADERS)
                .help("Comma separated CORS headers, * allows any")
                .env("URBEX_CORS_ALLOWED_HEADERS")
                .default_value("*")
                .value_delimiter(','),
        )
}
