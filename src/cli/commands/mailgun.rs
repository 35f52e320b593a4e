use clap::{Arg, ArgMatches, Command};

pub const ARG_MAILGUN_API_KEY: &str = "mailgun-api-key";
pub const ARG_MAILGUN_DOMAIN: &str = "mailgun-domain";
pub const ARG_MAILGUN_BASE_URL: &str = "mailgun-base-url";
pub const ARG_MAILGUN_SENDER: &str = "mailgun-sender";
pub const ARG_ADMIN_EMAIL: &str = "admin-email";

#[derive(Debug, Clone)]
pub struct Options {
    pub api_key: String,
    pub domain: String,
    pub base_url: String,
    pub sender: Option<String>,
    pub admin_email: String,
}

impl Options {
    /// Parse email provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing or the admin address is not an email.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let read_required = |id: &str| {
            get_non_empty(id).ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        let admin_email = read_required(ARG_ADMIN_EMAIL)?;
        if !crate::api::validation::valid_email(&admin_email) {
            anyhow::bail!("invalid email address for --{ARG_ADMIN_EMAIL}: {admin_email}");
        }

        Ok(Self {
            api_key: read_required(ARG_MAILGUN_API_KEY)?,
            domain: read_required(ARG_MAILGUN_DOMAIN)?,
            base_url: read_required(ARG_MAILGUN_BASE_URL)?,
            sender: get_non_empty(ARG_MAILGUN_SENDER),
            admin_email,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAILGUN_API_KEY)
                .long(ARG_MAILGUN_API_KEY)
                .help("Mailgun API key")
                .env("URBEX_MAILGUN_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_MAILGUN_DOMAIN)
                .long(ARG_MAILGUN_DOMAIN)
                .help("Mailgun sending domain")
                .env("URBEX_MAILGUN_DOMAIN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_MAILGUN_BASE_URL)
                .long(ARG_MAILGUN_BASE_URL)
                .help("Mailgun API base URL")
                .env("URBEX_MAILGUN_BASE_URL")
                .default_value(crate::api::email::mailgun::DEFAULT_BASE_URL),
        )
        .arg(
            Arg::new(ARG_MAILGUN_SENDER)
                .long(ARG_MAILGUN_SENDER)
                .help("From address, default: Urbex <noreply@<domain>>")
                .env("URBEX_MAILGUN_SENDER"),
        )
        .arg(
            Arg::new(ARG_ADMIN_EMAIL)
                .long(ARG_ADMIN_EMAIL)
                .help("Recipient of contact form notifications")
                .env("URBEX_ADMIN_EMAIL")
                .required(true),
        )
}
