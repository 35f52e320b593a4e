//! Map parsed CLI arguments to the action to run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, ARG_UPSTREAM_TIMEOUT_SECONDS, access, cognito, mailgun};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let upstream_timeout_seconds = matches
        .get_one::<u64>(ARG_UPSTREAM_TIMEOUT_SECONDS)
        .copied()
        .unwrap_or(10);

    let cognito = cognito::Options::parse(matches)?;
    let mailgun = mailgun::Options::parse(matches)?;
    let access = access::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        upstream_timeout_seconds,
        cognito,
        mailgun,
        access,
    }))
}
