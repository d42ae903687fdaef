use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_BOOTSTRAP_ADMIN_EMAIL: &str = "bootstrap-admin-email";
pub const ARG_BOOTSTRAP_ADMIN_PASSWORD: &str = "bootstrap-admin-password";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_bootstrap_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL; sets the CORS origin and the cookie Secure flag")
                .env("HIWA_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("HIWA_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_bootstrap_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BOOTSTRAP_ADMIN_EMAIL)
                .long(ARG_BOOTSTRAP_ADMIN_EMAIL)
                .help("Create this admin at startup when no admin profile exists")
                .env("HIWA_BOOTSTRAP_ADMIN_EMAIL")
                .requires(ARG_BOOTSTRAP_ADMIN_PASSWORD),
        )
        .arg(
            Arg::new(ARG_BOOTSTRAP_ADMIN_PASSWORD)
                .long(ARG_BOOTSTRAP_ADMIN_PASSWORD)
                .help("Password for the bootstrap admin")
                .env("HIWA_BOOTSTRAP_ADMIN_PASSWORD")
                .hide_env_values(true)
                .requires(ARG_BOOTSTRAP_ADMIN_EMAIL),
        )
}

#[derive(Debug)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Options {
    /// # Errors
    /// Returns an error if the session TTL is not positive.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:5173".to_string());
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(604_800);
        if session_ttl_seconds <= 0 {
            bail!("--{ARG_SESSION_TTL_SECONDS} must be greater than zero");
        }

        let bootstrap_admin = match (
            matches.get_one::<String>(ARG_BOOTSTRAP_ADMIN_EMAIL),
            matches.get_one::<String>(ARG_BOOTSTRAP_ADMIN_PASSWORD),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email: email.clone(),
                password: SecretString::from(password.clone()),
            }),
            _ => None,
        };

        Ok(Self {
            frontend_base_url,
            session_ttl_seconds,
            bootstrap_admin,
        })
    }
}
