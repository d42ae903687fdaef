//! Maps validated CLI arguments onto the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, storage, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or out of range.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let storage_opts = storage::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        bootstrap_admin: auth_opts.bootstrap_admin,
        upload_dir: storage_opts.upload_dir,
        public_upload_url: storage_opts.public_upload_url,
        upload_max_bytes: storage_opts.upload_max_bytes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn builds_server_action() -> Result<()> {
        temp_env::with_vars(
            [
                ("HIWA_DSN", Some("postgres://localhost/hiwa")),
                ("HIWA_PORT", Some("9000")),
                ("HIWA_BOOTSTRAP_ADMIN_EMAIL", None),
                ("HIWA_BOOTSTRAP_ADMIN_PASSWORD", None),
            ],
            || {
                let matches = commands::new().get_matches_from(["hiwa"]);
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.port, 9000);
                assert_eq!(args.dsn, "postgres://localhost/hiwa");
                assert_eq!(args.upload_max_bytes, storage::DEFAULT_UPLOAD_MAX_BYTES);
                assert!(args.bootstrap_admin.is_none());
                Ok(())
            },
        )
    }
}
