use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_UPLOAD_DIR: &str = "upload-dir";
pub const ARG_PUBLIC_UPLOAD_URL: &str = "public-upload-url";
pub const ARG_UPLOAD_MAX_BYTES: &str = "upload-max-bytes";

pub use crate::api::handlers::uploads::DEFAULT_UPLOAD_MAX_BYTES;

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_UPLOAD_DIR)
                .long(ARG_UPLOAD_DIR)
                .help("Directory where uploaded images are stored")
                .env("HIWA_UPLOAD_DIR")
                .default_value("uploads")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_PUBLIC_UPLOAD_URL)
                .long(ARG_PUBLIC_UPLOAD_URL)
                .help("Public URL prefix under which uploaded files are served")
                .env("HIWA_PUBLIC_UPLOAD_URL")
                .default_value("/uploads"),
        )
        .arg(
            Arg::new(ARG_UPLOAD_MAX_BYTES)
                .long(ARG_UPLOAD_MAX_BYTES)
                .help("Maximum upload size in bytes")
                .env("HIWA_UPLOAD_MAX_BYTES")
                .default_value("5242880")
                .value_parser(clap::value_parser!(usize)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub upload_dir: PathBuf,
    pub public_upload_url: String,
    pub upload_max_bytes: usize,
}

impl Options {
    /// # Errors
    /// Returns an error if the maximum upload size is zero.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let upload_dir = matches
            .get_one::<PathBuf>(ARG_UPLOAD_DIR)
            .cloned()
            .unwrap_or_else(|| PathBuf::from("uploads"));
        let public_upload_url = matches
            .get_one::<String>(ARG_PUBLIC_UPLOAD_URL)
            .map_or_else(|| "/uploads".to_string(), |url| url.trim_end_matches('/').to_string());
        let upload_max_bytes = matches
            .get_one::<usize>(ARG_UPLOAD_MAX_BYTES)
            .copied()
            .unwrap_or(DEFAULT_UPLOAD_MAX_BYTES);
        if upload_max_bytes == 0 {
            bail!("--{ARG_UPLOAD_MAX_BYTES} must be greater than zero");
        }

        Ok(Self {
            upload_dir,
            public_upload_url,
            upload_max_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> Result<()> {
        temp_env::with_vars(
            [
                ("HIWA_UPLOAD_DIR", None::<&str>),
                ("HIWA_PUBLIC_UPLOAD_URL", None),
                ("HIWA_UPLOAD_MAX_BYTES", None),
            ],
            || {
                let matches = with_args(Command::new("hiwa")).get_matches_from(["hiwa"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.upload_dir, PathBuf::from("uploads"));
                assert_eq!(options.public_upload_url, "/uploads");
                assert_eq!(options.upload_max_bytes, DEFAULT_UPLOAD_MAX_BYTES);
                Ok(())
            },
        )
    }

    #[test]
    fn trailing_slash_is_trimmed_from_public_url() -> Result<()> {
        temp_env::with_vars(
            [("HIWA_PUBLIC_UPLOAD_URL", Some("https://cdn.hiwajamil.com/media/"))],
            || {
                let matches = with_args(Command::new("hiwa")).get_matches_from(["hiwa"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.public_upload_url, "https://cdn.hiwajamil.com/media");
                Ok(())
            },
        )
    }

    #[test]
    fn zero_max_bytes_is_rejected() {
        temp_env::with_vars([("HIWA_UPLOAD_MAX_BYTES", Some("0"))], || {
            let matches = with_args(Command::new("hiwa")).get_matches_from(["hiwa"]);
            assert!(Options::parse(&matches).is_err());
        });
    }
}
