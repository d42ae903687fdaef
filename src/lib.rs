//! # Hiwa (marketing website and admin backend)
//!
//! `hiwa` serves the public pages of a small business website and the
//! role-gated admin dashboard behind it.
//!
//! ## Access control
//!
//! Identities sign in with email and password; the server keeps an opaque
//! session token (only its SHA-256 hash is stored). Every identity owns one
//! profile carrying a closed role (`admin`, `owner`, `user`) and an active flag.
//! Each admin route has a fixed role set and a single `authorize` function
//! decides `Allow`, `Deny` or `RedirectToLogin`. Inactive profiles are denied
//! everywhere. No session maps to `401`; a denied session maps to `403`.
//!
//! ## Localized content
//!
//! Website copy is stored per `(section, key)` with English, Arabic and
//! Kurdish values. Resolution tries the requested language, then English, then
//! the caller's literal fallback. One resolver per language keeps a resolved
//! map that is rebuilt after every content change.

pub mod api;
pub mod cli;
pub mod content;
pub mod rbac;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
