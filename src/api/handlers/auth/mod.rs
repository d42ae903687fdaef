//! Identity, sessions and the route guard.
//!
//! Flow Overview:
//! 1) `POST /v1/auth/login` verifies an Argon2 password hash and issues a
//!    random session token; only its SHA-256 hash is stored.
//! 2) Every request presents the token as the `hiwa_session` cookie or a
//!    `Bearer` header and is resolved into a [`principal::Principal`].
//! 3) Protected handlers call [`principal::require_route`], which runs the
//!    shared guard in [`crate::rbac`] and maps its decision onto `401`/`403`.

pub mod access;
pub mod bootstrap;
pub mod login;
pub mod principal;
pub mod session;
pub(crate) mod storage;
pub mod types;
pub(crate) mod utils;

pub use principal::{require_auth, require_route, Principal};
pub use state::{AuthConfig, AuthState};

mod state;
