//! Authentication module for verifying credentials and managing sessions.
//!
//! This module provides:
//! - `CredentialVerifier`: the pluggable check behind every login
//! - `CredentialStore`: the demo credential table (plaintext, in memory)
//! - `HashedCredentials`: an Argon2-backed credential table
//! - `SessionManager`: login/logout/touch/restore with an idle watchdog
//! - `ActivityHub`: a source of user-interaction signals
//!
//! Sessions are persisted through a `KeyValueStore` and end after 30
//! minutes without activity.

pub mod activity;
pub mod credentials;
pub mod error;
pub mod session;
pub mod watchdog;

pub use activity::{ActivityHub, ActivityKind, ActivityListener, ActivitySource, Subscription};
pub use credentials::{
    hash_secret, CredentialRecord, CredentialStore, CredentialVerifier, HashedCredentials,
};
pub use error::AuthError;
pub use session::{
    LogoutReason, SessionManager, SessionManagerBuilder, SessionSettings, SessionSnapshot,
    LAST_ACTIVITY_KEY, PROFILE_KEY,
};
pub use watchdog::Watchdog;
