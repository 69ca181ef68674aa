//! adminboard core - the stateful part of the admin dashboard.
//!
//! Credential verification, the session state machine with its idle
//! watchdog, session persistence, and the role-based access policy used by
//! navigation and route guards. Rendering and routing live elsewhere.

pub mod auth;
pub mod config;
pub mod models;
pub mod storage;
pub mod utils;

pub use auth::{
    ActivityHub, ActivityKind, AuthError, CredentialStore, CredentialVerifier, HashedCredentials,
    LogoutReason, SessionManager, SessionSettings, SessionSnapshot,
};
pub use config::Config;
pub use models::{visible_sections, Profile, Role, Section};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
