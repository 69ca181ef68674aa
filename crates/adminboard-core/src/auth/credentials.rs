use std::collections::HashMap;
use std::future::{self, Future};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;

use super::AuthError;
use crate::models::{Profile, Role};

/// Something that can check an identifier/secret pair.
///
/// The returned future is a suspension point so that a remote identity
/// provider can be dropped in without changing the session manager.
pub trait CredentialVerifier: Send + Sync {
    /// Returns a copy of the matching profile, or `None` when the pair is
    /// not accepted. Unknown identifiers and wrong secrets are not
    /// distinguished.
    fn verify(
        &self,
        identifier: &str,
        secret: &str,
    ) -> impl Future<Output = Option<Profile>> + Send;
}

#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub secret: String,
    pub profile: Profile,
}

/// In-memory credential table with verbatim secret comparison.
///
/// Suitable for demos only: secrets are held in plaintext and there is
/// no throttling. See [`HashedCredentials`] for anything real.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    records: HashMap<String, CredentialRecord>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three demo accounts the dashboard ships with
    pub fn demo() -> Self {
        Self::new()
            .with_record(
                "admin123",
                Profile::new("1", "John Admin", "admin@admin.com", Role::Administrator),
            )
            .with_record(
                "editor123",
                Profile::new("2", "Jane Editor", "editor@demo.com", Role::Editor),
            )
            .with_record(
                "viewer123",
                Profile::new("3", "Bob Viewer", "viewer@demo.com", Role::Viewer),
            )
    }

    /// Add a record keyed by the profile's identifier, replacing any
    /// existing record for it
    pub fn with_record(mut self, secret: impl Into<String>, profile: Profile) -> Self {
        self.records.insert(
            profile.identifier.clone(),
            CredentialRecord {
                secret: secret.into(),
                profile,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &CredentialRecord> {
        self.records.values()
    }

    fn check(&self, identifier: &str, secret: &str) -> Option<Profile> {
        self.records
            .get(identifier)
            .filter(|record| record.secret == secret)
            .map(|record| record.profile.clone())
    }
}

impl CredentialVerifier for CredentialStore {
    fn verify(
        &self,
        identifier: &str,
        secret: &str,
    ) -> impl Future<Output = Option<Profile>> + Send {
        future::ready(self.check(identifier, secret))
    }
}

/// Length of the random salt fed to Argon2, in bytes
const SALT_LENGTH: usize = 16;

/// Credential table holding Argon2 PHC hashes instead of secrets.
#[derive(Debug, Clone, Default)]
pub struct HashedCredentials {
    records: HashMap<String, (String, Profile)>,
}

impl HashedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash every record of a plaintext store
    pub fn from_store(store: &CredentialStore) -> Result<Self, AuthError> {
        let mut hashed = Self::new();
        for record in store.records() {
            hashed.insert(&record.secret, record.profile.clone())?;
        }
        Ok(hashed)
    }

    /// Hash `secret` with a fresh salt and store it for the profile's
    /// identifier
    pub fn insert(&mut self, secret: &str, profile: Profile) -> Result<(), AuthError> {
        let hash = hash_secret(secret)?;
        self.insert_hash(hash, profile)
    }

    /// Store an existing PHC hash string, e.g. one loaded from a user table
    pub fn insert_hash(
        &mut self,
        hash: impl Into<String>,
        profile: Profile,
    ) -> Result<(), AuthError> {
        let hash = hash.into();
        PasswordHash::new(&hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
        self.records.insert(profile.identifier.clone(), (hash, profile));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn check(&self, identifier: &str, secret: &str) -> Option<Profile> {
        let (hash, profile) = self.records.get(identifier)?;
        let parsed = PasswordHash::new(hash).ok()?;
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .ok()
            .map(|_| profile.clone())
    }
}

impl CredentialVerifier for HashedCredentials {
    fn verify(
        &self,
        identifier: &str,
        secret: &str,
    ) -> impl Future<Output = Option<Profile>> + Send {
        future::ready(self.check(identifier, secret))
    }
}

/// Produce an Argon2id PHC string for a secret
pub fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    // -------------------------------------------------------------------------
    // CredentialStore Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_demo_admin_login() {
        let store = CredentialStore::demo();
        let profile = block_on(store.verify("admin@admin.com", "admin123"))
            .expect("admin credentials accepted");

        assert_eq!(profile.id, "1");
        assert_eq!(profile.display_name, "John Admin");
        assert_eq!(profile.identifier, "admin@admin.com");
        assert_eq!(profile.role, Role::Administrator);
    }

    #[test]
    fn test_demo_roles() {
        let store = CredentialStore::demo();
        assert_eq!(store.len(), 3);

        let editor = block_on(store.verify("editor@demo.com", "editor123")).unwrap();
        assert_eq!(editor.role, Role::Editor);

        let viewer = block_on(store.verify("viewer@demo.com", "viewer123")).unwrap();
        assert_eq!(viewer.role, Role::Viewer);
    }

    #[test]
    fn test_unknown_identifier_rejected_for_any_secret() {
        let store = CredentialStore::demo();
        for secret in ["", "admin123", "editor123", "viewer123", "anything"] {
            assert_eq!(block_on(store.verify("nobody@demo.com", secret)), None);
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let store = CredentialStore::demo();
        // Another account's secret, case changes, padding, prefix
        for secret in ["editor123", "ADMIN123", "admin123 ", " admin123", "admin12", ""] {
            assert_eq!(block_on(store.verify("admin@admin.com", secret)), None);
        }
    }

    #[test]
    fn test_identifier_is_exact_match() {
        let store = CredentialStore::demo();
        assert_eq!(block_on(store.verify("ADMIN@admin.com", "admin123")), None);
        assert_eq!(block_on(store.verify(" admin@admin.com", "admin123")), None);
    }

    #[test]
    fn test_returned_profile_is_a_copy() {
        let store = CredentialStore::demo();
        let mut profile = block_on(store.verify("viewer@demo.com", "viewer123")).unwrap();
        profile.role = Role::Administrator;
        profile.display_name = "Mallory".to_string();

        let again = block_on(store.verify("viewer@demo.com", "viewer123")).unwrap();
        assert_eq!(again.role, Role::Viewer);
        assert_eq!(again.display_name, "Bob Viewer");
    }

    #[test]
    fn test_with_record_replaces_existing() {
        let store = CredentialStore::demo().with_record(
            "rotated",
            Profile::new("1", "John Admin", "admin@admin.com", Role::Administrator),
        );
        assert_eq!(store.len(), 3);
        assert_eq!(block_on(store.verify("admin@admin.com", "admin123")), None);
        assert!(block_on(store.verify("admin@admin.com", "rotated")).is_some());
    }

    // -------------------------------------------------------------------------
    // HashedCredentials Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_hashed_credentials_accept_correct_secret() {
        let hashed = HashedCredentials::from_store(&CredentialStore::demo()).unwrap();
        assert_eq!(hashed.len(), 3);

        let profile = block_on(hashed.verify("editor@demo.com", "editor123")).unwrap();
        assert_eq!(profile.role, Role::Editor);
    }

    #[test]
    fn test_hashed_credentials_reject_wrong_or_unknown() {
        let mut hashed = HashedCredentials::new();
        hashed
            .insert(
                "admin123",
                Profile::new("1", "John Admin", "admin@admin.com", Role::Administrator),
            )
            .unwrap();

        assert_eq!(block_on(hashed.verify("admin@admin.com", "admin124")), None);
        assert_eq!(block_on(hashed.verify("ghost@demo.com", "admin123")), None);
    }

    #[test]
    fn test_hash_secret_is_salted() {
        let first = hash_secret("admin123").unwrap();
        let second = hash_secret("admin123").unwrap();
        assert!(first.starts_with("$argon2"));
        assert_ne!(first, second);
        assert!(!first.contains("admin123"));
    }

    #[test]
    fn test_insert_hash_rejects_malformed_hash() {
        let mut hashed = HashedCredentials::new();
        let result = hashed.insert_hash(
            "plaintext",
            Profile::new("3", "Bob Viewer", "viewer@demo.com", Role::Viewer),
        );
        assert!(matches!(result, Err(AuthError::Hashing(_))));
        assert!(hashed.is_empty());
    }
}
