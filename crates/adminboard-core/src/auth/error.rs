use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown identifier and wrong secret are reported identically
    #[error("Invalid email or password")]
    AuthenticationFailed,

    #[error("Failed to hash secret: {0}")]
    Hashing(String),
}
