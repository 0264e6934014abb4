//! Error types for warren

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Which authentication check rejected the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The sealed secret did not open: wrong password or a damaged prefix
    Envelope,
    /// The HMAC over the ciphertext region did not match the stored tag
    Payload,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailure::Envelope => {
                write!(f, "boxed MAC verification failed, wrong password or corrupted envelope")
            }
            AuthFailure::Payload => write!(f, "payload MAC verification failed"),
        }
    }
}

/// Main error type for warren
#[derive(Error, Debug)]
pub enum Error {
    // Crypto errors
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Encapsulation error: {0}")]
    Encapsulation(String),

    #[error("Authentication failed: {0}")]
    Authentication(AuthFailure),

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    // Container errors
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// True for either flavour of authentication failure
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_messages_are_distinct() {
        let envelope = Error::Authentication(AuthFailure::Envelope).to_string();
        let payload = Error::Authentication(AuthFailure::Payload).to_string();

        assert!(envelope.contains("wrong password"));
        assert!(payload.contains("payload MAC verification failed"));
        assert_ne!(envelope, payload);
    }

    #[test]
    fn test_is_authentication() {
        assert!(Error::Authentication(AuthFailure::Payload).is_authentication());
        assert!(!Error::KeyDerivation("bad".to_string()).is_authentication());
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
