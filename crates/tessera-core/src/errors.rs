//! Unified error system for Tessera
//!
//! Every component reports failures through a single [`TesseraError`]. Each
//! variant is one entry of the secure-content error taxonomy and carries a
//! human-readable cause, so callers outside the core can decide whether to
//! retry, re-authenticate, or surface a fatal error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error type for all Tessera operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TesseraError {
    /// Local cryptographic or key-server configuration failure during encryption
    #[error("Encryption failed: {message}")]
    Encryption {
        /// What went wrong
        message: String,
    },

    /// Ciphertext header or payload could not be parsed or authenticated
    #[error("Corrupt ciphertext: {message}")]
    CorruptCiphertext {
        /// What went wrong
        message: String,
    },

    /// Fewer than `t` authorized decryption shares were obtained, or a
    /// ledger transaction was rejected for the sender
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Why access was denied
        message: String,
    },

    /// The session credential is past `issued_at + ttl`
    #[error("Session expired: {message}")]
    SessionExpired {
        /// Expiry details
        message: String,
    },

    /// The session credential is unsigned or bound to another package
    #[error("Invalid session: {message}")]
    InvalidSession {
        /// Why the session was rejected
        message: String,
    },

    /// A signature did not verify against the expected public key
    #[error("Invalid signature: {message}")]
    InvalidSignature {
        /// Verification failure details
        message: String,
    },

    /// Blob or ledger object missing or expired
    #[error("Not found: {message}")]
    NotFound {
        /// What was not found
        message: String,
    },

    /// Blob write failed in the storage network
    #[error("Storage write failed: {message}")]
    StorageWriteFailed {
        /// Failure details
        message: String,
    },

    /// Blob read failed in the storage network
    #[error("Storage read failed: {message}")]
    StorageReadFailed {
        /// Failure details
        message: String,
    },

    /// A key server could not be reached before its deadline
    #[error("Key server unreachable: {message}")]
    KeyServerUnreachable {
        /// Server and failure details
        message: String,
    },

    /// Ledger call failed
    #[error("Ledger error: {message}")]
    Ledger {
        /// Failure details
        message: String,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// What was invalid
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Failure details
        message: String,
    },
}

/// Discriminant of [`TesseraError`] for matching without the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`TesseraError::Encryption`]
    Encryption,
    /// See [`TesseraError::CorruptCiphertext`]
    CorruptCiphertext,
    /// See [`TesseraError::AccessDenied`]
    AccessDenied,
    /// See [`TesseraError::SessionExpired`]
    SessionExpired,
    /// See [`TesseraError::InvalidSession`]
    InvalidSession,
    /// See [`TesseraError::InvalidSignature`]
    InvalidSignature,
    /// See [`TesseraError::NotFound`]
    NotFound,
    /// See [`TesseraError::StorageWriteFailed`]
    StorageWriteFailed,
    /// See [`TesseraError::StorageReadFailed`]
    StorageReadFailed,
    /// See [`TesseraError::KeyServerUnreachable`]
    KeyServerUnreachable,
    /// See [`TesseraError::Ledger`]
    Ledger,
    /// See [`TesseraError::Invalid`]
    Invalid,
    /// See [`TesseraError::Internal`]
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Encryption => "encryption_error",
            ErrorKind::CorruptCiphertext => "corrupt_ciphertext",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::InvalidSession => "invalid_session",
            ErrorKind::InvalidSignature => "invalid_signature",
            ErrorKind::NotFound => "not_found",
            ErrorKind::StorageWriteFailed => "storage_write_failed",
            ErrorKind::StorageReadFailed => "storage_read_failed",
            ErrorKind::KeyServerUnreachable => "key_server_unreachable",
            ErrorKind::Ledger => "ledger_error",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl TesseraError {
    /// Create an encryption error
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// Create a corrupt ciphertext error
    pub fn corrupt_ciphertext(message: impl Into<String>) -> Self {
        Self::CorruptCiphertext {
            message: message.into(),
        }
    }

    /// Create an access denied error
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Create a session expired error
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::SessionExpired {
            message: message.into(),
        }
    }

    /// Create an invalid session error
    pub fn invalid_session(message: impl Into<String>) -> Self {
        Self::InvalidSession {
            message: message.into(),
        }
    }

    /// Create an invalid signature error
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a storage write error
    pub fn storage_write(message: impl Into<String>) -> Self {
        Self::StorageWriteFailed {
            message: message.into(),
        }
    }

    /// Create a storage read error
    pub fn storage_read(message: impl Into<String>) -> Self {
        Self::StorageReadFailed {
            message: message.into(),
        }
    }

    /// Create a key server unreachable error
    pub fn key_server_unreachable(message: impl Into<String>) -> Self {
        Self::KeyServerUnreachable {
            message: message.into(),
        }
    }

    /// Create a ledger error
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Discriminant of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encryption { .. } => ErrorKind::Encryption,
            Self::CorruptCiphertext { .. } => ErrorKind::CorruptCiphertext,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::SessionExpired { .. } => ErrorKind::SessionExpired,
            Self::InvalidSession { .. } => ErrorKind::InvalidSession,
            Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::StorageWriteFailed { .. } => ErrorKind::StorageWriteFailed,
            Self::StorageReadFailed { .. } => ErrorKind::StorageReadFailed,
            Self::KeyServerUnreachable { .. } => ErrorKind::KeyServerUnreachable,
            Self::Ledger { .. } => ErrorKind::Ledger,
            Self::Invalid { .. } => ErrorKind::Invalid,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Human-readable cause without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Encryption { message }
            | Self::CorruptCiphertext { message }
            | Self::AccessDenied { message }
            | Self::SessionExpired { message }
            | Self::InvalidSession { message }
            | Self::InvalidSignature { message }
            | Self::NotFound { message }
            | Self::StorageWriteFailed { message }
            | Self::StorageReadFailed { message }
            | Self::KeyServerUnreachable { message }
            | Self::Ledger { message }
            | Self::Invalid { message }
            | Self::Internal { message } => message,
        }
    }

    /// Whether retrying the same call (with backoff) can succeed without the
    /// caller changing configuration, policy or credentials
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::StorageWriteFailed
                | ErrorKind::StorageReadFailed
                | ErrorKind::KeyServerUnreachable
        )
    }

    /// Whether the caller must negotiate a new session before retrying
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::SessionExpired | ErrorKind::InvalidSession
        )
    }
}

/// Standard Result type for Tessera operations
pub type Result<T> = std::result::Result<T, TesseraError>;

impl From<std::io::Error> for TesseraError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for TesseraError {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid(format!("Invalid TOML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TesseraError::access_denied("quorum not reached");
        assert!(matches!(err, TesseraError::AccessDenied { .. }));
        assert_eq!(err.to_string(), "Access denied: quorum not reached");
        assert_eq!(err.message(), "quorum not reached");
    }

    #[test]
    fn test_kind_and_retry_policy() {
        assert!(TesseraError::storage_read("timeout").is_retryable());
        assert!(TesseraError::key_server_unreachable("down").is_retryable());
        assert!(!TesseraError::access_denied("no").is_retryable());
        assert!(!TesseraError::not_found("gone").is_retryable());
        assert!(TesseraError::session_expired("late").requires_reauthentication());
        assert_eq!(
            TesseraError::corrupt_ciphertext("bad").kind().to_string(),
            "corrupt_ciphertext"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing config");
        let err = TesseraError::from(io_err);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_serde_roundtrip_keeps_kind() {
        let err = TesseraError::session_expired("ttl elapsed");
        let json = serde_json::to_string(&err).unwrap();
        let back: TesseraError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
