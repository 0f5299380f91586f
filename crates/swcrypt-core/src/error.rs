//! Error types for swcrypt operations

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::provider::ProviderCode;

/// Result type alias for swcrypt operations
pub type Result<T> = std::result::Result<T, Error>;

/// The size-bounded artifacts a command reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Exported or imported key blob
    Key,
    /// Signature blob
    Signature,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Key => f.write_str("Key"),
            Artifact::Signature => f.write_str("Signature"),
        }
    }
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A name was not found in one of the registries
    UnknownOption,
    /// The algorithm is not available on a legacy platform
    UnsupportedOnPlatform,
    /// A key or signature blob is larger than its ceiling
    SizeLimitExceeded,
    /// The cryptographic provider rejected an operation
    ProviderUnavailable,
    /// A file could not be read, written or measured
    IoFailure,
}

/// Main error type for swcrypt operations
#[derive(Error, Debug)]
pub enum Error {
    /// Name not present in a registry
    #[error("Unknown {registry}: {name}")]
    UnknownOption {
        /// Registry that was searched
        registry: &'static str,
        /// The name that was looked up
        name: String,
    },

    /// Algorithm refused by the legacy platform policy gate
    #[error("Hash algorithm {algorithm} is not supported on legacy platforms")]
    UnsupportedOnPlatform {
        /// Registry name of the algorithm
        algorithm: String,
    },

    /// Blob size above the ceiling, detected before any transfer
    #[error("{artifact} size of {size} bytes exceeds the limit of {limit} bytes")]
    SizeLimitExceeded {
        /// Which artifact was being transferred
        artifact: Artifact,
        /// Size that was required
        size: u64,
        /// Ceiling that applies
        limit: usize,
    },

    /// Provider operation failure
    #[error("{operation} failed with error code {code}")]
    Provider {
        /// Provider capability that failed
        operation: &'static str,
        /// Code reported by the provider
        code: ProviderCode,
    },

    /// File I/O failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File that was being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create a new UnknownOption error
    pub fn unknown_option<S: Into<String>>(registry: &'static str, name: S) -> Self {
        Error::UnknownOption {
            registry,
            name: name.into(),
        }
    }

    /// Create a new Provider error
    pub fn provider(operation: &'static str, code: ProviderCode) -> Self {
        Error::Provider { operation, code }
    }

    /// Create a new Io error for `path`
    pub fn io<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownOption { .. } => ErrorKind::UnknownOption,
            Error::UnsupportedOnPlatform { .. } => ErrorKind::UnsupportedOnPlatform,
            Error::SizeLimitExceeded { .. } => ErrorKind::SizeLimitExceeded,
            Error::Provider { .. } => ErrorKind::ProviderUnavailable,
            Error::Io { .. } => ErrorKind::IoFailure,
        }
    }

    /// The platform diagnostic code behind this error, if there is one
    pub fn diagnostic_code(&self) -> Option<u32> {
        match self {
            Error::Provider { code, .. } => Some(code.value()),
            Error::Io { source, .. } => source.raw_os_error().map(|code| code as u32),
            _ => None,
        }
    }

    /// Check if this error was raised before any provider session was opened
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            Error::UnknownOption { .. } | Error::UnsupportedOnPlatform { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::unknown_option("hash algorithm", "sha-3");
        assert_eq!(err.to_string(), "Unknown hash algorithm: sha-3");

        let err = Error::provider("sign hash", ProviderCode::NO_KEY);
        assert_eq!(err.to_string(), "sign hash failed with error code 0x8009000D");

        let err = Error::SizeLimitExceeded {
            artifact: Artifact::Signature,
            size: 1_000_001,
            limit: 1_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Signature size of 1000001 bytes exceeds the limit of 1000000 bytes"
        );
    }

    #[test]
    fn test_error_classification() {
        let err = Error::provider("acquire context", ProviderCode::BAD_KEYSET);
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert_eq!(err.diagnostic_code(), Some(0x8009_0016));
        assert!(!err.is_policy_rejection());

        let err = Error::UnsupportedOnPlatform {
            algorithm: "sha-256".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::UnsupportedOnPlatform);
        assert_eq!(err.diagnostic_code(), None);
        assert!(err.is_policy_rejection());

        let err = Error::io("missing.key", io::Error::from_raw_os_error(2));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(err.diagnostic_code(), Some(2));
    }
}
