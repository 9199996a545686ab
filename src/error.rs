use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for all cryptographic operations.
///
/// `AuthenticationFailure` and `Unwrap` deliberately carry no detail: a
/// wrong key, wrong associated data and a corrupted ciphertext are
/// indistinguishable at the interface, so callers cannot be used as a
/// decryption oracle.
#[derive(Debug, Error)]
pub enum Error {
    #[error("key generation failed: {reason}")]
    KeyGen { reason: String },

    #[error("key agreement failed: {reason}")]
    KeyAgreement { reason: String },

    #[error("KEM encapsulation failed: {reason}")]
    Encapsulation { reason: String },

    #[error("KEM decapsulation failed: {reason}")]
    Decapsulation { reason: String },

    #[error("key derivation failed: {reason}")]
    Derivation { reason: String },

    #[error("password key derivation failed: {reason}")]
    PasswordDerivation { reason: String },

    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    #[error("ciphertext authentication failed")]
    AuthenticationFailure,

    #[error("key unwrap failed")]
    Unwrap,

    #[error("invalid recovery code: {reason}")]
    InvalidRecoveryCode { reason: String },

    #[error("wire encoding failed: {reason}")]
    Encoding { reason: String },

    /// A lower-level failure annotated with the operation that hit it.
    #[error("{operation}")]
    Operation {
        operation: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps this error with a message naming the failed operation, keeping
    /// the original error reachable through `std::error::Error::source`.
    #[must_use]
    pub fn in_operation(self, operation: impl Into<String>) -> Self {
        Error::Operation {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error underneath any `Operation` wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Operation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn operation_wrapping_preserves_cause() {
        let err = Error::Unwrap.in_operation("failed to unwrap mail key");
        assert_eq!(err.to_string(), "failed to unwrap mail key");
        assert_eq!(err.source().unwrap().to_string(), "key unwrap failed");
        assert!(matches!(err.root_cause(), Error::Unwrap));
    }

    #[test]
    fn authentication_failure_carries_no_detail() {
        assert_eq!(
            Error::AuthenticationFailure.to_string(),
            "ciphertext authentication failed"
        );
    }
}
