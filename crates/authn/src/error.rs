//! Authentication error types.
//!
//! This module defines errors that can occur while issuing tokens, validating
//! bearer headers, and resolving signing keys. Each error classifies into an
//! [`ErrorKind`] that a transport layer maps onto its own status codes.

use std::fmt;

use thiserror::Error;
use tokensmith_storage::StorageError;

use crate::config::ConfigError;

/// Coarse classification of an [`AuthError`] for the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request is not authenticated.
    Unauthenticated,
    /// The request carried a well-formed but unusable value.
    BadInput,
    /// A server-side failure unrelated to the caller's input.
    Unexpected,
}

impl ErrorKind {
    /// Returns the gRPC-style status code name for this kind.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::BadInput => "INVALID_ARGUMENT",
            Self::Unexpected => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The `Authorization` header is not `<scheme> <credentials>`.
    #[error("malformed auth header")]
    MalformedHeader,

    /// The header scheme is something other than `Bearer`.
    #[error("unsupported auth scheme (not Bearer)")]
    UnsupportedScheme,

    /// The token is not three base64url segments with a JSON header.
    #[error("malformed token: {reason}")]
    MalformedToken {
        /// Which part of the token failed to parse.
        reason: String,
    },

    /// The token declares an algorithm other than HS256.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The token header has no `kid`.
    #[error("missing key ID")]
    MissingKeyId,

    /// The token header `kid` is not a JSON string.
    #[error("kid is not string")]
    KeyIdNotString,

    /// The token header `kid` is not a valid key identifier.
    #[error("invalid key ID")]
    InvalidKeyId,

    /// Signature, issuer, or expiry verification failed.
    ///
    /// The specific cause is deliberately not part of the display text;
    /// use [`AuthError::reason`] when logging.
    #[error("token validation failed")]
    TokenRejected {
        /// Internal cause, for logs only.
        reason: String,
    },

    /// The verified claims carry no subject.
    #[error("missing subject")]
    MissingSubject,

    /// The subject does not identify a user.
    #[error("invalid subject")]
    InvalidSubject,

    /// The token references a key id the store does not know.
    #[error("unknown key ID: {kid}")]
    KeyNotFound {
        /// Key ID that was not found.
        kid: String,
    },

    /// The operating system random source failed.
    #[error("random source failure: {0}")]
    RandomSource(String),

    /// Encoding or signing the token failed.
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// A configured or requested duration is unusable.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage backend error during key lookup or persistence.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for debugging and structured logging.
    #[error("Key storage error: {0}")]
    KeyStorageError(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),
}

impl AuthError {
    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(reason: impl Into<String>) -> Self {
        Self::MalformedToken { reason: reason.into() }
    }

    /// Creates a new `TokenRejected` error carrying an internal reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::TokenRejected { reason: reason.into() }
    }

    /// Creates a new `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(kid: impl fmt::Display) -> Self {
        Self::KeyNotFound { kid: kid.to_string() }
    }

    /// Creates a new `KeyStorageError`.
    #[must_use]
    pub fn key_storage_error(err: StorageError) -> Self {
        Self::KeyStorageError(err)
    }

    /// Classifies this error for the transport boundary.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedHeader
            | Self::UnsupportedScheme
            | Self::MalformedToken { .. }
            | Self::UnsupportedAlgorithm(_)
            | Self::MissingKeyId
            | Self::KeyIdNotString
            | Self::InvalidKeyId
            | Self::TokenRejected { .. }
            | Self::MissingSubject
            | Self::InvalidSubject => ErrorKind::Unauthenticated,
            Self::KeyNotFound { .. } => ErrorKind::BadInput,
            Self::RandomSource(_)
            | Self::Signing(_)
            | Self::Config(_)
            | Self::KeyStorageError(_) => ErrorKind::Unexpected,
        }
    }

    /// Returns the internal cause of a rejection, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::TokenRejected { reason } | Self::MalformedToken { reason } => Some(reason),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind as JwtErrorKind;

        let reason = match err.kind() {
            JwtErrorKind::InvalidSignature => "invalid signature".to_owned(),
            JwtErrorKind::ExpiredSignature => "token expired".to_owned(),
            JwtErrorKind::InvalidIssuer => "issuer mismatch".to_owned(),
            JwtErrorKind::MissingRequiredClaim(claim) => format!("missing required claim: {claim}"),
            JwtErrorKind::InvalidAlgorithm => "algorithm mismatch".to_owned(),
            _ => format!("JWT error: {err}"),
        };
        AuthError::TokenRejected { reason }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::KeyStorageError(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(AuthError::MalformedHeader.to_string(), "malformed auth header");
        assert_eq!(
            AuthError::UnsupportedScheme.to_string(),
            "unsupported auth scheme (not Bearer)"
        );
        assert_eq!(AuthError::MissingKeyId.to_string(), "missing key ID");
        assert_eq!(AuthError::key_not_found("abc").to_string(), "unknown key ID: abc");
    }

    #[test]
    fn test_rejection_hides_reason() {
        let err = AuthError::rejected("invalid signature");
        assert_eq!(err.to_string(), "token validation failed");
        assert_eq!(err.reason(), Some("invalid signature"));
    }

    #[rstest]
    #[case::header(AuthError::MalformedHeader, ErrorKind::Unauthenticated)]
    #[case::scheme(AuthError::UnsupportedScheme, ErrorKind::Unauthenticated)]
    #[case::token(AuthError::malformed_token("empty"), ErrorKind::Unauthenticated)]
    #[case::alg(AuthError::UnsupportedAlgorithm("none".into()), ErrorKind::Unauthenticated)]
    #[case::kid(AuthError::InvalidKeyId, ErrorKind::Unauthenticated)]
    #[case::rejected(AuthError::rejected("expired"), ErrorKind::Unauthenticated)]
    #[case::subject(AuthError::InvalidSubject, ErrorKind::Unauthenticated)]
    #[case::unknown_key(AuthError::key_not_found("k"), ErrorKind::BadInput)]
    #[case::random(AuthError::RandomSource("eof".into()), ErrorKind::Unexpected)]
    #[case::signing(AuthError::Signing("bad key".into()), ErrorKind::Unexpected)]
    #[case::storage(AuthError::from(StorageError::timeout()), ErrorKind::Unexpected)]
    fn test_error_kind(#[case] err: AuthError, #[case] expected: ErrorKind) {
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn test_error_kind_codes() {
        assert_eq!(ErrorKind::Unauthenticated.to_string(), "UNAUTHENTICATED");
        assert_eq!(ErrorKind::BadInput.to_string(), "INVALID_ARGUMENT");
        assert_eq!(ErrorKind::Unexpected.to_string(), "INTERNAL");
    }

    #[test]
    fn test_error_from_jsonwebtoken() {
        let jwt_err =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature);
        let auth_err: AuthError = jwt_err.into();

        assert!(matches!(auth_err, AuthError::TokenRejected { .. }));
        assert_eq!(auth_err.reason(), Some("token expired"));
        assert_eq!(auth_err.to_string(), "token validation failed");
    }

    #[test]
    fn test_signature_and_expiry_are_indistinguishable() {
        let expired: AuthError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature)
                .into();
        let forged: AuthError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature)
                .into();
        assert_eq!(expired.to_string(), forged.to_string());
        assert_eq!(expired.kind(), forged.kind());
    }

    #[test]
    fn test_key_storage_error_preserves_source_chain() {
        use std::error::Error;

        let auth_err = AuthError::from(StorageError::connection("connection refused"));
        assert_eq!(auth_err.to_string(), "Key storage error: Connection error: connection refused");

        let source = auth_err.source().expect("source chain must be preserved");
        assert_eq!(source.to_string(), "Connection error: connection refused");
    }
}
