//! Token header validation.
//!
//! This module provides the security checks applied to a token's header
//! before any key lookup happens: the declared algorithm and the `kid`.
//!
//! # Security
//!
//! - Strict algorithm check to prevent algorithm substitution attacks
//! - Only HMAC-SHA256 is accepted; `none` and every asymmetric algorithm are rejected
//! - The `kid` must be a string holding a UUID before it reaches the key store

use serde_json::Value;
use tokensmith_storage::KeyId;

use crate::error::AuthError;

/// Algorithms that are never accepted, with a dedicated rejection message.
///
/// `none` disables signature verification. `HS384` and `HS512` are HMAC
/// variants this system never issues.
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS384", "HS512"];

/// The only algorithm this system issues and accepts.
pub const SIGNING_ALGORITHM: &str = "HS256";

/// Validate the declared JWT algorithm.
///
/// The comparison is exact and case-sensitive: `hs256` is not `HS256`.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] for anything other than `HS256`.
///
/// # Examples
///
/// ```
/// use tokensmith_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("HS256").is_ok());
/// assert!(validate_algorithm("none").is_err());
/// assert!(validate_algorithm("RS256").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "Algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    if alg != SIGNING_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "Algorithm '{alg}' is not accepted (only {SIGNING_ALGORITHM} is supported)"
        )));
    }

    Ok(())
}

/// Validate the `kid` header value and parse it into a [`KeyId`].
///
/// # Errors
///
/// - [`AuthError::MissingKeyId`] if the header has no `kid`
/// - [`AuthError::KeyIdNotString`] if `kid` is present but not a JSON string
/// - [`AuthError::InvalidKeyId`] if `kid` is not a UUID
pub fn validate_kid(kid: Option<&Value>) -> Result<KeyId, AuthError> {
    let value = kid.ok_or(AuthError::MissingKeyId)?;
    let Value::String(raw) = value else {
        return Err(AuthError::KeyIdNotString);
    };
    raw.parse().map_err(|_| AuthError::InvalidKeyId)
}
