//! Bearer header validation.
//!
//! # State machine
//!
//! ```text
//! ""                   → unauthenticated identity, no error
//! "<scheme> <token>"   → scheme must be "Bearer"
//! token                → 3 parts, alg == HS256, kid is a UUID string
//! kid                  → verification key (unknown kid = BadInput)
//! signature, iss, exp  → any failure = "token validation failed"
//! sub                  → must be "u:<username>"
//! ```

use std::sync::Arc;

use tokensmith_storage::auth::SigningKey;

use crate::{
    config::DEFAULT_ISSUER,
    error::AuthError,
    identity::AuthenticatedIdentity,
    jwt::{decode_token_header, verify_token},
    signing_key_cache::SigningKeyCache,
    validation::{validate_algorithm, validate_kid},
};

/// Authentication scheme accepted in the `Authorization` header.
pub const BEARER_SCHEME: &str = "Bearer";

/// Splits an `Authorization` header value into its bearer token.
///
/// Returns `Ok(None)` for an empty header. The scheme and token must be
/// separated by exactly one space; the scheme comparison is case-sensitive.
///
/// # Errors
///
/// - [`AuthError::MalformedHeader`] if there is no space separator
/// - [`AuthError::UnsupportedScheme`] if the scheme is not `Bearer`
/// - [`AuthError::MalformedToken`] if the token after `Bearer ` is empty
///
/// # Examples
///
/// ```
/// use tokensmith_authn::validator::parse_authorization_header;
///
/// assert_eq!(parse_authorization_header("").unwrap(), None);
/// assert_eq!(parse_authorization_header("Bearer abc").unwrap(), Some("abc"));
/// assert!(parse_authorization_header("Basic abc").is_err());
/// ```
pub fn parse_authorization_header(header_value: &str) -> Result<Option<&str>, AuthError> {
    if header_value.is_empty() {
        return Ok(None);
    }

    let (scheme, token) = header_value.split_once(' ').ok_or(AuthError::MalformedHeader)?;
    if scheme != BEARER_SCHEME {
        return Err(AuthError::UnsupportedScheme);
    }
    if token.is_empty() {
        return Err(AuthError::malformed_token("empty bearer token"));
    }

    Ok(Some(token))
}

/// Validates bearer headers against keys held by a [`SigningKeyCache`].
#[derive(Debug, Clone)]
pub struct TokenValidator {
    cache: Arc<SigningKeyCache>,
    issuer: String,
}

impl TokenValidator {
    /// Creates a validator that requires the default `iss` claim.
    #[must_use]
    pub fn new(cache: Arc<SigningKeyCache>) -> Self {
        Self::with_issuer(cache, DEFAULT_ISSUER)
    }

    /// Creates a validator that requires `issuer` as the `iss` claim.
    #[must_use]
    pub fn with_issuer(cache: Arc<SigningKeyCache>, issuer: impl Into<String>) -> Self {
        Self { cache, issuer: issuer.into() }
    }

    /// Validates a raw `Authorization` header value.
    ///
    /// An empty header yields [`AuthenticatedIdentity::unauthenticated`];
    /// anything else must be a valid bearer token.
    ///
    /// # Errors
    ///
    /// Every failure is an [`AuthError`]; see [`AuthError::kind`] for how each
    /// classifies. A token naming an unknown key id fails with
    /// [`AuthError::KeyNotFound`].
    #[tracing::instrument(skip_all)]
    pub async fn validate_header(
        &self,
        header_value: &str,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let Some(token) = parse_authorization_header(header_value)? else {
            return Ok(AuthenticatedIdentity::unauthenticated());
        };
        self.validate_token(token).await
    }

    /// Validates a bare token (without the `Bearer ` prefix).
    ///
    /// # Errors
    ///
    /// Same as [`validate_header`](Self::validate_header), minus header errors.
    #[tracing::instrument(skip_all)]
    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let result = self.verify(token).await;
        if let Err(err) = &result {
            tracing::debug!(
                error = %err,
                reason = err.reason().unwrap_or_default(),
                kind = %err.kind(),
                "token rejected"
            );
        }
        result
    }

    async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let header = decode_token_header(token)?;
        validate_algorithm(&header.alg)?;
        let kid = validate_kid(header.kid.as_ref())?;

        let key: Arc<SigningKey> = self.cache.verification_key(kid).await?;
        let claims = verify_token(token, &key, &self.issuer)?;

        let username = claims.username()?;
        tracing::debug!(key_id = %kid, "token accepted");
        Ok(AuthenticatedIdentity::user(username))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;
    use tokensmith_storage::auth::MemorySigningKeyStore;

    use super::*;
    use crate::{ErrorKind, issuer::TokenIssuer};

    fn pair() -> (TokenIssuer, TokenValidator) {
        let cache = Arc::new(SigningKeyCache::new(Arc::new(MemorySigningKeyStore::new())));
        (TokenIssuer::new(Arc::clone(&cache)), TokenValidator::new(cache))
    }

    #[rstest]
    #[case::no_space("Bearer", AuthError::MalformedHeader)]
    #[case::garbage("garbage", AuthError::MalformedHeader)]
    #[case::basic("Basic abc", AuthError::UnsupportedScheme)]
    #[case::lowercase("bearer abc", AuthError::UnsupportedScheme)]
    #[case::leading_space(" Bearer abc", AuthError::UnsupportedScheme)]
    #[case::empty_token("Bearer ", AuthError::malformed_token("empty bearer token"))]
    fn test_parse_header_errors(#[case] header: &str, #[case] expected: AuthError) {
        let err = parse_authorization_header(header).unwrap_err();
        assert_eq!(err.to_string(), expected.to_string());
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn test_parse_header_keeps_rest_verbatim() {
        assert_eq!(parse_authorization_header("Bearer a b").unwrap(), Some("a b"));
        assert_eq!(parse_authorization_header("Bearer  a").unwrap(), Some(" a"));
    }

    #[tokio::test]
    async fn test_empty_header_is_unauthenticated() {
        let (_, validator) = pair();
        let identity = validator.validate_header("").await.unwrap();
        assert!(!identity.is_authenticated());
    }

    #[tokio::test]
    async fn test_issue_then_validate() {
        let (issuer, validator) = pair();
        let token = issuer.issue("alice", Duration::from_secs(3600)).await.unwrap();

        let identity = validator.validate_header(&format!("Bearer {token}")).await.unwrap();
        assert_eq!(identity, AuthenticatedIdentity::user("alice"));
    }

    #[tokio::test]
    async fn test_extra_space_is_malformed_token() {
        let (issuer, validator) = pair();
        let token = issuer.issue("alice", Duration::from_secs(3600)).await.unwrap();

        let err = validator.validate_header(&format!("Bearer  {token}")).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken { .. }));
    }

    #[tokio::test]
    async fn test_issuer_mismatch_rejected() {
        let cache = Arc::new(SigningKeyCache::new(Arc::new(MemorySigningKeyStore::new())));
        let issuer = TokenIssuer::with_issuer(Arc::clone(&cache), "elsewhere");
        let validator = TokenValidator::new(cache);
        let token = issuer.issue("alice", Duration::from_secs(3600)).await.unwrap();

        let err = validator.validate_token(&token).await.unwrap_err();
        assert_eq!(err.to_string(), "token validation failed");
        assert_eq!(err.reason(), Some("issuer mismatch"));
    }

    #[tokio::test]
    async fn test_garbage_token_unauthenticated() {
        let (_, validator) = pair();
        let err = validator.validate_header("Bearer not.a.jwt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }
}
