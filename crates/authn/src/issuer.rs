//! Session token issuance.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::{
    config::{DEFAULT_ISSUER, checked_offset},
    error::AuthError,
    jwt::{SessionClaims, sign_token},
    signing_key_cache::SigningKeyCache,
};

/// Issues signed session tokens for authenticated principals.
///
/// Only call this after the account layer has verified the principal's
/// credentials; the issuer trusts the username it is given.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    cache: Arc<SigningKeyCache>,
    issuer: String,
}

impl TokenIssuer {
    /// Creates an issuer with the default `iss` claim.
    #[must_use]
    pub fn new(cache: Arc<SigningKeyCache>) -> Self {
        Self::with_issuer(cache, DEFAULT_ISSUER)
    }

    /// Creates an issuer that stamps `issuer` into every token.
    #[must_use]
    pub fn with_issuer(cache: Arc<SigningKeyCache>, issuer: impl Into<String>) -> Self {
        Self { cache, issuer: issuer.into() }
    }

    /// Returns the `iss` claim this issuer writes.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issues a token for `username` valid for `valid_for` from now.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyStorageError`] if the active key cannot be loaded or persisted
    /// - [`AuthError::RandomSource`] if key generation fails
    /// - [`AuthError::Signing`] if encoding fails
    /// - [`AuthError::Config`] if `valid_for` overflows the clock
    pub async fn issue(&self, username: &str, valid_for: Duration) -> Result<String, AuthError> {
        self.issue_at(username, valid_for, Utc::now()).await
    }

    /// Issues a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Same as [`issue`](Self::issue).
    #[tracing::instrument(skip(self), fields(issuer = %self.issuer))]
    pub async fn issue_at(
        &self,
        username: &str,
        valid_for: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let key = self.cache.active_signing_key_at(now).await?;

        let expires_at = checked_offset(now, valid_for, "valid_for")?;
        let claims = SessionClaims::for_user(username, &self.issuer, now, expires_at);
        let token = sign_token(&claims, &key)?;

        tracing::info!(
            username,
            issued_at = %now,
            expires_at = %expires_at,
            token_id = claims.jti.as_deref().unwrap_or_default(),
            key_id = %key.id,
            alg = %key.algorithm,
            "issued token"
        );

        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use tokensmith_storage::auth::MemorySigningKeyStore;

    use super::*;
    use crate::jwt::{decode_token_header, verify_token};

    fn issuer() -> (TokenIssuer, Arc<SigningKeyCache>) {
        let cache = Arc::new(SigningKeyCache::new(Arc::new(MemorySigningKeyStore::new())));
        (TokenIssuer::new(Arc::clone(&cache)), cache)
    }

    #[tokio::test]
    async fn test_issue_claims() {
        let (issuer, cache) = issuer();
        let token = issuer.issue("alice", Duration::from_secs(3600)).await.unwrap();

        let key = cache.active_signing_key().await.unwrap();
        let header = decode_token_header(&token).unwrap();
        assert_eq!(header.alg, "HS256");
        assert_eq!(header.kid, Some(serde_json::Value::String(key.id.to_string())));

        let claims = verify_token(&token, &key, "tokensmith").unwrap();
        assert_eq!(claims.sub.as_deref(), Some("u:alice"));
        assert_eq!(claims.iss, "tokensmith");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn test_issue_uses_configured_issuer() {
        let cache = Arc::new(SigningKeyCache::new(Arc::new(MemorySigningKeyStore::new())));
        let issuer = TokenIssuer::with_issuer(Arc::clone(&cache), "other-service");
        let token = issuer.issue("bob", Duration::from_secs(60)).await.unwrap();

        let key = cache.active_signing_key().await.unwrap();
        assert_eq!(verify_token(&token, &key, "other-service").unwrap().iss, "other-service");
        assert!(verify_token(&token, &key, "tokensmith").is_err());
    }

    #[tokio::test]
    async fn test_tokens_have_distinct_ids() {
        let (issuer, cache) = issuer();
        let a = issuer.issue("alice", Duration::from_secs(60)).await.unwrap();
        let b = issuer.issue("alice", Duration::from_secs(60)).await.unwrap();
        assert_ne!(a, b);

        let key = cache.active_signing_key().await.unwrap();
        let a = verify_token(&a, &key, "tokensmith").unwrap();
        let b = verify_token(&b, &key, "tokensmith").unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[tokio::test]
    async fn test_issue_rejects_overflowing_validity() {
        let (issuer, _) = issuer();
        let err = issuer.issue("alice", Duration::from_secs(u64::MAX)).await.unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
    }
}
