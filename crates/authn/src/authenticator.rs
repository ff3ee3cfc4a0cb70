//! Session authenticator: one object wiring the key cache, issuer, and validator.
//!
//! This is what a host service constructs once at startup and hands to both
//! its login endpoint and its request middleware.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tokensmith_authn::{AuthConfig, SessionAuthenticator, identity};
//! use tokensmith_storage::auth::MemorySigningKeyStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = SessionAuthenticator::new(Arc::new(MemorySigningKeyStore::new()), AuthConfig::default())?;
//!
//! // After the account layer has checked the password:
//! let token = auth.issue_token("alice").await?;
//!
//! // On each request:
//! let header = format!("Bearer {token}");
//! let greeting = auth
//!     .authenticate(&header, async {
//!         format!("hello {}", identity::current().username().unwrap_or("stranger"))
//!     })
//!     .await?;
//! assert_eq!(greeting, "hello alice");
//! # Ok(())
//! # }
//! ```

use std::{future::Future, sync::Arc, time::Duration};

use tokensmith_storage::auth::SigningKeyStore;

use crate::{
    config::{AuthConfig, ConfigError},
    error::AuthError,
    identity::{self, AuthenticatedIdentity},
    issuer::TokenIssuer,
    signing_key_cache::SigningKeyCache,
    validator::TokenValidator,
};

/// Issues and validates session tokens over a shared [`SigningKeyCache`].
#[derive(Debug, Clone)]
pub struct SessionAuthenticator {
    cache: Arc<SigningKeyCache>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    token_lifetime: Duration,
}

impl SessionAuthenticator {
    /// Builds an authenticator over `store` using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails [`AuthConfig::validate`].
    pub fn new(store: Arc<dyn SigningKeyStore>, config: AuthConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let cache = Arc::new(SigningKeyCache::from_config(store, &config));
        Ok(Self {
            issuer: TokenIssuer::with_issuer(Arc::clone(&cache), config.issuer.clone()),
            validator: TokenValidator::with_issuer(Arc::clone(&cache), config.issuer),
            token_lifetime: config.token_lifetime,
            cache,
        })
    }

    /// Issues a token for `username` with the configured default lifetime.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue`].
    pub async fn issue_token(&self, username: &str) -> Result<String, AuthError> {
        self.issuer.issue(username, self.token_lifetime).await
    }

    /// Issues a token for `username` valid for `valid_for`.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue`].
    pub async fn issue_token_valid_for(
        &self,
        username: &str,
        valid_for: Duration,
    ) -> Result<String, AuthError> {
        self.issuer.issue(username, valid_for).await
    }

    /// Validates a raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// See [`TokenValidator::validate_header`].
    pub async fn validate_header(
        &self,
        header_value: &str,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        self.validator.validate_header(header_value).await
    }

    /// Transport hook: validates `header_value`, then runs `handler` with the
    /// resulting identity attached to the request scope.
    ///
    /// The handler is never polled when validation fails.
    ///
    /// # Errors
    ///
    /// See [`TokenValidator::validate_header`].
    pub async fn authenticate<F: Future>(
        &self,
        header_value: &str,
        handler: F,
    ) -> Result<F::Output, AuthError> {
        let identity = self.validate_header(header_value).await?;
        Ok(identity::scope(identity, handler).await)
    }

    /// Returns the underlying key cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<SigningKeyCache> {
        &self.cache
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use chrono::Utc;
    use tokensmith_storage::auth::MemorySigningKeyStore;

    use super::*;
    use crate::jwt::verify_token;

    fn authenticator(config: AuthConfig) -> SessionAuthenticator {
        SessionAuthenticator::new(Arc::new(MemorySigningKeyStore::new()), config).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = AuthConfig::builder().issuer("").build();
        let result = SessionAuthenticator::new(Arc::new(MemorySigningKeyStore::new()), config);
        assert!(matches!(result, Err(ConfigError::Empty { field: "issuer" })));
    }

    #[test]
    fn test_rejects_cache_ttl_above_maximum() {
        let config = AuthConfig::builder()
            .verification_cache_ttl(Duration::from_secs(2000 * 365 * 24 * 60 * 60))
            .build();
        let result = SessionAuthenticator::new(Arc::new(MemorySigningKeyStore::new()), config);
        assert!(matches!(
            result,
            Err(ConfigError::AboveMaximum { field: "verification_cache_ttl", .. })
        ));
    }

    #[tokio::test]
    async fn test_issue_token_uses_configured_lifetime() {
        let auth = authenticator(
            AuthConfig::builder().token_lifetime(Duration::from_secs(600)).issuer("svc").build(),
        );
        let token = auth.issue_token("alice").await.unwrap();

        let key = auth.cache().active_signing_key().await.unwrap();
        let claims = verify_token(&token, &key, "svc").unwrap();
        assert_eq!(claims.exp - claims.iat, 600);
        assert!(claims.iat <= Utc::now().timestamp());
    }

    #[tokio::test]
    async fn test_authenticate_runs_handler_in_scope() {
        let auth = authenticator(AuthConfig::default());
        let token = auth.issue_token_valid_for("bob", Duration::from_secs(60)).await.unwrap();

        let seen = auth
            .authenticate(&format!("Bearer {token}"), async { identity::current() })
            .await
            .unwrap();
        assert_eq!(seen, AuthenticatedIdentity::user("bob"));
    }

    #[tokio::test]
    async fn test_authenticate_without_header() {
        let auth = authenticator(AuthConfig::default());
        let seen = auth.authenticate("", async { identity::current() }).await.unwrap();
        assert!(!seen.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_skips_handler_on_failure() {
        let auth = authenticator(AuthConfig::default());
        let mut ran = false;
        let result = auth.authenticate("Basic abc", async { ran = true }).await;

        assert!(matches!(result, Err(AuthError::UnsupportedScheme)));
        assert!(!ran);
    }
}
