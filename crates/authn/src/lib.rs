//! # Tokensmith Authentication
//!
//! Bearer session tokens for services that authenticate their own users.
//!
//! This crate provides:
//! - **Token issuance**: HS256-signed session tokens for a verified username
//! - **Token validation**: `Authorization: Bearer` parsing, signature, issuer and expiry checks
//! - **Signing key cache**: lazy generation, rotation and lookup of HMAC keys
//! - **Request identity**: a task-local [`AuthenticatedIdentity`] for handlers
//!
//! ## Security
//!
//! - Only `HS256` is accepted; `none`, `HS384` and `HS512` are explicitly rejected
//! - Every token names its signing key through a UUID `kid` header
//! - Retired keys keep verifying until their own expiry, so rotation never
//!   invalidates live sessions
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokensmith_authn::{AuthConfig, SessionAuthenticator};
//! use tokensmith_storage::auth::MemorySigningKeyStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemorySigningKeyStore::new());
//! let auth = SessionAuthenticator::new(store, AuthConfig::default())?;
//!
//! let token = auth.issue_token("alice").await?;
//! let identity = auth.validate_header(&format!("Bearer {token}")).await?;
//!
//! println!("Authenticated as: {}", identity.username().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod config;
pub mod error;
pub mod identity;
pub mod issuer;
pub mod jwt;
/// Lazily generated, rotating signing keys.
pub mod signing_key_cache;
pub mod validation;
pub mod validator;

/// Shared test utilities (feature-gated).
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

// Re-export key types for convenience
pub use authenticator::SessionAuthenticator;
pub use config::{
    AuthConfig, ConfigError, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_ISSUER,
    DEFAULT_KEY_LIFETIME, DEFAULT_STORE_TIMEOUT, DEFAULT_TOKEN_LIFETIME, MAX_CACHE_TTL,
};
pub use error::{AuthError, ErrorKind, Result};
pub use identity::AuthenticatedIdentity;
pub use issuer::TokenIssuer;
pub use jwt::SessionClaims;
pub use signing_key_cache::SigningKeyCache;
pub use validation::{FORBIDDEN_ALGORITHMS, SIGNING_ALGORITHM, validate_algorithm};
pub use validator::TokenValidator;
