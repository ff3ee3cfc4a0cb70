//! Shared test utilities for authentication testing.
//!
//! This module provides helpers for building session-token payloads,
//! HS256-signing arbitrary header/payload pairs, crafting unsigned JWT
//! strings (for attack testing), and wiring an authenticator over an
//! instrumented store. It is feature-gated behind `testutil` to prevent
//! leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! tokensmith-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use tokensmith_authn::testutil::{craft_raw_jwt, sign_hs256};
//! ```

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey};
use serde_json::{Value, json};
use tokensmith_storage::{
    auth::{SigningKey, SigningKeyStore},
    testutil::InstrumentedStore,
};

use crate::{authenticator::SessionAuthenticator, config::AuthConfig};

/// Builds a session-token payload for `username` expiring `expires_in_secs`
/// from now (negative for an already expired token).
#[must_use]
pub fn session_payload(username: &str, issuer: &str, expires_in_secs: i64) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iat": now,
        "exp": now + expires_in_secs,
        "iss": issuer,
        "sub": format!("u:{username}"),
        "jti": uuid::Uuid::new_v4().to_string(),
    })
}

/// Creates a raw JWT string from arbitrary header and payload JSON.
///
/// The resulting JWT has the structure `{header_b64}.{payload_b64}.`
/// with an empty signature. This is useful for testing rejection of
/// malformed or attack JWTs (e.g., `alg: "none"`).
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_jwt(header_json: &Value, payload_json: &Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// HMAC-SHA256-signs an arbitrary header and payload with `secret`.
///
/// Unlike [`crate::jwt::sign_token`], nothing about the header or payload is
/// checked, so tests can forge tokens with odd `alg`, `kid`, or claims that
/// still carry a correct signature.
///
/// # Panics
///
/// Panics if signing fails.
pub fn sign_hs256(secret: &[u8], header_json: &Value, payload_json: &Value) -> String {
    let unsigned = craft_raw_jwt(header_json, payload_json);
    let unsigned = unsigned.trim_end_matches('.');
    let signature = jsonwebtoken::crypto::sign(
        unsigned.as_bytes(),
        &EncodingKey::from_secret(secret),
        Algorithm::HS256,
    )
    .expect("HS256 signing");
    format!("{unsigned}.{signature}")
}

/// Signs `payload_json` with `key`, using a standard `{alg: HS256, kid}` header.
pub fn sign_with_key(key: &SigningKey, payload_json: &Value) -> String {
    let header = json!({"alg": "HS256", "typ": "JWT", "kid": key.id.to_string()});
    sign_hs256(&key.secret, &header, payload_json)
}

/// Builds a [`SessionAuthenticator`] over a fresh [`InstrumentedStore`].
///
/// Returns the store too, so tests can inject failures and count calls.
///
/// # Panics
///
/// Panics if `config` is invalid.
pub fn instrumented_authenticator(
    config: AuthConfig,
) -> (SessionAuthenticator, Arc<InstrumentedStore>) {
    let store = Arc::new(InstrumentedStore::new());
    let auth = SessionAuthenticator::new(Arc::clone(&store) as Arc<dyn SigningKeyStore>, config)
        .expect("valid test config");
    (auth, store)
}

/// Asserts that a [`Result<T, AuthError>`](crate::AuthError) is an `Err` matching the given
/// [`AuthError`](crate::AuthError) variant.
///
/// Works with any `AuthError` variant. On failure, prints the expected variant
/// and the actual result for debugging.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use tokensmith_authn::assert_auth_error;
/// use tokensmith_authn::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::MissingKeyId);
/// assert_auth_error!(result, MissingKeyId);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use tokensmith_storage::testutil::make_signing_key;

    use super::*;
    use crate::{error::AuthError, jwt::verify_token};

    #[test]
    fn test_craft_raw_jwt_format() {
        let header = json!({"alg": "none", "typ": "JWT"});
        let payload = json!({"sub": "u:test"});
        let jwt = craft_raw_jwt(&header, &payload);
        let parts: Vec<&str> = jwt.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[2].is_empty(), "signature should be empty for raw JWTs");
    }

    #[test]
    fn test_sign_with_key_verifies() {
        let key = make_signing_key(Utc::now(), Duration::hours(1));
        let token = sign_with_key(&key, &session_payload("alice", "tokensmith", 60));

        let claims = verify_token(&token, &key, "tokensmith").unwrap();
        assert_eq!(claims.username().unwrap(), "alice");
    }

    #[test]
    fn test_session_payload_expiry_offset() {
        let payload = session_payload("bob", "svc", -30);
        let iat = payload["iat"].as_i64().unwrap();
        let exp = payload["exp"].as_i64().unwrap();
        assert_eq!(exp - iat, -30);
        assert_eq!(payload["sub"], "u:bob");
    }

    #[test]
    fn test_assert_auth_error_macro() {
        let result: Result<(), AuthError> = Err(AuthError::key_not_found("kid-001"));
        assert_auth_error!(result, KeyNotFound);

        let result: Result<(), AuthError> = Err(AuthError::MissingKeyId);
        assert_auth_error!(result, MissingKeyId, "kid should be required");
    }
}
