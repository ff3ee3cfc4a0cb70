//! Session token claims and the compact JWS codec.
//!
//! Tokens are `base64url(header).base64url(payload).base64url(signature)`.
//! The header carries `alg` (always `HS256`) and `kid` (the signing key id);
//! the payload carries the [`SessionClaims`].
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use tokensmith_authn::jwt::{SessionClaims, decode_token_header, sign_token, verify_token};
//! use tokensmith_storage::{KeyId, auth::SigningKey};
//!
//! # fn example() -> Result<(), tokensmith_authn::AuthError> {
//! let now = Utc::now();
//! let key = SigningKey::builder()
//!     .id(KeyId::new_random())
//!     .algorithm("HS256")
//!     .secret(vec![42u8; 32])
//!     .generated_at(now)
//!     .expires_at(now + Duration::hours(24))
//!     .build();
//!
//! let claims = SessionClaims::for_user("alice", "tokensmith", now, now + Duration::hours(1));
//! let token = sign_token(&claims, &key)?;
//!
//! let header = decode_token_header(&token)?;
//! assert_eq!(header.alg, "HS256");
//!
//! let verified = verify_token(&token, &key, "tokensmith")?;
//! assert_eq!(verified.username()?, "alice");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokensmith_storage::auth::SigningKey;
use uuid::Uuid;

use crate::{error::AuthError, validation::SIGNING_ALGORITHM};

/// Prefix marking a subject as a user principal.
pub const SUBJECT_PREFIX: &str = "u:";

/// Claims carried by every session token.
///
/// ```json
/// {
///   "iat": 1700000000,
///   "exp": 1700086400,
///   "iss": "tokensmith",
///   "sub": "u:alice",
///   "jti": "0b6f5c2e-8a4d-4a51-9d55-7a3e5f7e6a10"
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiration time (seconds since epoch).
    pub exp: i64,
    /// Issuer.
    pub iss: String,
    /// Subject, `u:<username>` for user tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Unique token id (random UUID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl SessionClaims {
    /// Builds claims for `username` with a fresh random token id.
    #[must_use]
    pub fn for_user(
        username: &str,
        issuer: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: issuer.to_owned(),
            sub: Some(subject_for(username)),
            jti: Some(Uuid::new_v4().to_string()),
        }
    }

    /// Recovers the username from the subject claim.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingSubject`] if there is no subject
    /// - [`AuthError::InvalidSubject`] if the subject lacks the `u:` prefix
    pub fn username(&self) -> Result<&str, AuthError> {
        let subject = self.sub.as_deref().ok_or(AuthError::MissingSubject)?;
        username_from_subject(subject)
    }
}

/// Formats the subject claim for a user principal.
#[must_use]
pub fn subject_for(username: &str) -> String {
    format!("{SUBJECT_PREFIX}{username}")
}

/// Strips the user prefix from a subject claim.
///
/// # Errors
///
/// Returns [`AuthError::InvalidSubject`] if `subject` does not start with `u:`.
pub fn username_from_subject(subject: &str) -> Result<&str, AuthError> {
    subject.strip_prefix(SUBJECT_PREFIX).ok_or(AuthError::InvalidSubject)
}

/// The unverified token header.
///
/// `kid` is kept as a raw JSON value so a non-string `kid` can be reported
/// distinctly from a missing one.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TokenHeader {
    /// Declared signing algorithm.
    pub alg: String,
    /// Key id, as found in the header.
    #[serde(default)]
    pub kid: Option<Value>,
}

/// Decode the token header without verifying anything.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if:
/// - The token is empty or contains whitespace
/// - The token does not have exactly 3 dot-separated parts
/// - The header is not base64url or not a JSON object with an `alg` string
pub fn decode_token_header(token: &str) -> Result<TokenHeader, AuthError> {
    if token.is_empty() {
        return Err(AuthError::malformed_token("empty token"));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(AuthError::malformed_token("token contains whitespace"));
    }

    let mut parts = token.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::malformed_token("token must have 3 parts separated by dots"));
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| AuthError::malformed_token(format!("failed to decode header: {e}")))?;

    serde_json::from_slice(&header_bytes)
        .map_err(|e| AuthError::malformed_token(format!("failed to parse header: {e}")))
}

/// Sign `claims` with `key`, putting the key id in the `kid` header.
///
/// # Errors
///
/// Returns [`AuthError::Signing`] if the key is not an HS256 key or encoding fails.
pub fn sign_token(claims: &SessionClaims, key: &SigningKey) -> Result<String, AuthError> {
    if key.algorithm != SIGNING_ALGORITHM {
        return Err(AuthError::Signing(format!(
            "signing key {} uses algorithm {}",
            key.id, key.algorithm
        )));
    }

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(key.id.to_string());

    encode(&header, claims, &EncodingKey::from_secret(&key.secret))
        .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Verify signature, issuer, and expiry of `token` against `key`.
///
/// No leeway is applied to `exp`, and a token is expired from its `exp`
/// second onward. Both `exp` and `iss` are required.
///
/// # Errors
///
/// Returns [`AuthError::TokenRejected`] for every verification failure,
/// including a verification key whose stored algorithm is not HS256.
pub fn verify_token(token: &str, key: &SigningKey, issuer: &str) -> Result<SessionClaims, AuthError> {
    if key.algorithm != SIGNING_ALGORITHM {
        return Err(AuthError::rejected(format!(
            "verification key {} uses algorithm {}",
            key.id, key.algorithm
        )));
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss"]);

    let token_data = decode::<SessionClaims>(token, &DecodingKey::from_secret(&key.secret), &validation)?;

    // jsonwebtoken only rejects `exp < now`; the expiry second itself is already too late.
    if token_data.claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::rejected("token expired"));
    }

    Ok(token_data.claims)
}
