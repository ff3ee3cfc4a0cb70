//! Signing key record as persisted by a key store.

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use crate::types::KeyId;

/// Symmetric signing key used to MAC session tokens.
///
/// Keys are created once, never mutated, and never deleted by the token
/// subsystem; expiry is a read-time filter. Cached copies handed out by a
/// store are read-only snapshots.
///
/// # Lifetime
///
/// A key is *active for issuance* while `now < expires_at`. It remains usable
/// for *verification* after that, for as long as tokens signed with it are
/// themselves unexpired.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use tokensmith_storage::{KeyId, auth::SigningKey};
///
/// let now = Utc::now();
/// let key = SigningKey::builder()
///     .id(KeyId::new_random())
///     .algorithm("HS256")
///     .secret(vec![7u8; 32])
///     .generated_at(now)
///     .expires_at(now + Duration::hours(24))
///     .build();
///
/// assert!(key.is_active_at(now));
/// assert!(!key.is_active_at(now + Duration::hours(24)));
/// ```
#[derive(Clone, PartialEq, bon::Builder)]
pub struct SigningKey {
    /// Unique key id, carried in the token `kid` header.
    pub id: KeyId,

    /// Algorithm name (e.g. `HS256`).
    #[builder(into)]
    pub algorithm: String,

    /// Raw secret bytes, scrubbed from memory on drop.
    #[builder(into)]
    pub secret: Zeroizing<Vec<u8>>,

    /// When the key was generated.
    pub generated_at: DateTime<Utc>,

    /// When the key stops being eligible for issuance.
    pub expires_at: DateTime<Utc>,
}

impl SigningKey {
    /// Returns `true` if the key may still be used to sign new tokens at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

// Secret material never reaches logs through `{:?}`.
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .field("secret", &format_args!("<{} bytes redacted>", self.secret.len()))
            .field("generated_at", &self.generated_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
