//! Signing key cache with lazy generation and rotation.
//!
//! This module provides [`SigningKeyCache`], which sits in front of a
//! [`SigningKeyStore`] and answers two questions: which key signs new tokens
//! right now, and which key verifies a token carrying a given `kid`.
//!
//! # Architecture
//!
//! ```text
//! issue  → active slot (snapshot, no lock)
//!        → stale? take generation lock → re-check slot
//!        → newest valid key from store
//!        → none? generate 256-bit secret → persist → publish to slot
//!
//! verify → verification cache (moka, capacity + TTL)
//!        → miss? fetch by id from store → cache
//! ```
//!
//! # Rotation
//!
//! A key is active for issuance until its `expires_at`. The first issuance
//! after that instant selects or generates a successor. Older keys stay in
//! the store and keep verifying tokens signed under them.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use tokensmith_authn::SigningKeyCache;
//! use tokensmith_storage::auth::MemorySigningKeyStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tokensmith_authn::AuthError> {
//! let cache = SigningKeyCache::new(Arc::new(MemorySigningKeyStore::new()));
//!
//! let first = cache.active_signing_key().await?;
//! let second = cache.active_signing_key().await?;
//! assert_eq!(first.id, second.id);
//!
//! let verification = cache.verification_key(first.id).await?;
//! assert_eq!(verification.id, first.id);
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use fail::fail_point;
use moka::future::Cache;
use parking_lot::RwLock;
use rand::{RngCore, rngs::OsRng};
use tokensmith_storage::{
    AlgorithmId, KeyId, StorageError, StorageResult, Zeroizing,
    auth::{SigningKey, SigningKeyStore},
};
use tokio::sync::Mutex;

use crate::{
    config::{
        AuthConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, DEFAULT_KEY_LIFETIME,
        DEFAULT_STORE_TIMEOUT, MAX_CACHE_TTL, checked_offset,
    },
    error::AuthError,
    validation::SIGNING_ALGORITHM,
};

/// Length of generated secrets in bytes (256 bits).
pub const SECRET_LENGTH: usize = 32;

/// Cache of signing keys backed by a [`SigningKeyStore`].
///
/// One instance is shared per process; it is `Send + Sync` and cheap to wrap
/// in an [`Arc`].
///
/// # Concurrency
///
/// - The active-key fast path reads a snapshot and never waits on the store.
/// - Selecting or generating a new active key is serialized by an async
///   mutex, with a re-check after acquiring it, so concurrent callers in one
///   process persist at most one key per expiry cycle.
/// - Verification lookups never take the generation mutex.
pub struct SigningKeyCache {
    /// Durable key storage.
    store: Arc<dyn SigningKeyStore>,
    /// Current key for issuance, if one has been selected.
    active: RwLock<Option<Arc<SigningKey>>>,
    /// Generation lock. Guards the lazily populated algorithm-id map.
    generation: Mutex<HashMap<String, AlgorithmId>>,
    /// Verification keys by id, bounded by capacity and TTL.
    verification: Cache<KeyId, Arc<SigningKey>>,
    /// Lifetime of newly generated keys.
    key_lifetime: Duration,
    /// Upper bound on each store call.
    store_timeout: Duration,
}

impl std::fmt::Debug for SigningKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyCache")
            .field("active_key_id", &self.cached_active_key_id())
            .field("verification_entries", &self.verification.entry_count())
            .field("key_lifetime", &self.key_lifetime)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl SigningKeyCache {
    /// Creates a cache with default lifetimes, capacity, and timeout.
    #[must_use]
    pub fn new(store: Arc<dyn SigningKeyStore>) -> Self {
        Self::with_settings(
            store,
            DEFAULT_KEY_LIFETIME,
            DEFAULT_CACHE_CAPACITY,
            DEFAULT_CACHE_TTL,
            DEFAULT_STORE_TIMEOUT,
        )
    }

    /// Creates a cache from the key-related fields of `config`.
    #[must_use]
    pub fn from_config(store: Arc<dyn SigningKeyStore>, config: &AuthConfig) -> Self {
        Self::with_settings(
            store,
            config.key_lifetime,
            config.verification_cache_capacity,
            config.verification_cache_ttl,
            config.store_timeout,
        )
    }

    /// Creates a cache with explicit settings.
    ///
    /// # Arguments
    ///
    /// * `store` - Durable key storage
    /// * `key_lifetime` - How long a generated key stays active for issuance
    /// * `capacity` - Maximum number of cached verification keys
    /// * `ttl` - Time-to-live of cached verification keys, capped at [`MAX_CACHE_TTL`]
    /// * `store_timeout` - Upper bound on each store call
    #[must_use]
    pub fn with_settings(
        store: Arc<dyn SigningKeyStore>,
        key_lifetime: Duration,
        capacity: u64,
        ttl: Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            active: RwLock::new(None),
            generation: Mutex::new(HashMap::new()),
            verification: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl.min(MAX_CACHE_TTL))
                .build(),
            key_lifetime,
            store_timeout,
        }
    }

    /// Returns a key that is active for issuance now, creating one if needed.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyStorageError`] if the store fails or times out
    /// - [`AuthError::RandomSource`] if secret generation fails
    /// - [`AuthError::Config`] if the key lifetime overflows the clock
    pub async fn active_signing_key(&self) -> Result<Arc<SigningKey>, AuthError> {
        self.active_signing_key_at(Utc::now()).await
    }

    /// Returns a key that is active for issuance at `now`, creating one if needed.
    ///
    /// `now` drives every expiry comparison and the timestamps of a generated
    /// key, which lets callers and tests control the clock.
    ///
    /// # Errors
    ///
    /// Same as [`active_signing_key`](Self::active_signing_key).
    #[tracing::instrument(skip(self))]
    pub async fn active_signing_key_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Arc<SigningKey>, AuthError> {
        if let Some(key) = self.cached_active(now) {
            tracing::debug!(key_id = %key.id, "active key cache hit");
            return Ok(key);
        }

        let mut algorithm_ids = self.generation.lock().await;

        // Another caller may have published a key while we waited.
        if let Some(key) = self.cached_active(now) {
            tracing::debug!(key_id = %key.id, "active key published while waiting");
            return Ok(key);
        }
        tracing::debug!("active key cache miss");

        if let Some(stored) = self.call_store(self.store.newest_valid_key(now)).await? {
            if stored.algorithm == SIGNING_ALGORITHM {
                tracing::debug!(key_id = %stored.id, "loaded active key from store");
                return Ok(self.publish_active(stored).await);
            }
            tracing::warn!(
                key_id = %stored.id,
                algorithm = %stored.algorithm,
                "newest stored key has an unsupported algorithm; generating a replacement"
            );
        }

        let key = self.generate_key(&mut algorithm_ids, now).await?;
        Ok(self.publish_active(key).await)
    }

    /// Returns the key with id `kid` for signature verification.
    ///
    /// Expired keys are returned too: whether a token is still acceptable is
    /// decided by the token's own `exp`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyNotFound`] if the store has no such key
    /// - [`AuthError::KeyStorageError`] if the store fails or times out
    #[tracing::instrument(skip(self))]
    pub async fn verification_key(&self, kid: KeyId) -> Result<Arc<SigningKey>, AuthError> {
        if let Some(key) = self.verification.get(&kid).await {
            tracing::debug!("verification key cache hit");
            return Ok(key);
        }
        tracing::debug!("verification key cache miss");

        fail_point!("verification-key-before-fetch", |_| {
            Err(AuthError::key_storage_error(StorageError::internal(
                "injected failure before key fetch",
            )))
        });

        match self.call_store(self.store.get_key(kid)).await? {
            Some(key) => {
                let key = Arc::new(key);
                self.verification.insert(kid, Arc::clone(&key)).await;
                Ok(key)
            },
            None => {
                tracing::warn!(key_id = %kid, "token references unknown signing key");
                Err(AuthError::key_not_found(kid))
            },
        }
    }

    /// Returns the id of the cached active key, without checking expiry.
    #[must_use]
    pub fn cached_active_key_id(&self) -> Option<KeyId> {
        self.active.read().as_ref().map(|key| key.id)
    }

    /// Returns the verification cache entry count.
    ///
    /// Note: This count is eventually consistent. For accurate counts in tests,
    /// call `sync` first.
    #[must_use]
    pub fn verification_entry_count(&self) -> u64 {
        self.verification.entry_count()
    }

    /// Synchronizes pending verification cache maintenance.
    pub async fn sync(&self) {
        self.verification.run_pending_tasks().await;
    }

    /// Drops every cached key; the next calls go to the store.
    pub async fn clear(&self) {
        *self.active.write() = None;
        self.verification.invalidate_all();
        self.verification.run_pending_tasks().await;
    }

    fn cached_active(&self, now: DateTime<Utc>) -> Option<Arc<SigningKey>> {
        self.active.read().as_ref().filter(|key| key.is_active_at(now)).cloned()
    }

    async fn publish_active(&self, key: SigningKey) -> Arc<SigningKey> {
        let key = Arc::new(key);
        self.verification.insert(key.id, Arc::clone(&key)).await;
        *self.active.write() = Some(Arc::clone(&key));
        key
    }

    // Caller holds the generation lock; `algorithm_ids` is its guarded state.
    async fn generate_key(
        &self,
        algorithm_ids: &mut HashMap<String, AlgorithmId>,
        now: DateTime<Utc>,
    ) -> Result<SigningKey, AuthError> {
        let algorithm_id = match algorithm_ids.get(SIGNING_ALGORITHM) {
            Some(id) => *id,
            None => {
                let id = self.call_store(self.store.insert_algorithm(SIGNING_ALGORITHM)).await?;
                algorithm_ids.insert(SIGNING_ALGORITHM.to_owned(), id);
                id
            },
        };

        let mut secret = Zeroizing::new(vec![0u8; SECRET_LENGTH]);
        OsRng
            .try_fill_bytes(secret.as_mut_slice())
            .map_err(|e| AuthError::RandomSource(e.to_string()))?;

        let key = SigningKey::builder()
            .id(KeyId::new_random())
            .algorithm(SIGNING_ALGORITHM)
            .secret(secret)
            .generated_at(now)
            .expires_at(checked_offset(now, self.key_lifetime, "key_lifetime")?)
            .build();

        fail_point!("signing-key-before-insert", |_| {
            Err(AuthError::key_storage_error(StorageError::internal(
                "injected failure before key insert",
            )))
        });

        self.call_store(self.store.insert_key(algorithm_id, &key)).await?;

        tracing::info!(
            key_id = %key.id,
            algorithm = %key.algorithm,
            generated_at = %key.generated_at,
            expires_at = %key.expires_at,
            key_length = key.secret.len(),
            "generated new signing key"
        );

        Ok(key)
    }

    async fn call_store<T>(
        &self,
        operation: impl Future<Output = StorageResult<T>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.store_timeout, operation).await {
            Ok(result) => result.map_err(AuthError::key_storage_error),
            Err(_) => Err(AuthError::key_storage_error(StorageError::timeout())),
        }
    }
}
