//! Storage trait for signing key persistence.
//!
//! This module provides the [`SigningKeyStore`] trait that abstracts durable
//! storage of signing keys. Implementations can use different backends
//! (Postgres for production, in-memory for testing).
//!
//! # Schema
//!
//! ```text
//! ┌────────────────────┐        ┌──────────────────────────────┐
//! │   algorithms       │        │   keys                       │
//! │                    │◄───────│                              │
//! │ id, name (unique)  │        │ id (uuid), algorithm_id,     │
//! └────────────────────┘        │ secret, generated_at,        │
//!                               │ expires_at                   │
//!                               └──────────────────────────────┘
//! ```
//!
//! Keys are only ever inserted and read. Nothing in the token subsystem
//! updates or deletes a key row.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{
    auth::SigningKey,
    error::{StorageError, StorageResult},
    types::{AlgorithmId, KeyId},
};

/// Durable storage of signing keys.
///
/// # Atomicity
///
/// Each method is expected to be independently atomic. The store enforces
/// uniqueness of key ids and algorithm names itself; callers do not retry.
///
/// # Error Handling
///
/// Operations return [`StorageResult`]. A missing row is `Ok(None)`, never an
/// error.
#[async_trait]
pub trait SigningKeyStore: Send + Sync {
    /// Inserts an algorithm name and returns its persisted id.
    ///
    /// If the name already exists, the existing id is returned instead of an
    /// error, so concurrent first uses converge on a single row.
    async fn insert_algorithm(&self, name: &str) -> StorageResult<AlgorithmId>;

    /// Persists a newly generated key under the given algorithm id.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Conflict`] if a key with the same id already exists
    /// - [`StorageError::NotFound`] if `algorithm_id` is unknown
    /// - backend errors otherwise
    async fn insert_key(&self, algorithm_id: AlgorithmId, key: &SigningKey) -> StorageResult<()>;

    /// Fetches a key by id, regardless of whether it has expired.
    async fn get_key(&self, id: KeyId) -> StorageResult<Option<SigningKey>>;

    /// Fetches the most recently generated key whose expiration is after `now`.
    async fn newest_valid_key(&self, now: DateTime<Utc>) -> StorageResult<Option<SigningKey>>;
}

#[async_trait]
impl<S: SigningKeyStore + ?Sized> SigningKeyStore for Arc<S> {
    async fn insert_algorithm(&self, name: &str) -> StorageResult<AlgorithmId> {
        (**self).insert_algorithm(name).await
    }

    async fn insert_key(&self, algorithm_id: AlgorithmId, key: &SigningKey) -> StorageResult<()> {
        (**self).insert_key(algorithm_id, key).await
    }

    async fn get_key(&self, id: KeyId) -> StorageResult<Option<SigningKey>> {
        (**self).get_key(id).await
    }

    async fn newest_valid_key(&self, now: DateTime<Utc>) -> StorageResult<Option<SigningKey>> {
        (**self).newest_valid_key(now).await
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    algorithms: HashMap<String, AlgorithmId>,
    keys: HashMap<KeyId, (AlgorithmId, SigningKey)>,
}

impl MemoryState {
    fn algorithm_name(&self, id: AlgorithmId) -> Option<&str> {
        self.algorithms.iter().find(|(_, v)| **v == id).map(|(name, _)| name.as_str())
    }

    // Rows keep the algorithm by id; the name is joined back in on read.
    fn materialize(&self, algorithm_id: AlgorithmId, key: &SigningKey) -> SigningKey {
        let mut key = key.clone();
        if let Some(name) = self.algorithm_name(algorithm_id) {
            key.algorithm = name.to_owned();
        }
        key
    }
}

/// In-memory implementation of [`SigningKeyStore`] for tests and development.
///
/// Data does not survive a restart. Cloning shares the underlying state.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use tokensmith_storage::{KeyId, auth::{MemorySigningKeyStore, SigningKey, SigningKeyStore}};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemorySigningKeyStore::new();
///     let alg = store.insert_algorithm("HS256").await?;
///
///     let now = Utc::now();
///     let key = SigningKey::builder()
///         .id(KeyId::new_random())
///         .algorithm("HS256")
///         .secret(vec![1u8; 32])
///         .generated_at(now)
///         .expires_at(now + Duration::hours(24))
///         .build();
///     store.insert_key(alg, &key).await?;
///
///     assert!(store.get_key(key.id).await?.is_some());
///     assert_eq!(store.newest_valid_key(now).await?.map(|k| k.id), Some(key.id));
///     Ok(())
/// }
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemorySigningKeyStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemorySigningKeyStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of persisted keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.state.read().keys.len()
    }

    /// Returns the number of persisted algorithm names.
    #[must_use]
    pub fn algorithm_count(&self) -> usize {
        self.state.read().algorithms.len()
    }
}

#[async_trait]
impl SigningKeyStore for MemorySigningKeyStore {
    #[tracing::instrument(skip(self))]
    async fn insert_algorithm(&self, name: &str) -> StorageResult<AlgorithmId> {
        let mut state = self.state.write();
        if let Some(id) = state.algorithms.get(name) {
            return Ok(*id);
        }
        let id = AlgorithmId::from(state.algorithms.len() as i64 + 1);
        state.algorithms.insert(name.to_owned(), id);
        Ok(id)
    }

    #[tracing::instrument(skip(self, key), fields(key_id = %key.id))]
    async fn insert_key(&self, algorithm_id: AlgorithmId, key: &SigningKey) -> StorageResult<()> {
        let mut state = self.state.write();

        if state.algorithm_name(algorithm_id).is_none() {
            return Err(StorageError::not_found(format!("algorithm {algorithm_id}")));
        }
        if state.keys.contains_key(&key.id) {
            return Err(StorageError::conflict(format!("key already exists: {}", key.id)));
        }

        state.keys.insert(key.id, (algorithm_id, key.clone()));
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_key(&self, id: KeyId) -> StorageResult<Option<SigningKey>> {
        let state = self.state.read();
        Ok(state.keys.get(&id).map(|(alg, key)| state.materialize(*alg, key)))
    }

    #[tracing::instrument(skip(self))]
    async fn newest_valid_key(&self, now: DateTime<Utc>) -> StorageResult<Option<SigningKey>> {
        let state = self.state.read();
        Ok(state
            .keys
            .values()
            .filter(|(_, key)| key.expires_at > now)
            .max_by_key(|(_, key)| key.generated_at)
            .map(|(alg, key)| state.materialize(*alg, key)))
    }
}
