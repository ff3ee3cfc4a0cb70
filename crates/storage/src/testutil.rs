//! Shared test utilities for signing key store testing.
//!
//! This module provides key factories, an instrumented store wrapper that can
//! count, delay, and fail calls, and assertion macros for [`StorageResult`]
//! values. It is feature-gated behind `testutil` to prevent leaking into
//! production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! tokensmith-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use tokensmith_storage::testutil::{InstrumentedStore, make_signing_key};
//! ```

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    auth::{MemorySigningKeyStore, SigningKey, SigningKeyStore},
    error::{StorageError, StorageResult},
    types::{AlgorithmId, KeyId},
};

/// Create an HS256 test key generated at `generated_at` with the given lifetime.
///
/// The secret is 32 bytes of `0xAB`.
#[must_use]
pub fn make_signing_key(generated_at: DateTime<Utc>, lifetime: chrono::Duration) -> SigningKey {
    SigningKey::builder()
        .id(KeyId::new_random())
        .algorithm("HS256")
        .secret(vec![0xAB; 32])
        .generated_at(generated_at)
        .expires_at(generated_at + lifetime)
        .build()
}

/// Factory for injected store failures.
pub type FailureFactory = fn() -> StorageError;

/// Store wrapper that counts calls and supports delay and failure injection.
///
/// Reads (`get_key`, `newest_valid_key`) and writes (`insert_algorithm`,
/// `insert_key`) fail independently. The configured delay applies to every
/// call before it reaches the inner [`MemorySigningKeyStore`].
#[derive(Debug, Default)]
pub struct InstrumentedStore {
    inner: MemorySigningKeyStore,
    insert_algorithm_calls: AtomicUsize,
    insert_key_calls: AtomicUsize,
    get_key_calls: AtomicUsize,
    newest_valid_key_calls: AtomicUsize,
    delay: Mutex<Duration>,
    read_failure: Mutex<Option<FailureFactory>>,
    write_failure: Mutex<Option<FailureFactory>>,
}

impl InstrumentedStore {
    /// Creates a wrapper around a fresh in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a wrapper sharing state with `inner`.
    #[must_use]
    pub fn wrapping(inner: MemorySigningKeyStore) -> Self {
        Self { inner, ..Self::default() }
    }

    /// Returns the wrapped in-memory store.
    #[must_use]
    pub fn inner(&self) -> &MemorySigningKeyStore {
        &self.inner
    }

    /// Sets the delay applied to every call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Makes subsequent reads fail with the produced error, or clears the failure.
    pub fn set_read_failure(&self, factory: Option<FailureFactory>) {
        *self.read_failure.lock() = factory;
    }

    /// Makes subsequent writes fail with the produced error, or clears the failure.
    pub fn set_write_failure(&self, factory: Option<FailureFactory>) {
        *self.write_failure.lock() = factory;
    }

    /// Number of `insert_algorithm` calls observed.
    #[must_use]
    pub fn insert_algorithm_calls(&self) -> usize {
        self.insert_algorithm_calls.load(Ordering::SeqCst)
    }

    /// Number of `insert_key` calls observed.
    #[must_use]
    pub fn insert_key_calls(&self) -> usize {
        self.insert_key_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_key` calls observed.
    #[must_use]
    pub fn get_key_calls(&self) -> usize {
        self.get_key_calls.load(Ordering::SeqCst)
    }

    /// Number of `newest_valid_key` calls observed.
    #[must_use]
    pub fn newest_valid_key_calls(&self) -> usize {
        self.newest_valid_key_calls.load(Ordering::SeqCst)
    }

    /// Resets every call counter to zero.
    pub fn reset_counts(&self) {
        for counter in [
            &self.insert_algorithm_calls,
            &self.insert_key_calls,
            &self.get_key_calls,
            &self.newest_valid_key_calls,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    async fn before_call(
        &self,
        counter: &AtomicUsize,
        failure: &Mutex<Option<FailureFactory>>,
    ) -> StorageResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let factory = *failure.lock();
        match factory {
            Some(factory) => Err(factory()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SigningKeyStore for InstrumentedStore {
    async fn insert_algorithm(&self, name: &str) -> StorageResult<AlgorithmId> {
        self.before_call(&self.insert_algorithm_calls, &self.write_failure).await?;
        self.inner.insert_algorithm(name).await
    }

    async fn insert_key(&self, algorithm_id: AlgorithmId, key: &SigningKey) -> StorageResult<()> {
        self.before_call(&self.insert_key_calls, &self.write_failure).await?;
        self.inner.insert_key(algorithm_id, key).await
    }

    async fn get_key(&self, id: KeyId) -> StorageResult<Option<SigningKey>> {
        self.before_call(&self.get_key_calls, &self.read_failure).await?;
        self.inner.get_key(id).await
    }

    async fn newest_valid_key(&self, now: DateTime<Utc>) -> StorageResult<Option<SigningKey>> {
        self.before_call(&self.newest_valid_key_calls, &self.read_failure).await?;
        self.inner.newest_valid_key(now).await
    }
}

/// Assert that a [`StorageResult`] is a [`StorageError::Conflict`].
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use tokensmith_storage::{assert_conflict, StorageError, StorageResult};
///
/// let result: StorageResult<()> = Err(StorageError::conflict("dup"));
/// assert_conflict!(result);
/// ```
#[macro_export]
macro_rules! assert_conflict {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::Conflict { .. })),
            "expected StorageError::Conflict, got: {:?}",
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] is a [`StorageError::NotFound`].
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::NotFound { .. })),
            "expected StorageError::NotFound, got: {:?}",
            $result,
        );
    };
}

/// Assert that a [`StorageResult`] contains a [`StorageError::Timeout`].
#[macro_export]
macro_rules! assert_timeout {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::Timeout)),
            "expected StorageError::Timeout, got: {:?}",
            $result,
        );
    };
}
