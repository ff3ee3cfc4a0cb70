//! Conformance test suite for [`SigningKeyStore`] implementations.
//!
//! Each function checks one part of the trait contract against a fresh,
//! empty store. The in-memory store and the Postgres store run the same
//! suite, so the key cache can rely on identical semantics from both.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each conformance function with
//! a fresh store instance:
//!
//! ```no_run
//! use tokensmith_storage::{auth::MemorySigningKeyStore, conformance};
//!
//! #[tokio::test]
//! async fn get_missing_key_returns_none() {
//!     conformance::get_missing_key_returns_none(&MemorySigningKeyStore::new()).await;
//! }
//! ```
//!
//! # Test Categories
//!
//! | Category | Contract aspect |
//! |----------|-----------------|
//! | Algorithms | Idempotent name registration |
//! | Keys | Insert/fetch round trip, uniqueness, foreign key |
//! | Newest valid | Expiry filter and recency ordering |
//! | Concurrent | Parallel registration converges |

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::{
    assert_conflict, assert_not_found,
    auth::{SigningKey, SigningKeyStore},
    types::{AlgorithmId, KeyId},
};

// Databases store timestamps at microsecond precision; whole seconds compare
// equal after a round trip on every backend.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

fn key(algorithm: &str, generated_at: DateTime<Utc>, lifetime: Duration) -> SigningKey {
    SigningKey::builder()
        .id(KeyId::new_random())
        .algorithm(algorithm)
        .secret((0u8..32).collect::<Vec<_>>())
        .generated_at(generated_at)
        .expires_at(generated_at + lifetime)
        .build()
}

async fn insert<S: SigningKeyStore>(store: &S, key: &SigningKey) -> AlgorithmId {
    let alg = store.insert_algorithm(&key.algorithm).await.expect("insert_algorithm");
    store.insert_key(alg, key).await.expect("insert_key");
    alg
}

// ============================================================================
// Algorithms
// ============================================================================

/// Registering the same name twice returns the same id.
pub async fn algorithm_insert_is_idempotent<S: SigningKeyStore>(store: &S) {
    let first = store.insert_algorithm("HS256").await.expect("first insert");
    let second = store.insert_algorithm("HS256").await.expect("second insert");
    assert_eq!(first, second, "same name must map to the same id");
}

/// Distinct names get distinct ids.
pub async fn algorithm_ids_are_distinct<S: SigningKeyStore>(store: &S) {
    let a = store.insert_algorithm("HS256").await.expect("insert HS256");
    let b = store.insert_algorithm("EdDSA").await.expect("insert EdDSA");
    assert_ne!(a, b);
}

// ============================================================================
// Keys
// ============================================================================

/// `get_key` on an unknown id returns `Ok(None)`.
pub async fn get_missing_key_returns_none<S: SigningKeyStore>(store: &S) {
    let result = store.get_key(KeyId::new_random()).await;
    assert!(matches!(result, Ok(None)), "missing key should return None: {result:?}");
}

/// A stored key comes back field for field, algorithm name included.
pub async fn key_round_trips<S: SigningKeyStore>(store: &S) {
    let original = key("HS256", now(), Duration::hours(24));
    insert(store, &original).await;

    let fetched = store.get_key(original.id).await.expect("get_key").expect("key should exist");
    assert!(fetched == original, "round trip changed the key: {fetched:?}");
}

/// Expired keys remain fetchable by id.
pub async fn get_key_returns_expired_key<S: SigningKeyStore>(store: &S) {
    let expired = key("HS256", now() - Duration::hours(48), Duration::hours(24));
    insert(store, &expired).await;

    let fetched = store.get_key(expired.id).await.expect("get_key");
    assert_eq!(fetched.map(|k| k.id), Some(expired.id));
}

/// Inserting the same key id twice is a conflict.
pub async fn duplicate_key_id_conflicts<S: SigningKeyStore>(store: &S) {
    let original = key("HS256", now(), Duration::hours(1));
    let alg = insert(store, &original).await;

    let result = store.insert_key(alg, &original).await;
    assert_conflict!(result);
}

/// A key referencing an unregistered algorithm id is rejected.
pub async fn unknown_algorithm_not_found<S: SigningKeyStore>(store: &S) {
    let orphan = key("HS256", now(), Duration::hours(1));
    let result = store.insert_key(AlgorithmId::from(i64::from(i32::MAX)), &orphan).await;
    assert_not_found!(result);

    let fetched = store.get_key(orphan.id).await.expect("get_key");
    assert!(fetched.is_none(), "rejected key must not be persisted");
}

// ============================================================================
// Newest valid key
// ============================================================================

/// An empty store has no valid key.
pub async fn newest_valid_key_empty<S: SigningKeyStore>(store: &S) {
    let result = store.newest_valid_key(now()).await.expect("newest_valid_key");
    assert!(result.is_none());
}

/// Expired keys are never returned.
pub async fn newest_valid_key_skips_expired<S: SigningKeyStore>(store: &S) {
    let t = now();
    insert(store, &key("HS256", t - Duration::hours(2), Duration::hours(1))).await;

    let result = store.newest_valid_key(t).await.expect("newest_valid_key");
    assert!(result.is_none(), "expired key returned: {result:?}");
}

/// A key expiring exactly at `now` is no longer valid.
pub async fn newest_valid_key_expiry_is_exclusive<S: SigningKeyStore>(store: &S) {
    let t = now();
    let boundary = key("HS256", t - Duration::hours(1), Duration::hours(1));
    insert(store, &boundary).await;

    assert!(store.newest_valid_key(t).await.expect("at expiry").is_none());
    let before = store.newest_valid_key(t - Duration::seconds(1)).await.expect("before expiry");
    assert_eq!(before.map(|k| k.id), Some(boundary.id));
}

/// Among valid keys the most recently generated wins.
pub async fn newest_valid_key_prefers_most_recent<S: SigningKeyStore>(store: &S) {
    let t = now();
    let older = key("HS256", t - Duration::hours(2), Duration::hours(24));
    let newer = key("HS256", t - Duration::hours(1), Duration::hours(24));
    insert(store, &newer).await;
    insert(store, &older).await;

    let result = store.newest_valid_key(t).await.expect("newest_valid_key");
    assert_eq!(result.map(|k| k.id), Some(newer.id));
}

// ============================================================================
// Concurrent
// ============================================================================

/// Parallel registrations of one name converge on a single id.
pub async fn concurrent_algorithm_inserts_converge<S: SigningKeyStore + 'static>(store: Arc<S>) {
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.insert_algorithm("HS256").await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.expect("task panicked").expect("insert_algorithm"));
    }
    ids.dedup();
    assert_eq!(ids.len(), 1, "concurrent inserts produced distinct ids: {ids:?}");
}
