//! Conformance test suite for `MemorySigningKeyStore`.
//!
//! Each test function corresponds to a single conformance check, providing
//! fine-grained failure reporting.

#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use tokensmith_storage::{auth::MemorySigningKeyStore, conformance};

// ============================================================================
// Algorithms
// ============================================================================

#[tokio::test]
async fn algorithm_insert_is_idempotent() {
    conformance::algorithm_insert_is_idempotent(&MemorySigningKeyStore::new()).await;
}

#[tokio::test]
async fn algorithm_ids_are_distinct() {
    conformance::algorithm_ids_are_distinct(&MemorySigningKeyStore::new()).await;
}

// ============================================================================
// Keys
// ============================================================================

#[tokio::test]
async fn get_missing_key_returns_none() {
    conformance::get_missing_key_returns_none(&MemorySigningKeyStore::new()).await;
}

#[tokio::test]
async fn key_round_trips() {
    conformance::key_round_trips(&MemorySigningKeyStore::new()).await;
}

#[tokio::test]
async fn get_key_returns_expired_key() {
    conformance::get_key_returns_expired_key(&MemorySigningKeyStore::new()).await;
}

#[tokio::test]
async fn duplicate_key_id_conflicts() {
    conformance::duplicate_key_id_conflicts(&MemorySigningKeyStore::new()).await;
}

#[tokio::test]
async fn unknown_algorithm_not_found() {
    conformance::unknown_algorithm_not_found(&MemorySigningKeyStore::new()).await;
}

// ============================================================================
// Newest valid key
// ============================================================================

#[tokio::test]
async fn newest_valid_key_empty() {
    conformance::newest_valid_key_empty(&MemorySigningKeyStore::new()).await;
}

#[tokio::test]
async fn newest_valid_key_skips_expired() {
    conformance::newest_valid_key_skips_expired(&MemorySigningKeyStore::new()).await;
}

#[tokio::test]
async fn newest_valid_key_expiry_is_exclusive() {
    conformance::newest_valid_key_expiry_is_exclusive(&MemorySigningKeyStore::new()).await;
}

#[tokio::test]
async fn newest_valid_key_prefers_most_recent() {
    conformance::newest_valid_key_prefers_most_recent(&MemorySigningKeyStore::new()).await;
}

// ============================================================================
// Concurrent
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_algorithm_inserts_converge() {
    conformance::concurrent_algorithm_inserts_converge(Arc::new(MemorySigningKeyStore::new()))
        .await;
}
