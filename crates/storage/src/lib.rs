//! Signing key persistence for tokensmith session tokens.
//!
//! This crate provides the [`SigningKeyStore`](auth::SigningKeyStore) trait and
//! the record types it persists. The token subsystem in `tokensmith-authn`
//! depends only on the trait, so the backing database can be swapped without
//! touching issuance or validation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  tokensmith-authn                           │
//! │     TokenIssuer │ TokenValidator │ SigningKeyCache          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 tokensmith-storage                          │
//! │              SigningKeyStore trait                          │
//! │  (insert_algorithm, insert_key, get_key, newest_valid_key)  │
//! ├───────────────────────┬─────────────────────────────────────┤
//! │ MemorySigningKeyStore │   PostgresSigningKeyStore           │
//! │   (testing)           │   (production, `postgres` feature)  │
//! └───────────────────────┴─────────────────────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`]. Backends map their internal
//! errors onto [`StorageError`] variants; a missing row is `Ok(None)`.
//!
//! # Feature Flags
//!
//! - **`postgres`**: Enables the [`postgres`] module backed by `sqlx`.
//! - **`testutil`**: Enables the `testutil` and `conformance` modules with shared test helpers
//!   (key factories, instrumented store, assertion macros, store contract checks). Enable this in
//!   `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod auth;
/// Conformance checks shared by every store implementation (feature-gated).
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod conformance;
pub mod error;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use error::{BoxError, StorageError, StorageResult};
pub use types::{AlgorithmId, KeyId};
pub use zeroize::Zeroizing;
