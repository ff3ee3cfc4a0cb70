//! Signing key types and storage for bearer token issuance.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  insert / fetch   ┌──────────────────┐
//! │  Key cache   │──────────────────►│  SigningKeyStore │
//! │  (authn)     │                   │  memory/postgres │
//! └──────────────┘                   └──────────────────┘
//! ```
//!
//! The store is the sole owner of secret material once a key is persisted.
//! Use [`MemorySigningKeyStore`] for tests and development.

mod signing_key;
mod store;

pub use signing_key::SigningKey;
pub use store::{MemorySigningKeyStore, SigningKeyStore};
