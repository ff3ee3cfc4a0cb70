//! Conformance test suite for `PostgresSigningKeyStore`.
//!
//! Requires a reachable database; every test is skipped unless
//! `TOKENSMITH_TEST_DATABASE_URL` is set:
//! ```bash
//! TOKENSMITH_TEST_DATABASE_URL=postgres://localhost/tokensmith_test \
//!     cargo test -p tokensmith-storage --features postgres,testutil --test postgres_conformance
//! ```
//!
//! Each test runs in its own freshly created schema.

#![allow(clippy::expect_used, clippy::panic)]

use std::{str::FromStr, sync::Arc};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tokensmith_storage::{conformance, postgres::PostgresSigningKeyStore};

const DATABASE_URL_VAR: &str = "TOKENSMITH_TEST_DATABASE_URL";

const SCHEMA: &[&str] = &[
    "CREATE TABLE jwt_key_algorithms (
        jwt_key_algorithm_id SERIAL PRIMARY KEY,
        algorithm_name       TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE jwt_keys (
        jwt_key_uuid          UUID PRIMARY KEY,
        jwt_key_algorithm_id  INTEGER NOT NULL REFERENCES jwt_key_algorithms,
        key_secret_material   BYTEA NOT NULL,
        generation_timestamp  TIMESTAMPTZ NOT NULL,
        expiration_timestamp  TIMESTAMPTZ NOT NULL
    )",
];

async fn fresh_store() -> Option<PostgresSigningKeyStore> {
    let Ok(url) = std::env::var(DATABASE_URL_VAR) else {
        eprintln!("{DATABASE_URL_VAR} not set; skipping");
        return None;
    };

    let schema = format!("conformance_{}", uuid::Uuid::new_v4().simple());
    let admin = PgPool::connect(&url).await.expect("connect to test database");
    sqlx::query(&format!("CREATE SCHEMA {schema}"))
        .execute(&admin)
        .await
        .expect("create schema");

    let options = PgConnectOptions::from_str(&url)
        .expect("parse database url")
        .options([("search_path", schema.as_str())]);
    let pool =
        PgPoolOptions::new().max_connections(4).connect_with(options).await.expect("connect");
    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await.expect("create tables");
    }

    Some(PostgresSigningKeyStore::from_pool(pool))
}

macro_rules! conformance_test {
    ($name:ident) => {
        #[tokio::test]
        async fn $name() {
            if let Some(store) = fresh_store().await {
                conformance::$name(&store).await;
            }
        }
    };
}

conformance_test!(algorithm_insert_is_idempotent);
conformance_test!(algorithm_ids_are_distinct);
conformance_test!(get_missing_key_returns_none);
conformance_test!(key_round_trips);
conformance_test!(get_key_returns_expired_key);
conformance_test!(duplicate_key_id_conflicts);
conformance_test!(unknown_algorithm_not_found);
conformance_test!(newest_valid_key_empty);
conformance_test!(newest_valid_key_skips_expired);
conformance_test!(newest_valid_key_expiry_is_exclusive);
conformance_test!(newest_valid_key_prefers_most_recent);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_algorithm_inserts_converge() {
    if let Some(store) = fresh_store().await {
        conformance::concurrent_algorithm_inserts_converge(Arc::new(store)).await;
    }
}
