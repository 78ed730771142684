//! Integration Tests against a live PostgreSQL
//!
//! Ignored by default. Run with a reachable database configured through the
//! POSTGRES_* variables:
//!
//! ```text
//! cargo test --test postgres_store_tests -- --ignored
//! ```

use std::time::Duration;

use chrono::Utc;
use durable_cache::persistence::wall_clock_expiry;
use durable_cache::{DatabaseConfig, DurableStore, PgStore};

async fn connect() -> PgStore {
    PgStore::connect(&DatabaseConfig::from_env())
        .await
        .expect("database should be reachable")
}

fn unique_key(prefix: &str) -> String {
    format!("{}:{}", prefix, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[tokio::test]
#[ignore]
async fn test_put_then_get() {
    let store = connect().await;
    let key = unique_key("pg_put");

    assert!(store.put(&key, "v1", wall_clock_expiry(Duration::from_secs(60))).await);
    assert_eq!(store.get(&key).await.as_deref(), Some("v1"));

    assert!(store.put(&key, "v2", wall_clock_expiry(Duration::from_secs(60))).await);
    assert_eq!(store.get(&key).await.as_deref(), Some("v2"));
}

#[tokio::test]
#[ignore]
async fn test_expired_row_hidden_and_swept() {
    let store = connect().await;
    let key = unique_key("pg_expired");

    let past = Utc::now() - chrono::Duration::seconds(5);
    assert!(store.put(&key, "stale", past).await);
    assert_eq!(store.get(&key).await, None);

    assert!(store.cleanup_expired().await >= 1);
    let rows = store.export().await.unwrap();
    assert!(rows.iter().all(|row| row.key != key));
}

#[tokio::test]
#[ignore]
async fn test_export_lists_live_rows_sorted() {
    let store = connect().await;
    let first = unique_key("pg_export_a");
    let second = unique_key("pg_export_b");

    let expiry = wall_clock_expiry(Duration::from_secs(60));
    assert!(store.put(&second, "2", expiry).await);
    assert!(store.put(&first, "1", expiry).await);

    let rows = store.export().await.unwrap();
    let keys: Vec<&str> = rows.iter().map(|row| row.key.as_str()).collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted);
    assert!(keys.contains(&first.as_str()));
    assert!(keys.contains(&second.as_str()));
}
