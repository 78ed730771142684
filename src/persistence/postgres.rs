//! PostgreSQL durable store.
//!
//! Holds exactly one connection behind an async mutex, so statements run one
//! at a time and concurrent callers queue.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{DurableRow, DurableStore};
use crate::config::DatabaseConfig;
use crate::error::{CacheError, Result};

/// Connection attempts made before startup gives up.
pub const CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_CONNECT_DELAY: Duration = Duration::from_secs(1);

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS cache_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        expiry TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

/// Durable store backed by a single PostgreSQL connection.
pub struct PgStore {
    conn: Mutex<PgConnection>,
}

impl PgStore {
    /// Connects with exponential backoff and makes sure the table exists.
    ///
    /// Waits 1s, 2s, 4s, ... between attempts and fails with
    /// [`CacheError::ConnectionFailed`] after [`CONNECT_ATTEMPTS`] tries.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            user = %config.user,
            "Connecting to database..."
        );

        let options = config.connect_options();
        let mut attempts = 0;

        let mut conn = loop {
            attempts += 1;
            match PgConnection::connect_with(&options).await {
                Ok(conn) => break conn,
                Err(e) if attempts >= CONNECT_ATTEMPTS => {
                    error!("Database connection attempt {} failed: {}", attempts, e);
                    return Err(CacheError::ConnectionFailed {
                        attempts,
                        source: e,
                    });
                }
                Err(e) => {
                    let delay = INITIAL_CONNECT_DELAY * 2u32.pow(attempts - 1);
                    warn!(
                        "Database connection attempt {}/{} failed: {}. Retrying in {:?}",
                        attempts, CONNECT_ATTEMPTS, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };

        sqlx::query(CREATE_TABLE).execute(&mut conn).await?;
        info!("Database connection established");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl DurableStore for PgStore {
    async fn put(&self, key: &str, value: &str, expiry: DateTime<Utc>) -> bool {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expiry)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, expiry = EXCLUDED.expiry
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expiry)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => {
                debug!(key, "Persisted cache entry");
                true
            }
            Err(e) => {
                error!(key, "Database error on put: {}", e);
                false
            }
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query_scalar::<_, String>(
            "SELECT value FROM cache_entries WHERE key = $1 AND expiry > $2",
        )
        .bind(key)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await;

        match result {
            Ok(value) => value,
            Err(e) => {
                error!(key, "Database error on get: {}", e);
                None
            }
        }
    }

    async fn cleanup_expired(&self) -> u64 {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query("DELETE FROM cache_entries WHERE expiry <= $1")
            .bind(Utc::now())
            .execute(&mut *conn)
            .await;

        match result {
            Ok(done) => done.rows_affected(),
            Err(e) => {
                error!("Database cleanup error: {}", e);
                0
            }
        }
    }

    async fn export(&self) -> Result<Vec<DurableRow>> {
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query_as::<_, DurableRow>(
            r#"
            SELECT key, value, expiry, created_at
            FROM cache_entries
            WHERE expiry > $1
            ORDER BY key
            "#,
        )
        .bind(Utc::now())
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }
}
