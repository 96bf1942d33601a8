//! Durable, restart-safe token-bucket rate limiter.
//!
//! Token counts live in a single `buckets` table so the limiter survives
//! process restarts: whatever was deducted before a crash is still gone,
//! and refill simply resumes from `updated_at`. A single in-process mutex
//! serializes the refill-then-deduct critical section; SQLite itself also
//! serializes writers, but the app-level lock keeps the read-modify-write
//! atomic across the `.await` boundary between the SELECT and the UPDATE.

use std::time::Duration;

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A conservative default applied when `acquire` is called against a bucket
/// that has never been created via `ensure_bucket`.
const FALLBACK_CAPACITY: f64 = 5.0;
const FALLBACK_REFILL: f64 = 5.0;

/// How often `acquire` polls while waiting for tokens to refill.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Durable token-bucket governor, keyed by bucket name.
pub struct RateLimiter {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    capacity: f64,
    tokens: f64,
    refill_rate: f64,
    updated_at: f64,
}

impl RateLimiter {
    /// Open (or create) the SQLite-backed bucket store at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS buckets (
                bucket TEXT PRIMARY KEY,
                capacity REAL NOT NULL,
                tokens REAL NOT NULL,
                refill_rate REAL NOT NULL,
                updated_at REAL NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!(url = database_url, "rate limiter store ready");
        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    /// Idempotent bucket creation: a pre-existing bucket is left untouched
    /// (capacity/refill are not retuned), an absent one is inserted with
    /// `tokens = capacity`.
    pub async fn ensure_bucket(&self, name: &str, capacity: f64, refill_rate: f64) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidBucket);
        }
        let _guard = self.write_lock.lock().await;
        let now = now_secs_f64();
        sqlx::query(
            "INSERT INTO buckets (bucket, capacity, tokens, refill_rate, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(bucket) DO NOTHING",
        )
        .bind(name)
        .bind(capacity)
        .bind(capacity)
        .bind(refill_rate)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Attempt to withdraw `requested` tokens from `name`, refilling first.
    /// Polls on [`POLL_INTERVAL`] until tokens are available or `timeout`
    /// elapses. `acquire` never waits past `deadline = now + timeout`.
    pub async fn acquire(&self, name: &str, requested: f64, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_deduct(name, requested).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                debug!(bucket = name, "acquire timed out");
                return Ok(false);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    /// One refill-then-deduct attempt under the writer lock.
    async fn try_deduct(&self, name: &str, requested: f64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let now = now_secs_f64();

        let mut bucket = self.load_or_default(name, now).await?;
        let elapsed = (now - bucket.updated_at).max(0.0);
        bucket.tokens = (bucket.tokens + bucket.refill_rate * elapsed).min(bucket.capacity);
        bucket.updated_at = now;

        if bucket.tokens >= requested {
            bucket.tokens -= requested;
            self.persist(name, &bucket).await?;
            Ok(true)
        } else {
            self.persist(name, &bucket).await?;
            Ok(false)
        }
    }

    async fn load_or_default(&self, name: &str, now: f64) -> Result<Bucket> {
        let row = sqlx::query(
            "SELECT capacity, tokens, refill_rate, updated_at FROM buckets WHERE bucket = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(r) => Bucket {
                capacity: r.get::<f64, _>("capacity"),
                tokens: r.get::<f64, _>("tokens"),
                refill_rate: r.get::<f64, _>("refill_rate"),
                updated_at: r.get::<f64, _>("updated_at"),
            },
            None => {
                debug!(bucket = name, "bucket missing, using conservative default");
                Bucket {
                    capacity: FALLBACK_CAPACITY,
                    tokens: FALLBACK_CAPACITY,
                    refill_rate: FALLBACK_REFILL,
                    updated_at: now,
                }
            }
        })
    }

    async fn persist(&self, name: &str, bucket: &Bucket) -> Result<()> {
        sqlx::query(
            "INSERT INTO buckets (bucket, capacity, tokens, refill_rate, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(bucket) DO UPDATE SET \
                capacity = excluded.capacity, \
                tokens = excluded.tokens, \
                refill_rate = excluded.refill_rate, \
                updated_at = excluded.updated_at",
        )
        .bind(name)
        .bind(bucket.capacity)
        .bind(bucket.tokens)
        .bind(bucket.refill_rate)
        .bind(bucket.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn now_secs_f64() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
