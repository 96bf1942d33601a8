//! Durable `job_id -> opaque JSON payload` progress store, used by the
//! external scraper to resume pagination across runs.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

pub struct JobCheckpointStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl JobCheckpointStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (job_id TEXT PRIMARY KEY, payload TEXT NOT NULL, updated_at REAL NOT NULL)",
        )
        .execute(&pool)
        .await?;
        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    /// Upsert the opaque payload for `job_id`. The latest write wins.
    pub async fn save_progress(&self, job_id: &str, payload: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let now = common::now_secs() as f64;
        sqlx::query(
            "INSERT INTO checkpoints (job_id, payload, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(job_id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
        )
        .bind(job_id)
        .bind(payload)
        .bind(now)
        .execute(&self.pool)
        .await?;
        debug!(job_id, "job checkpoint saved");
        Ok(())
    }

    /// Most recent payload for `job_id`, or `None` if it has never run.
    pub async fn load_progress(&self, job_id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT payload FROM checkpoints WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("payload")))
    }
}
