//! Optional weighted job queue with aging, for producers that push work
//! rather than have workers pull from the catalog.

use std::collections::HashMap;
use std::path::PathBuf;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::models::Job;

/// A queued job plus the bookkeeping needed for aging and retry backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job: Job,
    pub enqueued_at: i64,
    #[serde(default)]
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QueueFile {
    queue: Vec<QueuedJob>,
    inflight: HashMap<String, QueuedJob>,
}

/// Durable `{queue, inflight}` job queue, written atomically after every
/// mutation.
pub struct JobQueue {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JobQueue {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<QueueFile> {
        common::json_file::load_or_default(&self.path, QueueFile::default())
            .await
            .map_err(crate::error::Error::StateFile)
    }

    async fn save(&self, file: &QueueFile) -> Result<()> {
        common::json_file::write_atomic(&self.path, file)
            .await
            .map_err(crate::error::Error::StateFile)
    }

    pub async fn enqueue(&self, job: Job, now: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        file.queue.push(QueuedJob {
            job,
            enqueued_at: now,
            attempts: 0,
        });
        self.save(&file).await
    }

    /// Pop one item with probability proportional to `weight * age_minutes`,
    /// moving it into `inflight`.
    pub async fn dequeue(&self, now: i64) -> Result<Option<QueuedJob>> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        if file.queue.is_empty() {
            return Ok(None);
        }

        let ages: Vec<f64> = file
            .queue
            .iter()
            .map(|q| {
                let age_minutes = ((now - q.enqueued_at) as f64 / 60.0).max(1.0);
                (q.job.weight.max(0.0) * age_minutes).max(0.0)
            })
            .collect();
        let total: f64 = ages.iter().sum();

        let index = if total <= 0.0 {
            0
        } else {
            let draw = rand::rng().random_range(0.0..total);
            let mut cumulative = 0.0;
            let mut chosen = ages.len() - 1;
            for (i, weight) in ages.iter().enumerate() {
                cumulative += weight;
                if draw < cumulative {
                    chosen = i;
                    break;
                }
            }
            chosen
        };

        let picked = file.queue.remove(index);
        file.inflight.insert(picked.job.id.clone(), picked.clone());
        self.save(&file).await?;
        debug!(job_id = picked.job.id, "job dequeued");
        Ok(Some(picked))
    }

    /// Remove a previously dequeued job from `inflight` entirely.
    pub async fn ack(&self, job_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        file.inflight.remove(job_id);
        self.save(&file).await
    }

    /// Return an inflight job to the queue (if `requeue`), bumping its
    /// attempt count and applying `backoff_secs` to its re-enqueue time.
    pub async fn nack(&self, job_id: &str, requeue: bool, backoff_secs: i64, now: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        if let Some(mut item) = file.inflight.remove(job_id) {
            if requeue {
                item.attempts += 1;
                item.enqueued_at = now + backoff_secs;
                file.queue.push(item);
            }
        }
        self.save(&file).await
    }

    /// `(queue length, inflight count)`.
    pub async fn size(&self) -> Result<(usize, usize)> {
        let file = self.load().await?;
        Ok((file.queue.len(), file.inflight.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(id: &str) -> Job {
        Job {
            id: id.into(),
            weight: 1.0,
            params: json!({}),
        }
    }

    #[tokio::test]
    async fn enqueue_dequeue_ack_drains_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let queue = JobQueue::new(dir.path().join("jobs.json"));

        queue.enqueue(job("j"), 0).await.unwrap();
        assert_eq!(queue.size().await.unwrap(), (1, 0));

        let picked = queue.dequeue(60).await.unwrap().unwrap();
        assert_eq!(picked.job.id, "j");
        assert_eq!(queue.size().await.unwrap(), (0, 1));

        queue.ack("j").await.unwrap();
        assert_eq!(queue.size().await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn nack_with_requeue_bumps_attempts_and_enqueued_at() {
        let dir = tempfile::tempdir().unwrap();
        let queue = JobQueue::new(dir.path().join("jobs.json"));

        queue.enqueue(job("j"), 0).await.unwrap();
        queue.dequeue(60).await.unwrap();
        queue.nack("j", true, 30, 100).await.unwrap();

        assert_eq!(queue.size().await.unwrap(), (1, 0));
        let requeued = queue.load().await.unwrap().queue.into_iter().next().unwrap();
        assert_eq!(requeued.attempts, 1);
        assert!(requeued.enqueued_at > 100);
    }

    #[tokio::test]
    async fn nack_without_requeue_drops_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let queue = JobQueue::new(dir.path().join("jobs.json"));

        queue.enqueue(job("j"), 0).await.unwrap();
        queue.dequeue(60).await.unwrap();
        queue.nack("j", false, 30, 100).await.unwrap();

        assert_eq!(queue.size().await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn dequeue_on_empty_queue_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let queue = JobQueue::new(dir.path().join("jobs.json"));
        assert!(queue.dequeue(0).await.unwrap().is_none());
    }
}
