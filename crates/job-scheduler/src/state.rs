//! Job runtime state: per-job cooldown bookkeeping persisted as JSON, plus
//! weighted selection over the ready set.

use std::collections::HashMap;
use std::path::PathBuf;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::models::{Job, JobRuntimeState};

/// Inclusive cooldown range applied after every run, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct CooldownRange {
    pub min_secs: i64,
    pub max_secs: i64,
}

impl Default for CooldownRange {
    fn default() -> Self {
        Self {
            min_secs: 20 * 60,
            max_secs: 30 * 60,
        }
    }
}

/// Owns the `job_id -> {last_run_ts, next_eligible_ts}` JSON file.
pub struct JobStateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    cooldown: CooldownRange,
}

impl JobStateStore {
    pub fn new(path: PathBuf, cooldown: CooldownRange) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
            cooldown,
        }
    }

    async fn load(&self) -> Result<HashMap<String, JobRuntimeState>> {
        common::json_file::load_or_default(&self.path, HashMap::new())
            .await
            .map_err(crate::error::Error::StateFile)
    }

    /// Filter `jobs` down to the ones eligible to run right now. Absent
    /// entries are ready.
    pub async fn ready_jobs(&self, jobs: Vec<Job>, now: i64) -> Result<Vec<Job>> {
        let state = self.load().await?;
        Ok(jobs
            .into_iter()
            .filter(|job| state.get(&job.id).is_none_or(|s| s.is_ready(now)))
            .collect())
    }

    /// Record that `job_id` ran (successfully or not) at `now`, pushing its
    /// next eligible time out by a uniform random draw in `[min, max]`.
    pub async fn mark_run(&self, job_id: &str, now: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load().await?;
        let jitter = rand::rng().random_range(self.cooldown.min_secs..=self.cooldown.max_secs);
        state.insert(
            job_id.to_string(),
            JobRuntimeState {
                last_run_ts: now,
                next_eligible_ts: now + jitter,
            },
        );
        common::json_file::write_atomic(&self.path, &state)
            .await
            .map_err(crate::error::Error::StateFile)?;
        debug!(job_id, next_eligible_in = jitter, "job cooldown recorded");
        Ok(())
    }
}

/// Pick one job with probability proportional to `weight`. Falls back to
/// the first ready item when total weight is zero.
pub fn select_weighted(jobs: &[Job]) -> Option<&Job> {
    if jobs.is_empty() {
        return None;
    }
    let total: f64 = jobs.iter().map(|j| j.weight.max(0.0)).sum();
    if total <= 0.0 {
        return jobs.first();
    }
    let draw = rand::rng().random_range(0.0..total);
    let mut cumulative = 0.0;
    for job in jobs {
        cumulative += job.weight.max(0.0);
        if draw < cumulative {
            return Some(job);
        }
    }
    jobs.last()
}
