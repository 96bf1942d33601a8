//! Declarative job catalog data model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_weight() -> f64 {
    1.0
}

/// One declarative work unit. `params` is an opaque payload consumed by the
/// external scraper; this crate never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub params: Value,
}

/// One named group of jobs in the catalog file, scoped to a scraper id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperGroup {
    pub scraper_id: String,
    pub jobs: Vec<Job>,
}

/// Top-level catalog file shape: `{"scraper_configs": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub scraper_configs: Vec<ScraperGroup>,
}

/// Per-job ephemeral bookkeeping, persisted as `{job_id: {...}}` in the job
/// runtime state file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct JobRuntimeState {
    pub last_run_ts: i64,
    pub next_eligible_ts: i64,
}

impl JobRuntimeState {
    /// Absent entries are ready; an entry is ready once its cooldown window
    /// has elapsed.
    pub fn is_ready(&self, now: i64) -> bool {
        now >= self.next_eligible_ts
    }
}
