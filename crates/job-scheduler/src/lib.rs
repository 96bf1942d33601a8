//! Catalog loader, eligibility filter, weighted selection, and per-job/
//! per-worker progress checkpoints.

mod catalog;
mod checkpoints;
mod error;
mod models;
mod queue;
mod state;

pub use catalog::CatalogCache;
pub use checkpoints::JobCheckpointStore;
pub use error::{Error, Result};
pub use models::{Catalog, Job, JobRuntimeState, ScraperGroup};
pub use queue::{JobQueue, QueuedJob};
pub use state::{CooldownRange, JobStateStore, select_weighted};
