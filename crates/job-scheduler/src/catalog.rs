//! Catalog loader: reads the job catalog file, re-reading on a configurable
//! interval or whenever the cache is empty.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::models::{Catalog, Job};

struct Cached {
    catalog: Catalog,
    loaded_at: Instant,
}

/// Holds the most recently loaded catalog and decides when to refresh it.
pub struct CatalogCache {
    path: PathBuf,
    poll_interval: Duration,
    cached: RwLock<Option<Cached>>,
}

impl CatalogCache {
    pub fn new(path: PathBuf, poll_interval: Duration) -> Self {
        Self {
            path,
            poll_interval,
            cached: RwLock::new(None),
        }
    }

    /// Jobs whose `scraper_id` matches `target` (prefix-or-equality, caller
    /// supplies the comparison), refreshing the cache first if it is stale
    /// or empty.
    pub async fn jobs_for<F>(&self, matches: F) -> Result<Vec<Job>>
    where
        F: Fn(&str) -> bool,
    {
        self.refresh_if_stale().await?;
        let guard = self.cached.read().await;
        let catalog = &guard.as_ref().expect("refreshed above").catalog;
        Ok(catalog
            .scraper_configs
            .iter()
            .filter(|group| matches(&group.scraper_id))
            .flat_map(|group| group.jobs.clone())
            .collect())
    }

    async fn refresh_if_stale(&self) -> Result<()> {
        let is_stale = match self.cached.read().await.as_ref() {
            None => true,
            Some(cached) => cached.loaded_at.elapsed() >= self.poll_interval,
        };
        if !is_stale {
            return Ok(());
        }

        let catalog: Catalog = common::json_file::load_or_default(&self.path, Catalog::default())
            .await
            .map_err(crate::error::Error::StateFile)?;
        debug!(path = %self.path.display(), groups = catalog.scraper_configs.len(), "catalog refreshed");
        *self.cached.write().await = Some(Cached {
            catalog,
            loaded_at: Instant::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScraperGroup;
    use serde_json::json;

    async fn write_catalog(path: &std::path::Path) {
        let catalog = Catalog {
            scraper_configs: vec![
                ScraperGroup {
                    scraper_id: "reddit.rust".into(),
                    jobs: vec![Job {
                        id: "job-1".into(),
                        weight: 1.0,
                        params: json!({}),
                    }],
                },
                ScraperGroup {
                    scraper_id: "other.x".into(),
                    jobs: vec![Job {
                        id: "job-2".into(),
                        weight: 1.0,
                        params: json!({}),
                    }],
                },
            ],
        };
        common::json_file::write_atomic(path, &catalog).await.unwrap();
    }

    #[tokio::test]
    async fn filters_by_predicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        write_catalog(&path).await;

        let cache = CatalogCache::new(path, Duration::from_secs(60));
        let jobs = cache.jobs_for(|id| id.starts_with("reddit.")).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "job-1");
    }

    #[tokio::test]
    async fn missing_file_yields_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let cache = CatalogCache::new(path, Duration::from_secs(60));
        let jobs = cache.jobs_for(|_| true).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn does_not_refresh_before_interval_elapses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        write_catalog(&path).await;

        let cache = CatalogCache::new(path.clone(), Duration::from_secs(3600));
        let first = cache.jobs_for(|_| true).await.unwrap();
        assert_eq!(first.len(), 2);

        // Truncate the file; a second call within the poll interval must
        // still see the cached, pre-truncation contents.
        tokio::fs::write(&path, "{}").await.unwrap();
        let second = cache.jobs_for(|_| true).await.unwrap();
        assert_eq!(second.len(), 2);
    }
}
