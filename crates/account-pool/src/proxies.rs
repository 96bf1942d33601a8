//! Per-process, lazily-loaded proxy rotation.
//!
//! The proxy list used for lease assignment is *not* read from the durable
//! `proxies` table at selection time — per the spec it is loaded lazily
//! from a JSON file, once per process, and rotated round-robin. This means
//! the orchestrator and the health manager each hold their own independent
//! view of the proxy list (consistent with "the in-memory proxy list is
//! per-process").

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::models::Proxy;

/// Per-process proxy rotation plus an in-memory failure counter.
///
/// The counter decays by one on every recorded success and never drives
/// selection — the spec reserves it for a future unhealthy-skipping policy
/// but the current core only rotates round-robin.
pub(crate) struct ProxyRotation {
    path: Option<PathBuf>,
    cache: RwLock<Option<Vec<Proxy>>>,
    next: AtomicUsize,
    fail_counts: RwLock<HashMap<String, u32>>,
}

impl ProxyRotation {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            cache: RwLock::new(None),
            next: AtomicUsize::new(0),
            fail_counts: RwLock::new(HashMap::new()),
        }
    }

    /// Return the next proxy in round-robin order, or `None` if the list is
    /// empty (or no file was configured).
    pub async fn next_proxy(&self) -> Option<Proxy> {
        let list = self.load().await;
        if list.is_empty() {
            return None;
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % list.len();
        Some(list[idx].clone())
    }

    /// Record a scrape/probe outcome attributed to `proxy_id`: increments
    /// the fail counter on failure, decays it by one (floored at zero) on
    /// success. Does not influence rotation.
    pub async fn record_outcome(&self, proxy_id: &str, success: bool) {
        let mut counts = self.fail_counts.write().await;
        let entry = counts.entry(proxy_id.to_string()).or_insert(0);
        if success {
            *entry = entry.saturating_sub(1);
        } else {
            *entry += 1;
        }
    }

    pub async fn fail_count(&self, proxy_id: &str) -> u32 {
        self.fail_counts.read().await.get(proxy_id).copied().unwrap_or(0)
    }

    async fn load(&self) -> Vec<Proxy> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return cached.clone();
        }
        let loaded = match &self.path {
            Some(path) => common::json_file::load_or_default::<Vec<Proxy>>(path, Vec::new())
                .await
                .unwrap_or_default(),
            None => Vec::new(),
        };
        *self.cache.write().await = Some(loaded.clone());
        loaded
    }
}
