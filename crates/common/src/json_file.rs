//! Atomic read/write helpers for the human-readable JSON/append files that
//! sit alongside the SQLite stores (job catalog, job runtime state, proxy
//! list, job queue). All writes go through a temp file + rename so a crash
//! mid-write never leaves a half-written file behind.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

use crate::{Error, Result};

/// Load `T` from `path`, or return `default` if the file does not exist yet.
pub async fn load_or_default<T>(path: &Path, default: T) -> Result<T>
where
    T: DeserializeOwned,
{
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            serde_json::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Serialize `value` and write it to `path` atomically (temp file in the
/// same directory, then rename over the target).
pub async fn write_atomic<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Config(format!("serializing {}: {e}", path.display())))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("state"),
        std::process::id()
    ));

    tokio::fs::write(&tmp_path, json.as_bytes()).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    debug!(path = %path.display(), "wrote json file atomically");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Default)]
    struct Doc {
        n: u32,
        s: String,
    }

    #[tokio::test]
    async fn load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let doc: Doc = load_or_default(&path, Doc::default()).await.unwrap();
        assert_eq!(doc, Doc::default());
    }

    #[tokio::test]
    async fn roundtrip_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let doc = Doc {
            n: 7,
            s: "hello".into(),
        };
        write_atomic(&path, &doc).await.unwrap();
        let loaded: Doc = load_or_default(&path, Doc::default()).await.unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn write_atomic_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        write_atomic(&path, &Doc::default()).await.unwrap();
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut count = 0;
        while let Some(e) = entries.next_entry().await.unwrap() {
            assert_eq!(e.file_name(), "state.json");
            count += 1;
        }
        assert_eq!(count, 1);
    }
}
