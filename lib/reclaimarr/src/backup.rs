use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    decision::{Decision, DecisionSetVersion},
    library::MediaItem,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::Result;

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_EXTENSION: &str = "jsonl";

/// One line of a backup log: what an item looked like right before its
/// deletion started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub backed_up_at: DateTime<Utc>,
    pub decision_set_version: DecisionSetVersion,
    pub item: MediaItem,
    pub decision: Decision,
}

/// Directory of append-only JSON-lines logs, one per deletion batch.
#[derive(Debug, Clone)]
pub struct BackupLog {
    dir: PathBuf,
}

impl BackupLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name the log for a new batch. Nothing is written until the first
    /// record is appended.
    pub fn batch(&self, version: DecisionSetVersion, started_at: DateTime<Utc>) -> BackupBatch {
        let name = format!(
            "{BACKUP_PREFIX}{}_{}.{BACKUP_EXTENSION}",
            version.0,
            started_at.format("%Y%m%d_%H%M%S")
        );
        BackupBatch {
            path: self.dir.join(name),
        }
    }

    /// Existing logs, oldest first by modification time, then by name.
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        let mut logs = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_log = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_EXTENSION)
                });
            if is_log {
                let modified = tokio::fs::metadata(&path)
                    .await
                    .and_then(|meta| meta.modified())
                    .ok();
                logs.push((modified, path));
            }
        }
        logs.sort();
        Ok(logs.into_iter().map(|(_, path)| path).collect())
    }

    /// Delete all but the newest `keep` logs. Returns how many were removed.
    pub async fn prune(&self, keep: usize) -> Result<usize> {
        let logs = self.list().await?;
        let excess = logs.len().saturating_sub(keep);
        for path in &logs[..excess] {
            debug!("Removing old backup {}", path.display());
            tokio::fs::remove_file(path).await?;
        }
        if excess > 0 {
            info!("Removed {} old backup logs", excess);
        }
        Ok(excess)
    }
}

#[derive(Debug, Clone)]
pub struct BackupBatch {
    path: PathBuf,
}

impl BackupBatch {
    /// Reopen a batch from its reference.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reference(&self) -> String {
        self.path.display().to_string()
    }

    pub async fn append(&self, record: &BackupRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn read_all(&self) -> Result<Vec<BackupRecord>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}
