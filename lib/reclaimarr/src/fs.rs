use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{LifecycleError, Result};
use crate::traits::Filesystem;

/// [`Filesystem`] backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn delete_path(&self, path: &Path) -> Result<()> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Already gone: {:?}", path);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            return Err(LifecycleError::NotAFile(path.to_path_buf()));
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!("Deleted {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn prune_empty_dirs(&self, start: &Path, root: &Path) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        if !start.starts_with(root) {
            return Ok(removed);
        }

        let mut current = start.to_path_buf();
        while current != root && current.starts_with(root) {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => match current.parent() {
                    Some(parent) => {
                        current = parent.to_path_buf();
                        continue;
                    }
                    None => break,
                },
                Err(e) => return Err(e.into()),
            };
            if entries.next_entry().await?.is_some() {
                break;
            }
            tokio::fs::remove_dir(&current).await?;
            debug!("Removed empty folder {:?}", current);
            removed.push(current.clone());

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(removed)
    }
}
