//! Published decision sets on disk.

use std::path::{Path, PathBuf};

use shared::decision::{DecisionSet, DecisionSetVersion};
use tracing::{debug, info, warn};

use crate::error::Result;

const REPORT_PREFIX: &str = "decision_set_";
const REPORT_EXTENSION: &str = "json";
const CONSUMED_EXTENSION: &str = "consumed";

#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn report_path(&self, version: DecisionSetVersion) -> PathBuf {
        self.dir
            .join(format!("{REPORT_PREFIX}{}.{REPORT_EXTENSION}", version.0))
    }

    fn consumed_path(&self, version: DecisionSetVersion) -> PathBuf {
        self.dir
            .join(format!("{REPORT_PREFIX}{}.{CONSUMED_EXTENSION}", version.0))
    }

    pub async fn save(&self, set: &DecisionSet) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.report_path(set.version);
        let json = serde_json::to_vec_pretty(set)?;
        // Readers never see a half-written report.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        info!("Saved decision set {} to {}", set.version, path.display());
        Ok(path)
    }

    pub async fn load(&self, version: DecisionSetVersion) -> Result<DecisionSet> {
        let text = tokio::fs::read_to_string(self.report_path(version)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Versions of every stored report, ascending.
    pub async fn versions(&self) -> Result<Vec<DecisionSetVersion>> {
        let mut versions = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(versions),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(version) = name.to_str().and_then(parse_report_name) {
                versions.push(version);
            }
        }
        versions.sort();
        Ok(versions)
    }

    /// The newest report, skipping any that no longer parse.
    pub async fn load_latest(&self) -> Result<Option<DecisionSet>> {
        for version in self.versions().await?.into_iter().rev() {
            match self.load(version).await {
                Ok(set) => return Ok(Some(set)),
                Err(e) => warn!("Ignoring unreadable decision set {}: {}", version, e),
            }
        }
        Ok(None)
    }

    pub async fn mark_consumed(&self, version: DecisionSetVersion) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(
            self.consumed_path(version),
            chrono::Utc::now().to_rfc3339(),
        )
        .await?;
        debug!("Marked decision set {} consumed", version);
        Ok(())
    }

    pub async fn is_consumed(&self, version: DecisionSetVersion) -> bool {
        tokio::fs::try_exists(self.consumed_path(version))
            .await
            .unwrap_or(false)
    }

    /// Delete all but the newest `keep` reports with their markers.
    pub async fn cleanup(&self, keep: usize) -> Result<usize> {
        let versions = self.versions().await?;
        let excess = versions.len().saturating_sub(keep);
        for &version in &versions[..excess] {
            tokio::fs::remove_file(self.report_path(version)).await?;
            match tokio::fs::remove_file(self.consumed_path(version)).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        if excess > 0 {
            info!("Removed {} old decision sets", excess);
        }
        Ok(excess)
    }
}

fn parse_report_name(name: &str) -> Option<DecisionSetVersion> {
    name.strip_prefix(REPORT_PREFIX)?
        .strip_suffix(&format!(".{REPORT_EXTENSION}"))?
        .parse()
        .ok()
        .map(DecisionSetVersion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::decision::Aggregate;

    fn set(version: u64) -> DecisionSet {
        DecisionSet {
            version: DecisionSetVersion(version),
            created_at: Utc::now(),
            confirmation: format!("token{version}"),
            items: vec![],
            aggregate: Aggregate::default(),
            duplicate_groups: vec![],
            protected: vec![],
        }
    }

    #[test]
    fn report_names() {
        assert_eq!(
            parse_report_name("decision_set_12.json"),
            Some(DecisionSetVersion(12))
        );
        assert_eq!(parse_report_name("decision_set_12.consumed"), None);
        assert_eq!(parse_report_name("decision_set_x.json"), None);
        assert_eq!(parse_report_name("other.json"), None);
    }

    #[tokio::test]
    async fn latest_is_the_highest_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        assert!(store.load_latest().await.unwrap().is_none());

        for version in [2, 10, 3] {
            store.save(&set(version)).await.unwrap();
        }
        let latest = store.load_latest().await.unwrap().unwrap();
        assert_eq!(latest.version, DecisionSetVersion(10));
        assert_eq!(latest.confirmation, "token10");
    }

    #[tokio::test]
    async fn consumed_marker_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        for version in 1..=4 {
            store.save(&set(version)).await.unwrap();
        }
        store.mark_consumed(DecisionSetVersion(1)).await.unwrap();
        assert!(store.is_consumed(DecisionSetVersion(1)).await);
        assert!(!store.is_consumed(DecisionSetVersion(2)).await);

        assert_eq!(store.cleanup(2).await.unwrap(), 2);
        assert_eq!(
            store.versions().await.unwrap(),
            vec![DecisionSetVersion(3), DecisionSetVersion(4)]
        );
        assert!(!store.is_consumed(DecisionSetVersion(1)).await);
    }
}
