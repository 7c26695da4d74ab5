use shared::{
    decision::{Decision, ProtectedItem},
    library::{MediaItem, MediaType},
};
use tracing::{info, warn};

use crate::error::{bounded, LifecycleError, Result};
use crate::traits::{SeriesStatus, ShowTracker};

pub const CONTINUING_REASON: &str = "continuing series in show tracker";

/// Vetoes deletion of shows the tracker still reports as running.
pub struct ProtectionGuard<'a> {
    tracker: Option<&'a dyn ShowTracker>,
    timeout_secs: u64,
}

impl<'a> ProtectionGuard<'a> {
    pub fn new(tracker: Option<&'a dyn ShowTracker>, timeout_secs: u64) -> Self {
        Self {
            tracker,
            timeout_secs,
        }
    }

    /// Whether `item` must be kept. A title the tracker does not know is
    /// unprotected; every other tracker failure is returned.
    pub async fn is_protected(&self, item: &MediaItem) -> Result<bool> {
        let Some(tracker) = self.tracker else {
            return Ok(false);
        };
        if item.media_type() != MediaType::Show {
            return Ok(false);
        }

        let lookup = bounded(
            tracker.id(),
            self.timeout_secs,
            tracker.find_series(&item.title),
        )
        .await;
        let series_id = match lookup {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(
                    "{}",
                    LifecycleError::Match {
                        service: tracker.id(),
                        title: item.title.clone(),
                    }
                );
                return Ok(false);
            }
            Err(e) if !e.is_fatal() => {
                warn!("{}", e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let status = bounded(
            tracker.id(),
            self.timeout_secs,
            tracker.get_status(series_id),
        )
        .await?;
        Ok(status == SeriesStatus::Continuing)
    }

    /// Protect every continuing show among `candidates` and return the
    /// audit list of what was withheld.
    pub async fn apply(
        &self,
        candidates: &mut [(MediaItem, Decision)],
    ) -> Result<Vec<ProtectedItem>> {
        if self.tracker.is_none() {
            if candidates
                .iter()
                .any(|(item, _)| item.media_type() == MediaType::Show)
            {
                info!("No show tracker configured: shows are not protected this run");
            }
            return Ok(Vec::new());
        }

        let mut protected = Vec::new();
        for (item, decision) in candidates.iter_mut() {
            if !self.is_protected(item).await? {
                continue;
            }
            decision.protect(CONTINUING_REASON);
            info!("Protected continuing series '{}'", item.display_name());
            protected.push(ProtectedItem {
                id: item.id.clone(),
                title: item.title.clone(),
                reasons: decision.reasons.clone(),
            });
        }
        Ok(protected)
    }
}
