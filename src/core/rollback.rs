use crate::core::state::ReorderEvent;
use crate::core::store::PreferenceStore;
use crate::core::synchronizer::SyncReport;
use crate::domain::model::{OrderedPreferenceList, ProjectId, StudentId};
use crate::utils::error::{PortalError, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 32;

/// Result of one gesture, as seen by the caller.
#[derive(Debug)]
pub enum ReorderOutcome {
    /// 目標位置與目前相同，或已在邊界
    NoOp,
    /// Another operation was still in flight.
    Rejected,
    Committed {
        list: OrderedPreferenceList,
        writes: usize,
    },
    RolledBack {
        list: OrderedPreferenceList,
        error: PortalError,
        /// Set when the recovery reload failed too and the pre-gesture list
        /// was restored instead.
        reload_error: Option<PortalError>,
    },
}

impl ReorderOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ReorderOutcome::Committed { .. })
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, ReorderOutcome::RolledBack { .. })
    }
}

/// Settles a finished synchronization: keeps the optimistic list on success,
/// reloads canonical state on failure.
pub struct RollbackGuard {
    store: Arc<PreferenceStore>,
    student_id: StudentId,
    events: broadcast::Sender<ReorderEvent>,
}

impl RollbackGuard {
    pub fn new(store: Arc<PreferenceStore>, student_id: StudentId) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            student_id,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReorderEvent> {
        self.events.subscribe()
    }

    pub async fn settle(
        &self,
        project_id: &ProjectId,
        before: OrderedPreferenceList,
        optimistic: OrderedPreferenceList,
        result: Result<SyncReport>,
    ) -> ReorderOutcome {
        match result {
            Ok(report) => {
                let confirmed = optimistic.renumbered();
                self.store.replace(confirmed.clone());
                tracing::info!(
                    "✅ Reorder of {} committed ({} remote writes)",
                    project_id,
                    report.writes
                );
                self.notify(ReorderEvent::Committed {
                    project_id: project_id.clone(),
                    writes: report.writes,
                    at: Utc::now(),
                });
                ReorderOutcome::Committed {
                    list: confirmed,
                    writes: report.writes,
                }
            }
            Err(error) => {
                tracing::warn!("↩️ Reorder of {} failed, reverting: {}", project_id, error);

                let (list, reload_error) = match self.store.load(&self.student_id).await {
                    Ok(list) => (list, None),
                    Err(reload_error) => {
                        tracing::error!(
                            "❌ Could not reload canonical order after failed reorder: {}",
                            reload_error
                        );
                        self.store.replace(before.clone());
                        self.store.mark_stale();
                        (before, Some(reload_error))
                    }
                };

                self.notify(ReorderEvent::RolledBack {
                    project_id: project_id.clone(),
                    reason: error.user_friendly_message(),
                    at: Utc::now(),
                });
                ReorderOutcome::RolledBack {
                    list,
                    error,
                    reload_error,
                }
            }
        }
    }

    fn notify(&self, event: ReorderEvent) {
        // 沒有訂閱者時 send 會失敗，可以忽略
        if self.events.send(event).is_err() {
            tracing::debug!("No listeners for reorder events");
        }
    }
}
