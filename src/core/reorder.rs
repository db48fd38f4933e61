use crate::core::rollback::{ReorderOutcome, RollbackGuard};
use crate::core::state::{PhaseTracker, ReorderEvent, SyncPhase};
use crate::core::store::PreferenceStore;
use crate::core::synchronizer::{RankSynchronizer, SyncPlan};
use crate::domain::model::{OrderedPreferenceList, ProjectId, StudentId};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{PortalError, Result};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

/// A user intent against the preference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    MoveUp(ProjectId),
    MoveDown(ProjectId),
    /// 拖放：直接指定目標位置
    MoveTo(ProjectId, usize),
    Withdraw(ProjectId),
}

impl Gesture {
    pub fn project_id(&self) -> &ProjectId {
        match self {
            Gesture::MoveUp(id)
            | Gesture::MoveDown(id)
            | Gesture::MoveTo(id, _)
            | Gesture::Withdraw(id) => id,
        }
    }

    /// Computes the list this gesture produces, or `None` when it changes
    /// nothing. Ranks are left as they were; the list is optimistic.
    pub fn apply_to(&self, list: &OrderedPreferenceList) -> Result<Option<OrderedPreferenceList>> {
        let index = list
            .position_of(self.project_id())
            .ok_or_else(|| PortalError::UnknownProject {
                project_id: self.project_id().to_string(),
            })?;

        let next = match self {
            Gesture::MoveUp(_) if index == 0 => None,
            Gesture::MoveUp(id) => move_to_index(list, id, index - 1),
            Gesture::MoveDown(_) if index + 1 == list.len() => None,
            Gesture::MoveDown(id) => move_to_index(list, id, index + 1),
            Gesture::MoveTo(id, target) => move_to_index(list, id, *target),
            Gesture::Withdraw(_) => {
                let mut entries = list.entries().to_vec();
                entries.remove(index);
                Some(OrderedPreferenceList::new(entries))
            }
        };
        Ok(next)
    }
}

/// Removes `project_id` and re-inserts it at `target_index`, clamped to the
/// list bounds. Returns `None` for unknown ids and for moves that land where
/// they started.
pub fn move_to_index(
    list: &OrderedPreferenceList,
    project_id: &ProjectId,
    target_index: usize,
) -> Option<OrderedPreferenceList> {
    let from = list.position_of(project_id)?;
    let to = target_index.min(list.len().saturating_sub(1));
    if from == to {
        return None;
    }

    let mut entries = list.entries().to_vec();
    let moved = entries.remove(from);
    entries.insert(to, moved);
    Some(OrderedPreferenceList::new(entries))
}

enum Begin {
    Busy,
    Unchanged,
    Started {
        before: OrderedPreferenceList,
        optimistic: OrderedPreferenceList,
        plan: SyncPlan,
    },
}

/// Turns gestures into optimistic list updates and drives each one through
/// synchronization and settlement. Only one operation runs at a time; a
/// gesture arriving while one is in flight is rejected, not queued.
pub struct ReorderController {
    student_id: StudentId,
    store: Arc<PreferenceStore>,
    synchronizer: RankSynchronizer,
    guard: RollbackGuard,
    phase: Mutex<PhaseTracker>,
}

impl ReorderController {
    pub fn new(student_id: StudentId, store: Arc<PreferenceStore>, request_timeout: Duration) -> Self {
        let guard = RollbackGuard::new(Arc::clone(&store), student_id.clone());
        Self {
            student_id,
            store,
            synchronizer: RankSynchronizer::new(request_timeout),
            guard,
            phase: Mutex::new(PhaseTracker::default()),
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C, store: Arc<PreferenceStore>) -> Self {
        Self::new(
            StudentId(config.student_id().to_string()),
            store,
            config.request_timeout(),
        )
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn snapshot(&self) -> OrderedPreferenceList {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReorderEvent> {
        self.guard.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        self.tracker().current()
    }

    pub fn phase_history(&self) -> Vec<SyncPhase> {
        self.tracker().history().to_vec()
    }

    pub fn is_syncing(&self) -> bool {
        self.phase().is_busy()
    }

    /// 初次載入；若已有操作進行中則回傳 `ReorderRejected`
    pub async fn load(&self) -> Result<OrderedPreferenceList> {
        self.reload()
            .await
            .unwrap_or(Err(PortalError::ReorderRejected))
    }

    /// Reloads from the catalog unless an operation is in flight, in which
    /// case `None` is returned and nothing is fetched.
    pub async fn refresh(&self) -> Result<Option<OrderedPreferenceList>> {
        self.reload().await.transpose()
    }

    /// Holds the operation slot for the whole fetch so no gesture can commit
    /// between the server read and the `replace`.
    async fn reload(&self) -> Option<Result<OrderedPreferenceList>> {
        let claimed = self.tracker().try_reload();
        if !claimed {
            tracing::debug!("Reload skipped while {} is in flight", self.phase());
            return None;
        }

        let result = self.store.load(&self.student_id).await;
        self.advance(SyncPhase::Idle);
        Some(result)
    }

    pub async fn move_up(&self, project_id: &ProjectId) -> Result<ReorderOutcome> {
        self.apply(Gesture::MoveUp(project_id.clone())).await
    }

    pub async fn move_down(&self, project_id: &ProjectId) -> Result<ReorderOutcome> {
        self.apply(Gesture::MoveDown(project_id.clone())).await
    }

    pub async fn move_to_index(
        &self,
        project_id: &ProjectId,
        target_index: usize,
    ) -> Result<ReorderOutcome> {
        self.apply(Gesture::MoveTo(project_id.clone(), target_index)).await
    }

    pub async fn withdraw(&self, project_id: &ProjectId) -> Result<ReorderOutcome> {
        self.apply(Gesture::Withdraw(project_id.clone())).await
    }

    /// Runs one gesture through the full operation.
    ///
    /// Only `UnknownProject` is returned as `Err`; remote failures come back
    /// as `ReorderOutcome::RolledBack`.
    pub async fn apply(&self, gesture: Gesture) -> Result<ReorderOutcome> {
        let (before, optimistic, plan) = match self.begin(&gesture)? {
            Begin::Started {
                before,
                optimistic,
                plan,
            } => (before, optimistic, plan),
            Begin::Busy => return Ok(ReorderOutcome::Rejected),
            Begin::Unchanged => return Ok(ReorderOutcome::NoOp),
        };

        self.advance(SyncPhase::Syncing);
        let result = self
            .synchronizer
            .execute(self.store.catalog(), &self.student_id, &plan)
            .await;

        self.advance(if result.is_ok() {
            SyncPhase::Committed
        } else {
            SyncPhase::RolledBack
        });
        let outcome = self
            .guard
            .settle(gesture.project_id(), before, optimistic, result)
            .await;
        self.advance(SyncPhase::Idle);

        Ok(outcome)
    }

    /// Claims the operation slot and publishes the optimistic list. Runs
    /// without awaiting, so the check and the claim cannot interleave with
    /// another gesture.
    fn begin(&self, gesture: &Gesture) -> Result<Begin> {
        let mut tracker = self.tracker();
        if tracker.current().is_busy() {
            tracing::warn!(
                "⏳ Ignoring {:?}: previous reorder still {}",
                gesture,
                tracker.current()
            );
            return Ok(Begin::Busy);
        }

        let before = self.store.snapshot();
        let Some(optimistic) = gesture.apply_to(&before)? else {
            tracing::debug!("{:?} leaves the list unchanged", gesture);
            return Ok(Begin::Unchanged);
        };

        if !tracker.try_begin() {
            return Ok(Begin::Busy);
        }
        let plan = RankSynchronizer::plan(&before, &optimistic);
        self.store.replace(optimistic.clone());
        tracing::debug!(
            "🖐️ {:?} applied optimistically, {} remote writes planned",
            gesture,
            plan.writes.len()
        );
        Ok(Begin::Started {
            before,
            optimistic,
            plan,
        })
    }

    fn advance(&self, next: SyncPhase) {
        // 非法轉換已在 tracker 內記錄
        let _ = self.tracker().advance(next);
    }

    fn tracker(&self) -> std::sync::MutexGuard<'_, PhaseTracker> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
