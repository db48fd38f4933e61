use crate::domain::model::ProjectId;
use chrono::{DateTime, Utc};
use std::fmt;

/// Phase of the current reorder operation.
///
/// `Idle → OptimisticallyApplied → Syncing → {Committed | RolledBack} → Idle`
///
/// 重新載入也佔用同一個位置：`Idle → Reloading → Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Reloading,
    OptimisticallyApplied,
    Syncing,
    Committed,
    RolledBack,
}

impl SyncPhase {
    pub fn can_transition_to(self, next: SyncPhase) -> bool {
        use SyncPhase::*;
        matches!(
            (self, next),
            (Idle, OptimisticallyApplied)
                | (Idle, Reloading)
                | (Reloading, Idle)
                | (OptimisticallyApplied, Syncing)
                | (Syncing, Committed)
                | (Syncing, RolledBack)
                | (Committed, Idle)
                | (RolledBack, Idle)
        )
    }

    pub fn is_busy(self) -> bool {
        self != SyncPhase::Idle
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Reloading => "reloading",
            SyncPhase::OptimisticallyApplied => "optimistically-applied",
            SyncPhase::Syncing => "syncing",
            SyncPhase::Committed => "committed",
            SyncPhase::RolledBack => "rolled-back",
        };
        f.write_str(name)
    }
}

/// 記錄每次轉換，供測試與除錯使用
#[derive(Debug, Default)]
pub struct PhaseTracker {
    current: SyncPhase,
    history: Vec<SyncPhase>,
}

impl PhaseTracker {
    pub fn current(&self) -> SyncPhase {
        self.current
    }

    /// Claims the tracker for a new operation. Returns false when an
    /// operation is already in flight.
    pub fn try_begin(&mut self) -> bool {
        self.try_claim(SyncPhase::OptimisticallyApplied)
    }

    /// Claims the tracker for a reload from the server.
    pub fn try_reload(&mut self) -> bool {
        self.try_claim(SyncPhase::Reloading)
    }

    fn try_claim(&mut self, first: SyncPhase) -> bool {
        if self.current.is_busy() {
            return false;
        }
        self.history.clear();
        self.advance(first)
    }

    /// Moves to `next` if the transition is legal. An illegal transition is
    /// logged and ignored, leaving the current phase in place.
    pub fn advance(&mut self, next: SyncPhase) -> bool {
        if !self.current.can_transition_to(next) {
            tracing::error!(
                "❌ Illegal sync phase transition {} -> {} ignored",
                self.current,
                next
            );
            return false;
        }
        tracing::debug!("🔁 Sync phase {} -> {}", self.current, next);
        self.current = next;
        self.history.push(next);
        true
    }

    /// Phases visited by the most recent operation.
    pub fn history(&self) -> &[SyncPhase] {
        &self.history
    }
}

/// What the UI hears about a finished operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReorderEvent {
    Committed {
        project_id: ProjectId,
        writes: usize,
        at: DateTime<Utc>,
    },
    RolledBack {
        project_id: ProjectId,
        reason: String,
        at: DateTime<Utc>,
    },
}

impl ReorderEvent {
    pub fn project_id(&self) -> &ProjectId {
        match self {
            ReorderEvent::Committed { project_id, .. }
            | ReorderEvent::RolledBack { project_id, .. } => project_id,
        }
    }

    pub fn is_rollback(&self) -> bool {
        matches!(self, ReorderEvent::RolledBack { .. })
    }
}
