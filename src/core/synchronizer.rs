use crate::domain::model::{OrderedPreferenceList, ProjectId, Rank, StudentId};
use crate::domain::ports::ProjectCatalog;
use crate::utils::error::{PortalError, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// How the new order relates to the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeShape {
    Unchanged,
    /// One item moved from `from` to `to`; everything it passed shifted by one.
    Move { from: usize, to: usize },
    /// One item removed at `index`; everything after it shifted down.
    Removal { index: usize },
    /// Anything else. Every position that changed gets rewritten.
    Permutation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteWrite {
    SetRank {
        project_id: ProjectId,
        rank: Rank,
        previous: Rank,
    },
    Withdraw {
        project_id: ProjectId,
    },
}

impl RemoteWrite {
    async fn send(&self, catalog: &dyn ProjectCatalog, student_id: &StudentId) -> Result<()> {
        match self {
            RemoteWrite::SetRank {
                project_id, rank, ..
            } => catalog.set_rank(student_id, project_id, *rank).await,
            RemoteWrite::Withdraw { project_id } => catalog.withdraw(student_id, project_id).await,
        }
    }
}

impl fmt::Display for RemoteWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteWrite::SetRank {
                project_id,
                rank,
                previous,
            } => write!(f, "{} {}→{}", project_id, previous, rank),
            RemoteWrite::Withdraw { project_id } => write!(f, "withdraw {}", project_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub shape: ChangeShape,
    pub writes: Vec<RemoteWrite>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// `(project, new rank)` pairs of the rank writes, in plan order.
    pub fn rank_updates(&self) -> Vec<(ProjectId, Rank)> {
        self.writes
            .iter()
            .filter_map(|w| match w {
                RemoteWrite::SetRank {
                    project_id, rank, ..
                } => Some((project_id.clone(), *rank)),
                RemoteWrite::Withdraw { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub writes: usize,
}

pub struct RankSynchronizer {
    request_timeout: Duration,
}

impl Default for RankSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl RankSynchronizer {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// 計算讓遠端與新順序一致所需的最少寫入
    ///
    /// `after` still carries the ranks the entries had before the change, so
    /// any entry whose recorded rank differs from its new position is also
    /// rewritten. On a clean permutation that adds nothing beyond the moved
    /// range; on drifted server data it repairs the drift.
    pub fn plan(before: &OrderedPreferenceList, after: &OrderedPreferenceList) -> SyncPlan {
        let old = before.project_ids();
        let new = after.project_ids();
        let shape = classify(&old, &new);

        let mut indices: BTreeSet<usize> = match shape {
            ChangeShape::Unchanged => BTreeSet::new(),
            ChangeShape::Move { from, to } => (from.min(to)..=from.max(to)).collect(),
            ChangeShape::Removal { index } => (index..new.len()).collect(),
            ChangeShape::Permutation => (0..new.len())
                .filter(|&i| old.get(i) != Some(&new[i]))
                .collect(),
        };
        indices.extend(
            after
                .entries()
                .iter()
                .enumerate()
                .filter(|(i, e)| e.rank() as usize != i + 1)
                .map(|(i, _)| i),
        );

        let mut writes = Vec::with_capacity(indices.len() + 1);
        if let ChangeShape::Removal { index } = shape {
            writes.push(RemoteWrite::Withdraw {
                project_id: old[index].clone(),
            });
        }
        for i in indices {
            let entry = &after.entries()[i];
            writes.push(RemoteWrite::SetRank {
                project_id: entry.project_id().clone(),
                rank: (i + 1) as Rank,
                previous: entry.rank(),
            });
        }

        SyncPlan { shape, writes }
    }

    /// Fans every write of the plan out at once and waits for all of them.
    ///
    /// Succeeds only if every write succeeded. A write that exceeds the
    /// request timeout counts as failed. Nothing is cancelled once issued.
    pub async fn execute(
        &self,
        catalog: Arc<dyn ProjectCatalog>,
        student_id: &StudentId,
        plan: &SyncPlan,
    ) -> Result<SyncReport> {
        let total = plan.writes.len();
        if total == 0 {
            return Ok(SyncReport { writes: 0 });
        }

        tracing::debug!("📤 Dispatching {} remote writes ({:?})", total, plan.shape);

        let timeout = self.request_timeout;
        let mut set = JoinSet::new();
        for write in plan.writes.iter().cloned() {
            let catalog = Arc::clone(&catalog);
            let student_id = student_id.clone();
            set.spawn(async move {
                let result = match tokio::time::timeout(
                    timeout,
                    write.send(catalog.as_ref(), &student_id),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(PortalError::RequestTimeout {
                        operation: write.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                };
                (write, result)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((write, Ok(()))) => tracing::debug!("✅ {}", write),
                Ok((write, Err(e))) => {
                    tracing::warn!("❌ {} failed: {}", write, e);
                    failures.push(format!("{}: {}", write, e));
                }
                Err(join_error) => {
                    tracing::error!("❌ Remote write task aborted: {}", join_error);
                    failures.push(format!("task aborted: {}", join_error));
                }
            }
        }

        if failures.is_empty() {
            Ok(SyncReport { writes: total })
        } else {
            Err(PortalError::PartialSyncFailure {
                failed: failures.len(),
                total,
                details: failures.join("; "),
            })
        }
    }
}

fn classify(old: &[ProjectId], new: &[ProjectId]) -> ChangeShape {
    if old == new {
        return ChangeShape::Unchanged;
    }

    if new.len() + 1 == old.len() {
        let index = old
            .iter()
            .zip(new)
            .position(|(a, b)| a != b)
            .unwrap_or(new.len());
        if old[..index] == new[..index] && old[index + 1..] == new[index..] {
            return ChangeShape::Removal { index };
        }
        return ChangeShape::Permutation;
    }

    if old.len() != new.len() {
        return ChangeShape::Permutation;
    }

    let diff: Vec<usize> = (0..old.len()).filter(|&i| old[i] != new[i]).collect();
    let (lo, hi) = match (diff.first(), diff.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => return ChangeShape::Unchanged,
    };

    if new[hi] == old[lo] && new[lo..hi] == old[lo + 1..=hi] {
        ChangeShape::Move { from: lo, to: hi }
    } else if new[lo] == old[hi] && new[lo + 1..=hi] == old[lo..hi] {
        ChangeShape::Move { from: hi, to: lo }
    } else {
        ChangeShape::Permutation
    }
}
