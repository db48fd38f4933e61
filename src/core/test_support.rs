//! In-memory catalog for engine tests. Successful writes land on the fake
//! server state, failed ones do not, so partial failures leave the same kind
//! of drift a real per-item REST store would.

use crate::domain::model::{ProjectId, ProjectSummary, Rank, RankedProjectId, StudentId};
use crate::domain::model::fixtures::summary;
use crate::domain::ports::ProjectCatalog;
use crate::utils::error::{PortalError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Default)]
struct ServerState {
    ranks: Vec<(ProjectId, Rank)>,
    summaries: HashMap<ProjectId, ProjectSummary>,
    fail_ids: bool,
    fail_details: bool,
    fail_withdraw: bool,
    failing_writes: HashSet<ProjectId>,
    write_delay: Option<Duration>,
    attempts: Vec<(ProjectId, Rank)>,
    withdrawals: Vec<ProjectId>,
    id_fetches: usize,
}

#[derive(Default)]
pub(crate) struct ScriptedCatalog {
    state: Mutex<ServerState>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    id_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedCatalog {
    pub fn with_projects(ids: &[&str]) -> Self {
        let catalog = Self::default();
        {
            let mut state = catalog.state.lock().unwrap();
            for (i, id) in ids.iter().enumerate() {
                state.ranks.push((ProjectId::from(*id), (i + 1) as Rank));
                state.summaries.insert(ProjectId::from(*id), summary(id));
            }
        }
        catalog
    }

    pub fn fail_id_fetch(&self, fail: bool) {
        self.state.lock().unwrap().fail_ids = fail;
    }

    pub fn fail_details_fetch(&self, fail: bool) {
        self.state.lock().unwrap().fail_details = fail;
    }

    pub fn fail_withdraw(&self, fail: bool) {
        self.state.lock().unwrap().fail_withdraw = fail;
    }

    pub fn drop_summary(&self, id: &str) {
        self.state.lock().unwrap().summaries.remove(&ProjectId::from(id));
    }

    pub fn fail_rank_write_for(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert(ProjectId::from(id));
    }

    pub fn clear_write_failures(&self) {
        self.state.lock().unwrap().failing_writes.clear();
    }

    pub fn delay_writes(&self, delay: Duration) {
        self.state.lock().unwrap().write_delay = Some(delay);
    }

    /// Holds every rank write until the returned semaphore gets permits.
    pub fn gate_writes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Holds every id fetch after it has read the server order, until the
    /// returned semaphore gets permits.
    pub fn gate_id_fetches(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.id_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn attempts(&self) -> Vec<(String, Rank)> {
        let mut attempts: Vec<(String, Rank)> = self
            .state
            .lock()
            .unwrap()
            .attempts
            .iter()
            .map(|(p, r)| (p.0.clone(), *r))
            .collect();
        attempts.sort();
        attempts
    }

    pub fn reset_attempts(&self) {
        self.state.lock().unwrap().attempts.clear();
    }

    pub fn withdrawals(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .withdrawals
            .iter()
            .map(|p| p.0.clone())
            .collect()
    }

    pub fn id_fetches(&self) -> usize {
        self.state.lock().unwrap().id_fetches
    }

    /// Server-side ranks in server order.
    pub fn server_ranks(&self) -> Vec<(String, Rank)> {
        let state = self.state.lock().unwrap();
        ordered(&state.ranks)
            .into_iter()
            .map(|(p, r)| (p.0, r))
            .collect()
    }
}

fn ordered(ranks: &[(ProjectId, Rank)]) -> Vec<(ProjectId, Rank)> {
    let mut sorted = ranks.to_vec();
    sorted.sort_by_key(|(_, rank)| *rank);
    sorted
}

#[async_trait]
impl ProjectCatalog for ScriptedCatalog {
    async fn preference_ids(&self, _student_id: &StudentId) -> Result<Vec<RankedProjectId>> {
        let ranks = {
            let mut state = self.state.lock().unwrap();
            state.id_fetches += 1;
            if state.fail_ids {
                return Err(PortalError::UnexpectedStatus {
                    operation: "fetch preference ids".to_string(),
                    status: 503,
                });
            }
            ordered(&state.ranks)
        };

        // 回傳的是讀取當下的順序，等待期間的寫入不會反映出來
        let gate = self.id_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        Ok(ranks
            .into_iter()
            .map(|(project_id, rank)| RankedProjectId { project_id, rank })
            .collect())
    }

    async fn project_details(&self, ids: &[ProjectId]) -> Result<Vec<ProjectSummary>> {
        let state = self.state.lock().unwrap();
        if state.fail_details {
            return Err(PortalError::UnexpectedStatus {
                operation: "lookup project details".to_string(),
                status: 500,
            });
        }
        // 故意反轉順序，呼叫端必須自行依 id 合併
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| state.summaries.get(id).cloned())
            .collect())
    }

    async fn set_rank(
        &self,
        _student_id: &StudentId,
        project_id: &ProjectId,
        rank: Rank,
    ) -> Result<()> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.attempts.push((project_id.clone(), rank));
            state.write_delay
        };

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_writes.contains(project_id) {
            return Err(PortalError::UnexpectedStatus {
                operation: format!("set rank of {}", project_id),
                status: 500,
            });
        }
        if let Some(slot) = state.ranks.iter_mut().find(|(p, _)| p == project_id) {
            slot.1 = rank;
        }
        Ok(())
    }

    async fn withdraw(&self, _student_id: &StudentId, project_id: &ProjectId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.withdrawals.push(project_id.clone());
        if state.fail_withdraw {
            return Err(PortalError::UnexpectedStatus {
                operation: format!("withdraw {}", project_id),
                status: 500,
            });
        }
        state.ranks.retain(|(p, _)| p != project_id);
        Ok(())
    }
}
