use crate::domain::model::{
    OrderedPreferenceList, Preference, PreferenceEntry, ProjectId, ProjectSummary, StudentId,
};
use crate::domain::ports::ProjectCatalog;
use crate::utils::error::{FetchStage, PortalError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Holds the list the UI renders. `replace` is the only mutator.
pub struct PreferenceStore {
    catalog: Arc<dyn ProjectCatalog>,
    list: RwLock<OrderedPreferenceList>,
    stale: AtomicBool,
}

impl PreferenceStore {
    pub fn new(catalog: Arc<dyn ProjectCatalog>) -> Self {
        Self {
            catalog,
            list: RwLock::new(OrderedPreferenceList::default()),
            stale: AtomicBool::new(false),
        }
    }

    pub fn catalog(&self) -> Arc<dyn ProjectCatalog> {
        Arc::clone(&self.catalog)
    }

    /// 依伺服器順序載入 id，再查詢專題資料並依 id 合併
    ///
    /// On failure the current list is left untouched.
    pub async fn load(&self, student_id: &StudentId) -> Result<OrderedPreferenceList> {
        tracing::debug!("📥 Loading preferences for student {}", student_id);

        let ranked = self
            .catalog
            .preference_ids(student_id)
            .await
            .map_err(|e| as_fetch_error(FetchStage::PreferenceIds, e))?;

        let summaries = if ranked.is_empty() {
            Vec::new()
        } else {
            let ids: Vec<ProjectId> = ranked.iter().map(|r| r.project_id.clone()).collect();
            self.catalog
                .project_details(&ids)
                .await
                .map_err(|e| as_fetch_error(FetchStage::ProjectDetails, e))?
        };

        let mut by_id: HashMap<ProjectId, ProjectSummary> =
            summaries.into_iter().map(|s| (s.id.clone(), s)).collect();

        let mut entries = Vec::with_capacity(ranked.len());
        for item in ranked {
            let project = by_id.remove(&item.project_id).ok_or_else(|| {
                PortalError::fetch(
                    FetchStage::ProjectDetails,
                    format!("no details returned for project {}", item.project_id),
                )
            })?;
            entries.push(PreferenceEntry {
                preference: Preference {
                    student_id: student_id.clone(),
                    project_id: item.project_id,
                    rank: item.rank,
                },
                project,
            });
        }

        let list = OrderedPreferenceList::new(entries);
        if !list.ranks_form_permutation() {
            tracing::warn!(
                "⚠️ Server ranks for student {} are not a clean permutation; next reorder will rewrite them",
                student_id
            );
        }

        self.replace(list.clone());
        self.stale.store(false, Ordering::SeqCst);
        tracing::info!("📋 Loaded {} preferences for student {}", list.len(), student_id);
        Ok(list)
    }

    pub fn snapshot(&self) -> OrderedPreferenceList {
        self.list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, new_list: OrderedPreferenceList) {
        let mut guard = self.list.write().unwrap_or_else(PoisonError::into_inner);
        *guard = new_list;
    }

    /// True when the displayed list could not be confirmed against the server.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }
}

fn as_fetch_error(stage: FetchStage, err: PortalError) -> PortalError {
    match err {
        PortalError::Fetch { .. } => err,
        other => PortalError::fetch(stage, other.to_string()),
    }
}
