use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StudentId {
    fn from(value: &str) -> Self {
        StudentId(value.to_string())
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        ProjectId(value.to_string())
    }
}

/// 1-based rank
pub type Rank = u32;

/// 學生對某個專題的申請紀錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub student_id: StudentId,
    pub project_id: ProjectId,
    pub rank: Rank,
}

/// catalog 回傳的 `(projectId, rank)`，依伺服器順序排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProjectId {
    pub project_id: ProjectId,
    pub rank: Rank,
}

/// 專題的唯讀資料，由 catalog 擁有
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub preference: Preference,
    pub project: ProjectSummary,
}

impl PreferenceEntry {
    pub fn project_id(&self) -> &ProjectId {
        &self.preference.project_id
    }

    pub fn rank(&self) -> Rank {
        self.preference.rank
    }
}

/// The list a student sees, in display order.
///
/// A list is *confirmed* when every entry's rank equals its position plus
/// one. Optimistic lists produced by a reorder keep the ranks the entries had
/// before the move until the synchronizer commits them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderedPreferenceList {
    entries: Vec<PreferenceEntry>,
}

impl OrderedPreferenceList {
    pub fn new(entries: Vec<PreferenceEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PreferenceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PreferenceEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.entries.iter().map(|e| e.project_id().clone()).collect()
    }

    pub fn position_of(&self, project_id: &ProjectId) -> Option<usize> {
        self.entries.iter().position(|e| e.project_id() == project_id)
    }

    pub fn get(&self, index: usize) -> Option<&PreferenceEntry> {
        self.entries.get(index)
    }

    pub fn is_confirmed(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, e)| e.rank() as usize == i + 1)
    }

    /// ranks 是否恰好為 {1..=N}，不重複、無空缺
    pub fn ranks_form_permutation(&self) -> bool {
        let n = self.entries.len();
        let mut seen = HashSet::with_capacity(n);
        self.entries.iter().all(|e| {
            let rank = e.rank() as usize;
            rank >= 1 && rank <= n && seen.insert(rank)
        })
    }

    /// Returns the same order with every rank set to position + 1.
    pub fn renumbered(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let mut entry = e.clone();
                entry.preference.rank = (i + 1) as Rank;
                entry
            })
            .collect();
        Self { entries }
    }
}
