use crate::domain::model::{ProjectId, ProjectSummary, Rank, RankedProjectId, StudentId};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// 遠端專題目錄。每個方法對應一個 REST 呼叫，彼此之間沒有交易。
#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    /// Applied project ids for a student, in server rank order.
    async fn preference_ids(&self, student_id: &StudentId) -> Result<Vec<RankedProjectId>>;

    /// Unordered batch lookup; the caller joins results back by id.
    async fn project_details(&self, ids: &[ProjectId]) -> Result<Vec<ProjectSummary>>;

    async fn set_rank(&self, student_id: &StudentId, project_id: &ProjectId, rank: Rank)
        -> Result<()>;

    async fn withdraw(&self, student_id: &StudentId, project_id: &ProjectId) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn student_id(&self) -> &str;
    /// reqwest 層級的逾時
    fn http_timeout(&self) -> Option<Duration>;
    /// 單一 rank 寫入的逾時
    fn request_timeout(&self) -> Duration;
    fn headers(&self) -> &HashMap<String, String>;
}
