use crate::domain::model::{ProjectId, ProjectSummary, Rank, RankedProjectId, StudentId};
use crate::domain::ports::{ConfigProvider, ProjectCatalog};
use crate::utils::error::{PortalError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Serialize)]
struct LookupBody<'a> {
    ids: &'a [ProjectId],
}

#[derive(Serialize)]
struct RankBody {
    rank: Rank,
}

/// REST 版的專題目錄
#[derive(Debug, Clone)]
pub struct HttpProjectCatalog {
    client: Client,
    base_url: String,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl HttpProjectCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        let mut catalog = Self::new(config.base_url());
        catalog.headers = config.headers().clone();
        catalog.timeout = config.http_timeout();
        catalog
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 以路徑片段組出網址，每個片段各自做百分比編碼
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let invalid = |reason: String| PortalError::InvalidConfigValueError {
            field: "base_url".to_string(),
            value: self.base_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn preferences_url(&self, student_id: &StudentId) -> Result<Url> {
        self.endpoint(&["students", student_id.0.as_str(), "preferences"])
    }

    fn preference_url(&self, student_id: &StudentId, project_id: &ProjectId) -> Result<Url> {
        self.endpoint(&[
            "students",
            student_id.0.as_str(),
            "preferences",
            project_id.0.as_str(),
        ])
    }

    /// 加上自定義標頭與逾時
    fn prepare(&self, mut request: RequestBuilder) -> RequestBuilder {
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = self.prepare(request).send().await?;
        tracing::debug!("📡 {} → {}", operation, response.status());

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(PortalError::UnexpectedStatus {
                operation: operation.to_string(),
                status: response.status().as_u16(),
            })
        }
    }
}

#[async_trait]
impl ProjectCatalog for HttpProjectCatalog {
    async fn preference_ids(&self, student_id: &StudentId) -> Result<Vec<RankedProjectId>> {
        let url = self.preferences_url(student_id)?;
        let response = self
            .send("fetch preference ids", self.client.get(url))
            .await?;
        Ok(response.json().await?)
    }

    async fn project_details(&self, ids: &[ProjectId]) -> Result<Vec<ProjectSummary>> {
        let url = self.endpoint(&["projects", "lookup"])?;
        let response = self
            .send(
                "lookup project details",
                self.client.post(url).json(&LookupBody { ids }),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn set_rank(
        &self,
        student_id: &StudentId,
        project_id: &ProjectId,
        rank: Rank,
    ) -> Result<()> {
        let url = self.preference_url(student_id, project_id)?;
        let operation = format!("set rank of {} to {}", project_id, rank);
        self.send(&operation, self.client.patch(url).json(&RankBody { rank }))
            .await?;
        Ok(())
    }

    async fn withdraw(&self, student_id: &StudentId, project_id: &ProjectId) -> Result<()> {
        let url = self.preference_url(student_id, project_id)?;
        let operation = format!("withdraw {}", project_id);
        self.send(&operation, self.client.delete(url)).await?;
        Ok(())
    }
}
