use crate::domain::ports::ConfigProvider;
use crate::core::synchronizer::DEFAULT_REQUEST_TIMEOUT;
use crate::utils::error::{PortalError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub catalog: CatalogConfig,
    pub student: StudentConfig,
    pub sync: Option<SyncConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentConfig {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: Option<String>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PortalError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PortalError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PORTAL_TOKEN})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PortalError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("catalog.base_url", &self.catalog.base_url)?;
        validation::validate_path_segment("student.id", &self.student.id)?;

        if let Some(ms) = self.sync.as_ref().and_then(|s| s.request_timeout_ms) {
            validation::validate_range("sync.request_timeout_ms", ms, 1, MAX_REQUEST_TIMEOUT_MS)?;
        }
        if let Some(seconds) = self.catalog.timeout_seconds {
            validation::validate_range("catalog.timeout_seconds", seconds, 1, 600)?;
        }

        for (key, value) in &self.catalog.headers {
            if value.contains("${") {
                return Err(PortalError::InvalidConfigValueError {
                    field: format!("catalog.headers.{}", key),
                    value: value.clone(),
                    reason: "Unresolved environment variable".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        &self.catalog.base_url
    }

    fn student_id(&self) -> &str {
        &self.student.id
    }

    fn http_timeout(&self) -> Option<Duration> {
        self.catalog.timeout_seconds.map(Duration::from_secs)
    }

    fn request_timeout(&self) -> Duration {
        self.sync
            .as_ref()
            .and_then(|s| s.request_timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    fn headers(&self) -> &HashMap<String, String> {
        &self.catalog.headers
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
