use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Failed to fetch {stage}: {message}")]
    Fetch { stage: FetchStage, message: String },

    #[error("Rank synchronization failed: {failed} of {total} writes rejected ({details})")]
    PartialSyncFailure {
        failed: usize,
        total: usize,
        details: String,
    },

    #[error("{operation} timed out after {timeout_ms}ms")]
    RequestTimeout { operation: String, timeout_ms: u64 },

    #[error("{operation} returned unexpected status {status}")]
    UnexpectedStatus { operation: String, status: u16 },

    #[error("Project {project_id} is not in the preference list")]
    UnknownProject { project_id: String },

    #[error("A reorder or reload is already in flight")]
    ReorderRejected,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },
}

/// 載入資料時失敗的階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    PreferenceIds,
    ProjectDetails,
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStage::PreferenceIds => write!(f, "preference ids"),
            FetchStage::ProjectDetails => write!(f, "project details"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Synchronization,
    Input,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PortalError {
    pub fn fetch(stage: FetchStage, message: impl Into<String>) -> Self {
        PortalError::Fetch {
            stage,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PortalError::Fetch { .. }
            | PortalError::RequestTimeout { .. }
            | PortalError::UnexpectedStatus { .. }
            | PortalError::HttpError(_) => ErrorCategory::Network,
            PortalError::PartialSyncFailure { .. } | PortalError::ReorderRejected => {
                ErrorCategory::Synchronization
            }
            PortalError::UnknownProject { .. } => ErrorCategory::Input,
            PortalError::ConfigError { .. }
            | PortalError::ConfigValidationError { .. }
            | PortalError::InvalidConfigValueError { .. }
            | PortalError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PortalError::IoError(_) | PortalError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PortalError::ReorderRejected | PortalError::UnknownProject { .. } => {
                ErrorSeverity::Low
            }
            PortalError::PartialSyncFailure { .. }
            | PortalError::RequestTimeout { .. }
            | PortalError::UnexpectedStatus { .. }
            | PortalError::HttpError(_) => ErrorSeverity::Medium,
            PortalError::Fetch { .. }
            | PortalError::ConfigError { .. }
            | PortalError::ConfigValidationError { .. }
            | PortalError::InvalidConfigValueError { .. }
            | PortalError::MissingConfigError { .. } => ErrorSeverity::High,
            PortalError::IoError(_) | PortalError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// 寫入失敗是否可以重試
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Synchronization
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PortalError::Fetch { .. } => "Check the catalog is reachable and reload the list",
            PortalError::PartialSyncFailure { .. } => {
                "The list was reverted to the server order; try the move again"
            }
            PortalError::RequestTimeout { .. } => {
                "Increase sync.request_timeout_ms or check network latency"
            }
            PortalError::UnexpectedStatus { .. } | PortalError::HttpError(_) => {
                "Verify the catalog base URL and the authorization headers"
            }
            PortalError::UnknownProject { .. } => "Run `list` to see the applied project ids",
            PortalError::ReorderRejected => "Wait for the previous reorder to finish",
            PortalError::ConfigError { .. }
            | PortalError::ConfigValidationError { .. }
            | PortalError::InvalidConfigValueError { .. }
            | PortalError::MissingConfigError { .. } => {
                "Fix the configuration file or command line flags"
            }
            PortalError::IoError(_) => "Check file paths and permissions",
            PortalError::SerializationError(_) => "The catalog returned malformed JSON",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PortalError::Fetch { .. } => "Could not load your project preferences.".to_string(),
            PortalError::PartialSyncFailure { .. }
            | PortalError::RequestTimeout { .. } => {
                "Reorder failed and was reverted to the last saved order.".to_string()
            }
            PortalError::UnknownProject { project_id } => {
                format!("You have not applied to project {}.", project_id)
            }
            PortalError::ReorderRejected => {
                "Another reorder or reload is still in progress.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
