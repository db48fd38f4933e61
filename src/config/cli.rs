use crate::config::toml_config::{
    CatalogConfig, MonitoringConfig, StudentConfig, SyncConfig, TomlConfig,
};
use crate::utils::error::{PortalError, Result};
use crate::utils::validation::validate_required_field;
use clap::{Parser, Subcommand};
use std::collections::HashMap;

#[derive(Debug, Clone, Parser)]
#[command(name = "pref-sync")]
#[command(about = "Reorder a student's ranked project preferences")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub student_id: Option<String>,

    /// Per rank-write timeout in milliseconds
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// Extra request header, KEY=VALUE; may be repeated
    #[arg(long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show the current ranked list
    List,
    /// Move a project one place up
    Up { project_id: String },
    /// Move a project one place down
    Down { project_id: String },
    /// Move a project to a 1-based position
    Move { project_id: String, position: usize },
    /// Withdraw an application and renumber the rest
    Withdraw { project_id: String },
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

impl CliConfig {
    /// 合併設定檔與命令列參數，命令列優先
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig {
                catalog: CatalogConfig {
                    base_url: validate_required_field("base_url", &self.base_url)?.clone(),
                    timeout_seconds: None,
                    headers: HashMap::new(),
                },
                student: StudentConfig {
                    id: validate_required_field("student_id", &self.student_id)?.clone(),
                },
                sync: None,
                monitoring: None,
            },
        };

        if let Some(base_url) = &self.base_url {
            config.catalog.base_url = base_url.clone();
        }
        if let Some(student_id) = &self.student_id {
            config.student.id = student_id.clone();
        }
        if let Some(ms) = self.request_timeout_ms {
            config.sync.get_or_insert_with(SyncConfig::default).request_timeout_ms = Some(ms);
        }
        for (key, value) in &self.headers {
            config.catalog.headers.insert(key.clone(), value.clone());
        }
        if self.json_logs {
            config
                .monitoring
                .get_or_insert_with(MonitoringConfig::default)
                .json = Some(true);
        }

        Ok(config)
    }
}

/// 使用者輸入的位置從 1 開始，轉成清單索引
pub fn position_to_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| PortalError::InvalidConfigValueError {
            field: "position".to_string(),
            value: position.to_string(),
            reason: "Positions start at 1".to_string(),
        })
}
