pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::TomlConfig;

pub use adapters::HttpProjectCatalog;
pub use core::reorder::{Gesture, ReorderController};
pub use core::rollback::{ReorderOutcome, RollbackGuard};
pub use core::state::{ReorderEvent, SyncPhase};
pub use core::store::PreferenceStore;
pub use core::synchronizer::{RankSynchronizer, SyncPlan};
pub use utils::error::{PortalError, Result};
