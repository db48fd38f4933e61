pub mod reorder;
pub mod rollback;
pub mod state;
pub mod store;
pub mod synchronizer;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::domain::model::{OrderedPreferenceList, PreferenceEntry, ProjectId, StudentId};
pub use crate::domain::ports::{ConfigProvider, ProjectCatalog};
pub use crate::utils::error::Result;
