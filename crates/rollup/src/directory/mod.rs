//! Work-item directory access.
//!
//! The rollup engine only ever talks to the remote tracking system through
//! the `WorkItemDirectory` trait, so the REST client can be swapped for an
//! in-memory double in tests. `DirectoryCatalog` covers the serving-layer
//! lookups that sit outside the core boundary (epic listings, templates,
//! template-based task creation).

use async_trait::async_trait;

use crate::domain::{CreatedWorkItem, ReleaseFilter, TaskTemplate, WorkItemRef};
use crate::error::RollupError;

pub mod memory;
pub mod rest;

// Re-export for convenience
pub use memory::InMemoryDirectory;
pub use rest::RestDirectory;

/// The boundary the rollup core depends on.
///
/// Both lookups return the declared children of one work item as a flat
/// list, already filtered: records in a "Removed" state and records of type
/// "Test Case" never appear, release filtering applies to non-Task types
/// when the filter carries a release, and "Task" items always survive
/// release filtering since task records carry no release attribute.
#[async_trait]
pub trait WorkItemDirectory: Send + Sync {
    /// Direct hierarchy children of `item_id`.
    async fn fetch_children(
        &self,
        item_id: &str,
        filter: &ReleaseFilter,
    ) -> Result<Vec<WorkItemRef>, RollupError>;

    /// Direct hierarchy children plus items reachable via a non-hierarchical
    /// "related" link, each tagged with its relationship kind.
    async fn fetch_children_with_related(
        &self,
        item_id: &str,
        filter: &ReleaseFilter,
    ) -> Result<Vec<WorkItemRef>, RollupError>;
}

/// Directory lookups used by the serving layer, outside the rollup core.
#[async_trait]
pub trait DirectoryCatalog: Send + Sync {
    /// Top-level epics (those without a parent) for a release and area path.
    async fn fetch_epics(
        &self,
        release: &str,
        area_path: &str,
    ) -> Result<Vec<WorkItemRef>, RollupError>;

    /// Task templates defined on the configured team, sorted by name.
    async fn fetch_templates(&self) -> Result<Vec<TaskTemplate>, RollupError>;

    /// Instantiate several templates as tasks under one backlog item.
    async fn create_tasks_from_templates(
        &self,
        parent_id: &str,
        template_ids: &[String],
    ) -> Result<Vec<CreatedWorkItem>, RollupError>;
}
