//! Relationship-loading strategy selection.
//!
//! A strategy decides which edge types count as "children" at the outermost
//! traversal level. The set is closed: only the two variants below exist,
//! and the rule that the broadened edge set applies at the first level only
//! is enforced once, in the hierarchy loader, not here.

use crate::directory::WorkItemDirectory;
use crate::domain::{ReleaseFilter, WorkItemRef};
use crate::error::RollupError;

/// Name of the hierarchy-only strategy.
pub const HIERARCHY_ONLY: &str = "hierarchy-only";
/// Name of the hierarchy-plus-related strategy.
pub const HIERARCHY_WITH_RELATED: &str = "hierarchy-with-related";

/// Policy governing which directory lookup loads a node's children.
///
/// Stateless and copyable, safe to share across concurrent computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Load only direct hierarchy children
    #[default]
    HierarchyOnly,
    /// Load hierarchy children plus related items, tagged by kind
    HierarchyWithRelated,
}

impl Strategy {
    /// Resolve a strategy from its request-level name. `None` selects the
    /// default hierarchy-only strategy; an unrecognized name fails with an
    /// error naming the offending value.
    pub fn from_name(name: Option<&str>) -> Result<Self, RollupError> {
        match name {
            None => Ok(Self::HierarchyOnly),
            Some(HIERARCHY_ONLY) => Ok(Self::HierarchyOnly),
            Some(HIERARCHY_WITH_RELATED) => Ok(Self::HierarchyWithRelated),
            Some(other) => Err(RollupError::UnknownStrategy(other.to_string())),
        }
    }

    /// The request-level name of this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HierarchyOnly => HIERARCHY_ONLY,
            Self::HierarchyWithRelated => HIERARCHY_WITH_RELATED,
        }
    }

    /// All recognized strategy names.
    pub fn available() -> [&'static str; 2] {
        [HIERARCHY_ONLY, HIERARCHY_WITH_RELATED]
    }

    /// Load the children of one item through the lookup this strategy
    /// selects. No side effects beyond the delegated directory call.
    pub async fn load_children<D>(
        &self,
        directory: &D,
        item_id: &str,
        filter: &ReleaseFilter,
    ) -> Result<Vec<WorkItemRef>, RollupError>
    where
        D: WorkItemDirectory + ?Sized,
    {
        match self {
            Self::HierarchyOnly => directory.fetch_children(item_id, filter).await,
            Self::HierarchyWithRelated => {
                directory.fetch_children_with_related(item_id, filter).await
            }
        }
    }
}
