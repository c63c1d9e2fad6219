//! Core domain types for work-item progress rollups.
//!
//! This module defines the fixed-shape records flowing through the system:
//! work-item references fetched from the remote directory, the
//! computation-scoped hierarchy tree, and the caller-facing progress results.

use serde::{Deserialize, Serialize};

/// How a child record is linked to the item it was loaded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    /// Direct parent/child hierarchy edge
    Hierarchy,
    /// Non-hierarchical cross-link
    Related,
}

/// A work item as returned by the directory client.
///
/// Identifiers are opaque strings issued by the remote tracking system;
/// uniqueness is per remote system and not enforced locally. A reference is
/// immutable once fetched within one computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemRef {
    /// Remote identifier
    pub id: String,
    /// Short summary of the work item
    pub title: String,
    /// State name as reported by the remote system (e.g. "Done", "Active")
    pub state: String,
    /// Type name as reported by the remote system (e.g. "Epic", "Task")
    pub work_item_type: String,
    /// Release tag, when the remote record carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// Set only by the with-related lookup; absent for plain hierarchy loads
    #[serde(rename = "relationshipType", skip_serializing_if = "Option::is_none")]
    pub relationship: Option<RelationshipKind>,
}

/// A work item with its materialized descendant subtree.
///
/// Computation-scoped scratch state: `children` and `depth` exist only while
/// a rollup is being computed and are erased before results reach callers.
/// The type is deliberately not serializable.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    /// The work item itself
    pub item: WorkItemRef,
    /// Fully materialized subtrees, in directory order
    pub children: Vec<HierarchyNode>,
    /// Distance from the queried root; the root's direct children are 1
    pub depth: u32,
}

/// The caller-facing shape: a work item annotated with rolled-up progress.
///
/// Produced once per node and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResult {
    /// The work item the progress belongs to
    #[serde(flatten)]
    pub item: WorkItemRef,
    /// Rollup completion percentage, 0-100
    pub progress: u8,
    /// Whether the item had any loaded children
    pub has_children: bool,
}

/// Release filtering parameters threaded through every directory lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseFilter {
    /// Restrict to items tagged with this release; `None` loads everything
    pub release: Option<String>,
    /// Bypass release matching while keeping the other exclusions
    pub include_all_releases: bool,
}

impl ReleaseFilter {
    /// Filter that loads all releases.
    pub fn unfiltered() -> Self {
        Self::default()
    }

    /// Filter restricted to a single release.
    pub fn for_release(release: impl Into<String>) -> Self {
        Self {
            release: Some(release.into()),
            include_all_releases: false,
        }
    }
}

/// A task template defined on the remote team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    /// Template identifier
    pub id: String,
    /// Template name
    pub name: String,
    /// Work item type the template instantiates
    pub work_item_type_name: String,
    /// Optional template description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Minimal view of a work item created through a write-side operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWorkItem {
    /// Identifier assigned by the remote system
    pub id: String,
    /// Title of the created item, when reported back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}
