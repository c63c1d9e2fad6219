//! Work-item progress rollup engine.
//!
//! Computes rollup completion percentages for hierarchical work-item trees
//! (Epic -> Feature -> Product Backlog Item -> Task) fetched from a remote
//! tracking service, with optional release filtering and optional inclusion
//! of "related" links at the first level.
//!
//! # Modules
//!
//! - [`domain`] - Fixed-shape records (work items, hierarchy nodes, results)
//! - [`directory`] - Directory client trait, REST client, in-memory double
//! - [`strategy`] - Relationship-loading strategy selection
//! - [`hierarchy`] - Recursive tree materialization with concurrent fan-out
//! - [`progress`] - The pure per-node progress rule
//! - [`rollup`] - Bottom-up driver and epic summaries
//! - [`config`] - Configuration file and environment loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod directory;
pub mod domain;
pub mod error;
pub mod hierarchy;
pub mod progress;
pub mod rollup;
pub mod strategy;

// Re-export commonly used types
pub use config::RollupConfig;
pub use directory::{DirectoryCatalog, InMemoryDirectory, RestDirectory, WorkItemDirectory};
pub use domain::{
    CreatedWorkItem, HierarchyNode, ProgressResult, ReleaseFilter, RelationshipKind, TaskTemplate,
    WorkItemRef,
};
pub use error::RollupError;
pub use hierarchy::{load_complete_hierarchy, DEFAULT_MAX_DEPTH};
pub use progress::{calculate_item_progress, calculate_progress, state_progress};
pub use rollup::{CalculationMethod, EpicProgress, ProgressService};
pub use strategy::Strategy;
