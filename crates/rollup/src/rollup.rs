//! Bottom-up progress rollups over the work-item hierarchy.
//!
//! The service materializes the full descendant tree of a root item, then
//! walks it post-order: every child's progress is final before its parent's
//! is computed. Scratch state (`children`, `depth`) never leaves this
//! module; callers receive the root's direct children annotated with
//! `progress` and `has_children`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::directory::WorkItemDirectory;
use crate::domain::{HierarchyNode, ProgressResult, ReleaseFilter};
use crate::error::RollupError;
use crate::hierarchy::{load_complete_hierarchy, DEFAULT_MAX_DEPTH};
use crate::progress::{calculate_item_progress, calculate_progress};
use crate::strategy::Strategy;

/// How an epic summary was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalculationMethod {
    /// The epic had no loaded children
    NoChildren,
    /// Children were restricted to a release
    ReleaseFiltered,
    /// All children counted, no release restriction
    AllChildren,
}

/// Epic-level progress summary: the rolled-up children plus their average.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicProgress {
    /// Average of the top-level children's progress, 0-100
    pub epic_progress: u8,
    /// The rolled-up direct children
    pub children: Vec<ProgressResult>,
    /// How the summary was computed
    pub calculation_method: CalculationMethod,
    /// Number of direct children counted
    pub child_count: usize,
    /// Sum of the direct children's progress values
    pub total_progress: u32,
    /// The release filter that was applied, echoed back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_value: Option<String>,
    /// The relationship strategy that was applied
    pub relationship_strategy: String,
}

impl EpicProgress {
    /// Fold rolled-up children into an epic summary.
    pub fn summarize(
        children: Vec<ProgressResult>,
        filter: &ReleaseFilter,
        strategy: Strategy,
    ) -> Self {
        let calculation_method = if children.is_empty() {
            CalculationMethod::NoChildren
        } else if filter.release.is_some() {
            CalculationMethod::ReleaseFiltered
        } else {
            CalculationMethod::AllChildren
        };
        let total_progress: u32 = children.iter().map(|c| u32::from(c.progress)).sum();
        Self {
            epic_progress: calculate_progress(&children),
            child_count: children.len(),
            total_progress,
            children,
            calculation_method,
            release_value: filter.release.clone(),
            relationship_strategy: strategy.name().to_string(),
        }
    }
}

/// Rollup engine bound to a work-item directory.
///
/// A tree is constructed fresh for every call and discarded after producing
/// results; concurrent calls for the same root are independent and may
/// duplicate directory lookups.
pub struct ProgressService<D> {
    directory: D,
    max_depth: u32,
}

impl<D: WorkItemDirectory> ProgressService<D> {
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the recursion depth cap.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The directory this service computes against.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Roll up progress for the direct children of `root_id`, loading the
    /// hierarchy edges only.
    pub async fn children_with_progress(
        &self,
        root_id: &str,
        filter: &ReleaseFilter,
    ) -> Result<Vec<ProgressResult>, RollupError> {
        self.run(root_id, filter, Strategy::HierarchyOnly).await
    }

    /// Roll up progress using a named relationship strategy. The name is
    /// resolved before anything else, so an unknown strategy fails without
    /// touching the directory.
    pub async fn children_with_progress_using_strategy(
        &self,
        root_id: &str,
        filter: &ReleaseFilter,
        strategy_name: Option<&str>,
    ) -> Result<Vec<ProgressResult>, RollupError> {
        let strategy = Strategy::from_name(strategy_name)?;
        self.run(root_id, filter, strategy).await
    }

    /// Roll up the children of an epic and fold them into a single summary.
    pub async fn epic_progress(
        &self,
        epic_id: &str,
        filter: &ReleaseFilter,
        strategy_name: Option<&str>,
    ) -> Result<EpicProgress, RollupError> {
        let strategy = Strategy::from_name(strategy_name)?;
        let children = self.run(epic_id, filter, strategy).await?;
        Ok(EpicProgress::summarize(children, filter, strategy))
    }

    async fn run(
        &self,
        root_id: &str,
        filter: &ReleaseFilter,
        strategy: Strategy,
    ) -> Result<Vec<ProgressResult>, RollupError> {
        if root_id.trim().is_empty() {
            return Err(RollupError::MissingParameter("Work item ID"));
        }

        debug!(%root_id, strategy = strategy.name(), release = ?filter.release, "computing rollup");
        let tree = load_complete_hierarchy(
            &self.directory,
            root_id,
            filter,
            strategy,
            self.max_depth,
        )
        .await?;

        Ok(tree.into_iter().map(finalize).collect())
    }
}

/// Post-order finalization: children first, then this node's progress over
/// its finalized children. The scratch `children` and `depth` fields are
/// dropped here and replaced by `has_children`.
fn finalize(node: HierarchyNode) -> ProgressResult {
    let HierarchyNode { item, children, .. } = node;
    let has_children = !children.is_empty();
    let finalized: Vec<ProgressResult> = children.into_iter().map(finalize).collect();
    let progress = calculate_item_progress(&item, &finalized);
    ProgressResult {
        item,
        progress,
        has_children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::domain::WorkItemRef;

    fn item(id: &str, state: &str, work_item_type: &str) -> WorkItemRef {
        WorkItemRef {
            id: id.to_string(),
            title: format!("Item {}", id),
            state: state.to_string(),
            work_item_type: work_item_type.to_string(),
            release: None,
            relationship: None,
        }
    }

    /// Root epic E with features F1 (New, childless) and F2 (Active, two
    /// backlog items: one 40% done via tasks, one untouched).
    fn epic_fixture() -> InMemoryDirectory {
        let mut dir = InMemoryDirectory::new();
        dir.insert(
            "E",
            vec![item("F1", "New", "Feature"), item("F2", "Active", "Feature")],
        );
        dir.insert(
            "F2",
            vec![
                item("P1", "Active", "Product Backlog Item"),
                item("P2", "New", "Product Backlog Item"),
            ],
        );
        dir.insert(
            "P1",
            vec![
                item("T1", "Done", "Task"),
                item("T2", "Done", "Task"),
                item("T3", "In Progress", "Task"),
                item("T4", "New", "Task"),
                item("T5", "New", "Task"),
            ],
        );
        dir
    }

    #[tokio::test]
    async fn test_epic_scenario_rolls_up_bottom_up() {
        let service = ProgressService::new(epic_fixture());
        let results = service
            .children_with_progress("E", &ReleaseFilter::unfiltered())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);

        let f1 = &results[0];
        assert_eq!(f1.item.id, "F1");
        assert_eq!(f1.progress, 0);
        assert!(!f1.has_children);

        // F2: P1 = round((100+100+0+0+0)/5) = 40, P2 = 0, so round((40+0)/2) = 20
        let f2 = &results[1];
        assert_eq!(f2.item.id, "F2");
        assert_eq!(f2.progress, 20);
        assert!(f2.has_children);
    }

    #[tokio::test]
    async fn test_results_carry_no_scratch_fields() {
        let service = ProgressService::new(epic_fixture());
        let results = service
            .children_with_progress("E", &ReleaseFilter::unfiltered())
            .await
            .unwrap();

        let json = serde_json::to_value(&results).unwrap();
        for entry in json.as_array().unwrap() {
            assert!(entry.get("children").is_none());
            assert!(entry.get("depth").is_none());
            assert!(entry.get("hasChildren").is_some());
        }
    }

    #[tokio::test]
    async fn test_recomputation_is_idempotent() {
        let service = ProgressService::new(epic_fixture());
        let first = service
            .children_with_progress("E", &ReleaseFilter::unfiltered())
            .await
            .unwrap();
        let second = service
            .children_with_progress("E", &ReleaseFilter::unfiltered())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_root_id_fails_before_any_lookup() {
        let service = ProgressService::new(InMemoryDirectory::new());
        let err = service
            .children_with_progress("", &ReleaseFilter::unfiltered())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Work item ID is required");
        assert_eq!(service.directory().lookups(), 0);
    }

    #[tokio::test]
    async fn test_unknown_strategy_fails_before_any_lookup() {
        let service = ProgressService::new(InMemoryDirectory::new());
        let err = service
            .children_with_progress_using_strategy(
                "E",
                &ReleaseFilter::unfiltered(),
                Some("breadth-first"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("breadth-first"));
        assert_eq!(service.directory().lookups(), 0);
    }

    #[tokio::test]
    async fn test_related_items_join_the_first_level_average() {
        let mut dir = epic_fixture();
        dir.insert_related("E", vec![item("X", "Done", "Feature")]);

        let service = ProgressService::new(dir);
        let results = service
            .children_with_progress_using_strategy(
                "E",
                &ReleaseFilter::unfiltered(),
                Some("hierarchy-with-related"),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[2].item.id, "X");
        assert_eq!(results[2].progress, 100);
    }

    #[tokio::test]
    async fn test_epic_progress_summary_math() {
        let service = ProgressService::new(epic_fixture());
        let summary = service
            .epic_progress("E", &ReleaseFilter::unfiltered(), None)
            .await
            .unwrap();

        // F1 = 0, F2 = 20: round((0+20)/2) = 10
        assert_eq!(summary.epic_progress, 10);
        assert_eq!(summary.child_count, 2);
        assert_eq!(summary.total_progress, 20);
        assert_eq!(summary.calculation_method, CalculationMethod::AllChildren);
        assert_eq!(summary.release_value, None);
        assert_eq!(summary.relationship_strategy, "hierarchy-only");
    }

    #[tokio::test]
    async fn test_epic_progress_without_children() {
        let service = ProgressService::new(InMemoryDirectory::new());
        let summary = service
            .epic_progress("lonely", &ReleaseFilter::unfiltered(), None)
            .await
            .unwrap();

        assert_eq!(summary.epic_progress, 0);
        assert_eq!(summary.child_count, 0);
        assert_eq!(summary.calculation_method, CalculationMethod::NoChildren);
    }

    #[tokio::test]
    async fn test_epic_progress_reports_release_filtering() {
        let mut dir = InMemoryDirectory::new();
        dir.insert("E", vec![item("F1", "Done", "Feature")]);

        let service = ProgressService::new(dir);
        let summary = service
            .epic_progress("E", &ReleaseFilter::for_release("25.1"), None)
            .await
            .unwrap();

        assert_eq!(summary.epic_progress, 100);
        assert_eq!(
            summary.calculation_method,
            CalculationMethod::ReleaseFiltered
        );
        assert_eq!(summary.release_value.as_deref(), Some("25.1"));
    }

    #[test]
    fn test_calculation_method_serializes_kebab_case() {
        let json = serde_json::to_value(CalculationMethod::NoChildren).unwrap();
        assert_eq!(json, "no-children");
    }
}
