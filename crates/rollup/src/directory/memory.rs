//! In-memory directory used by unit and integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{CreatedWorkItem, ReleaseFilter, RelationshipKind, TaskTemplate, WorkItemRef};
use crate::error::RollupError;

use super::{DirectoryCatalog, WorkItemDirectory};

/// Test double holding a parent-id -> children map.
///
/// Items are returned exactly as inserted (the exclusion and release rules
/// live in the REST mapping, which has its own tests); the double only adds
/// the relationship tagging the real client performs. A lookup counter lets
/// tests assert that validation failures happen before any directory access.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    children: HashMap<String, Vec<WorkItemRef>>,
    related: HashMap<String, Vec<WorkItemRef>>,
    epics: Vec<WorkItemRef>,
    templates: Vec<TaskTemplate>,
    lookups: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the hierarchy children of a parent.
    pub fn insert(&mut self, parent_id: impl Into<String>, children: Vec<WorkItemRef>) {
        self.children.insert(parent_id.into(), children);
    }

    /// Register items reachable from a parent via a related link.
    pub fn insert_related(&mut self, parent_id: impl Into<String>, items: Vec<WorkItemRef>) {
        self.related.insert(parent_id.into(), items);
    }

    /// Register the epics returned by `fetch_epics`.
    pub fn insert_epics(&mut self, epics: Vec<WorkItemRef>) {
        self.epics = epics;
    }

    /// Register the templates returned by `fetch_templates`.
    pub fn insert_templates(&mut self, templates: Vec<TaskTemplate>) {
        self.templates = templates;
    }

    /// Number of child lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn hierarchy_children(&self, item_id: &str) -> Vec<WorkItemRef> {
        self.children.get(item_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl WorkItemDirectory for InMemoryDirectory {
    async fn fetch_children(
        &self,
        item_id: &str,
        _filter: &ReleaseFilter,
    ) -> Result<Vec<WorkItemRef>, RollupError> {
        if item_id.is_empty() {
            return Err(RollupError::MissingParameter("Work item ID"));
        }
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.hierarchy_children(item_id))
    }

    async fn fetch_children_with_related(
        &self,
        item_id: &str,
        _filter: &ReleaseFilter,
    ) -> Result<Vec<WorkItemRef>, RollupError> {
        if item_id.is_empty() {
            return Err(RollupError::MissingParameter("Work item ID"));
        }
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let mut result: Vec<WorkItemRef> = self
            .hierarchy_children(item_id)
            .into_iter()
            .map(|mut item| {
                item.relationship = Some(RelationshipKind::Hierarchy);
                item
            })
            .collect();
        result.extend(
            self.related
                .get(item_id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|mut item| {
                    item.relationship = Some(RelationshipKind::Related);
                    item
                }),
        );
        Ok(result)
    }
}

#[async_trait]
impl DirectoryCatalog for InMemoryDirectory {
    async fn fetch_epics(
        &self,
        release: &str,
        area_path: &str,
    ) -> Result<Vec<WorkItemRef>, RollupError> {
        if release.is_empty() {
            return Err(RollupError::MissingParameter("Release value"));
        }
        if area_path.is_empty() {
            return Err(RollupError::MissingParameter("Area path"));
        }
        Ok(self.epics.clone())
    }

    async fn fetch_templates(&self) -> Result<Vec<TaskTemplate>, RollupError> {
        Ok(self.templates.clone())
    }

    async fn create_tasks_from_templates(
        &self,
        parent_id: &str,
        template_ids: &[String],
    ) -> Result<Vec<CreatedWorkItem>, RollupError> {
        if parent_id.is_empty() {
            return Err(RollupError::MissingParameter("Parent work item ID"));
        }
        Ok(template_ids
            .iter()
            .enumerate()
            .map(|(i, template_id)| CreatedWorkItem {
                id: format!("{}-{}", parent_id, i + 1),
                title: Some(format!("Task from template {}", template_id)),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, state: &str) -> WorkItemRef {
        WorkItemRef {
            id: id.to_string(),
            title: format!("Item {}", id),
            state: state.to_string(),
            work_item_type: "Feature".to_string(),
            release: None,
            relationship: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_children_returns_inserted_items() {
        let mut dir = InMemoryDirectory::new();
        dir.insert("1", vec![item("2", "New"), item("3", "Done")]);

        let children = dir
            .fetch_children("1", &ReleaseFilter::unfiltered())
            .await
            .unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.relationship.is_none()));
        assert_eq!(dir.lookups(), 1);
    }

    #[tokio::test]
    async fn test_with_related_tags_relationship_kinds() {
        let mut dir = InMemoryDirectory::new();
        dir.insert("1", vec![item("2", "New")]);
        dir.insert_related("1", vec![item("9", "Done")]);

        let children = dir
            .fetch_children_with_related("1", &ReleaseFilter::unfiltered())
            .await
            .unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].relationship, Some(RelationshipKind::Hierarchy));
        assert_eq!(children[1].relationship, Some(RelationshipKind::Related));
    }

    #[tokio::test]
    async fn test_unknown_parent_has_no_children() {
        let dir = InMemoryDirectory::new();
        let children = dir
            .fetch_children("404", &ReleaseFilter::unfiltered())
            .await
            .unwrap();
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected_without_a_lookup() {
        let dir = InMemoryDirectory::new();
        let err = dir
            .fetch_children("", &ReleaseFilter::unfiltered())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(dir.lookups(), 0);
    }
}
