//! REST client for the remote work-item tracking service.
//!
//! Speaks the tracker's wire protocol: a work item is fetched with its
//! relations expanded, child identifiers are extracted from relation URLs,
//! and the children's details arrive through a batch lookup. The
//! record-to-domain mapping and the exclusion rules are pure functions so
//! they can be tested without HTTP.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RollupConfig;
use crate::domain::{CreatedWorkItem, ReleaseFilter, RelationshipKind, TaskTemplate, WorkItemRef};
use crate::error::RollupError;

use super::{DirectoryCatalog, WorkItemDirectory};

/// Forward parent-to-child hierarchy link type.
const HIERARCHY_FORWARD: &str = "System.LinkTypes.Hierarchy-Forward";
/// Reverse child-to-parent hierarchy link type.
const HIERARCHY_REVERSE: &str = "System.LinkTypes.Hierarchy-Reverse";
/// Non-hierarchical cross-link type.
const RELATED: &str = "System.LinkTypes.Related";

const STATE_REMOVED: &str = "Removed";
const TYPE_TEST_CASE: &str = "Test Case";
const TYPE_TASK: &str = "Task";

const FIELD_TITLE: &str = "System.Title";
const FIELD_STATE: &str = "System.State";
const FIELD_TYPE: &str = "System.WorkItemType";
const FIELD_AREA_PATH: &str = "System.AreaPath";
const FIELD_ITERATION_PATH: &str = "System.IterationPath";

/// Work-item directory client backed by the remote tracker's REST API.
pub struct RestDirectory {
    http: Client,
    org_url: String,
    project: String,
    team_id: Option<String>,
    api_version: String,
    release_field: String,
    pat: String,
}

impl RestDirectory {
    /// Build a client from resolved configuration.
    ///
    /// Requires `org_url`, `project` and `api_version` to be configured and
    /// the personal access token to be present in `ROLLUP_PAT`.
    pub fn from_config(config: &RollupConfig) -> anyhow::Result<Self> {
        let mut missing = Vec::new();
        if config.org_url.is_none() {
            missing.push("org_url (ROLLUP_ORG_URL)");
        }
        if config.project.is_none() {
            missing.push("project (ROLLUP_PROJECT)");
        }
        if config.api_version.is_none() {
            missing.push("api_version (ROLLUP_API_VERSION)");
        }
        if !missing.is_empty() {
            anyhow::bail!(
                "Missing required configuration: {}. Set the environment variables or provide rollup.toml.",
                missing.join(", ")
            );
        }
        let pat = std::env::var("ROLLUP_PAT")
            .map_err(|_| anyhow::anyhow!("Missing personal access token: set ROLLUP_PAT"))?;

        Ok(Self {
            http: Client::new(),
            org_url: config.org_url.clone().unwrap_or_default(),
            project: config.project.clone().unwrap_or_default(),
            team_id: config.team_id.clone(),
            api_version: config.api_version.clone().unwrap_or_default(),
            release_field: config.release_field(),
            pat,
        })
    }

    fn team_id(&self) -> Result<&str, RollupError> {
        self.team_id
            .as_deref()
            .ok_or(RollupError::MissingParameter("Team id"))
    }

    fn work_item_url(&self, item_id: &str) -> String {
        format!(
            "{}/{}/_apis/wit/workitems/{}?$expand=Relations&api-version={}",
            self.org_url, self.project, item_id, self.api_version
        )
    }

    fn batch_url(&self, ids: &[String]) -> String {
        format!(
            "{}/{}/_apis/wit/workitems?ids={}&$expand=All&api-version={}",
            self.org_url,
            self.project,
            ids.join(","),
            self.api_version
        )
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &'static str,
    ) -> Result<T, RollupError> {
        let response = request
            .basic_auth("", Some(&self.pat))
            .send()
            .await
            .map_err(|source| RollupError::Transport { context, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RollupError::Upstream {
                context,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|source| RollupError::Transport { context, source })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        context: &'static str,
    ) -> Result<T, RollupError> {
        self.send_json(self.http.get(url), context).await
    }

    /// Shared implementation of the two child lookups.
    async fn load_linked(
        &self,
        item_id: &str,
        include_related: bool,
        filter: &ReleaseFilter,
    ) -> Result<Vec<WorkItemRef>, RollupError> {
        if item_id.is_empty() {
            return Err(RollupError::MissingParameter("Work item ID"));
        }

        debug!(%item_id, include_related, "loading linked work items");

        let envelope: WorkItemEnvelope = self
            .get_json(&self.work_item_url(item_id), "Failed to fetch work item")
            .await?;

        let relations: Vec<&Relation> = envelope
            .relations
            .iter()
            .filter(|r| r.rel == HIERARCHY_FORWARD || (include_related && r.rel == RELATED))
            .collect();
        if relations.is_empty() {
            return Ok(Vec::new());
        }

        // The relation only carries a URL; the id is its last path segment.
        let ids: Vec<String> = relations
            .iter()
            .map(|r| linked_id(&r.url).to_string())
            .collect();
        let kinds: HashMap<String, RelationshipKind> = relations
            .iter()
            .map(|r| {
                let kind = if r.rel == RELATED {
                    RelationshipKind::Related
                } else {
                    RelationshipKind::Hierarchy
                };
                (linked_id(&r.url).to_string(), kind)
            })
            .collect();

        let batch: WorkItemBatch = self
            .get_json(&self.batch_url(&ids), "Failed to fetch child details")
            .await?;

        let children = map_children(
            batch.value,
            filter,
            &self.release_field,
            include_related.then_some(&kinds),
        );
        debug!(%item_id, count = children.len(), "loaded linked work items");
        Ok(children)
    }
}

#[async_trait]
impl WorkItemDirectory for RestDirectory {
    async fn fetch_children(
        &self,
        item_id: &str,
        filter: &ReleaseFilter,
    ) -> Result<Vec<WorkItemRef>, RollupError> {
        self.load_linked(item_id, false, filter).await
    }

    async fn fetch_children_with_related(
        &self,
        item_id: &str,
        filter: &ReleaseFilter,
    ) -> Result<Vec<WorkItemRef>, RollupError> {
        self.load_linked(item_id, true, filter).await
    }
}

#[async_trait]
impl DirectoryCatalog for RestDirectory {
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

        let wiql = format!(
            "SELECT [System.Id], [System.Title], [System.State] FROM WorkItems \
             WHERE [System.WorkItemType] = 'Epic' AND [{}] = '{}' AND [System.AreaPath] = '{}' \
             AND [System.State] <> 'Removed' ORDER BY [System.Title]",
            self.release_field, release, area_path
        );
        let url = format!(
            "{}/{}/_apis/wit/wiql?api-version={}",
            self.org_url, self.project, self.api_version
        );
        let result: WiqlResponse = self
            .send_json(
                self.http.post(&url).json(&serde_json::json!({ "query": wiql })),
                "Failed to fetch epics",
            )
            .await?;
        if result.work_items.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = result.work_items.iter().map(|w| w.id.to_string()).collect();
        let batch: WorkItemBatch = self
            .get_json(&self.batch_url(&ids), "Failed to fetch epic details")
            .await?;

        // Only top-level epics: drop any that have a parent link.
        Ok(batch
            .value
            .into_iter()
            .filter(|record| !has_parent(record))
            .map(|record| to_work_item(record, &self.release_field, None))
            .collect())
    }

    async fn fetch_templates(&self) -> Result<Vec<TaskTemplate>, RollupError> {
        let url = format!(
            "{}/{}/{}/_apis/wit/templates?api-version={}",
            self.org_url,
            self.project,
            self.team_id()?,
            self.api_version
        );
        let list: TemplateList = self.get_json(&url, "Failed to fetch templates").await?;
        Ok(task_templates(list.value))
    }

    async fn create_tasks_from_templates(
        &self,
        parent_id: &str,
        template_ids: &[String],
    ) -> Result<Vec<CreatedWorkItem>, RollupError> {
        if parent_id.is_empty() {
            return Err(RollupError::MissingParameter("Parent work item ID"));
        }
        futures::future::try_join_all(
            template_ids
                .iter()
                .map(|template_id| self.create_task_from_template(template_id, parent_id)),
        )
        .await
    }
}

impl RestDirectory {
    /// Create a task, optionally linked under a parent work item.
    pub async fn create_task(
        &self,
        title: &str,
        parent_id: Option<&str>,
        description: Option<&str>,
        assigned_to: Option<&str>,
    ) -> Result<CreatedWorkItem, RollupError> {
        if title.is_empty() {
            return Err(RollupError::MissingParameter("Title"));
        }

        let mut ops = vec![PatchOp::add(format!("/fields/{}", FIELD_TITLE), title)];
        if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
            ops.push(PatchOp::add("/fields/System.Description", description));
        }
        if let Some(assigned_to) = assigned_to {
            ops.push(PatchOp::add("/fields/System.AssignedTo", assigned_to));
        }
        if let Some(parent_id) = parent_id {
            ops.push(self.parent_link_op(parent_id));
        }

        self.post_patch("$Task", &ops, "Failed to create Task").await
    }

    /// Create a Product Backlog Item with its full field set.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_backlog_item(
        &self,
        title: &str,
        description: &str,
        assigned_to: &str,
        acceptance_criteria: &str,
        release: &str,
        area_path: &str,
        iteration_path: &str,
    ) -> Result<CreatedWorkItem, RollupError> {
        for (value, name) in [
            (title, "Title"),
            (description, "Description"),
            (assigned_to, "Assignee"),
            (acceptance_criteria, "Acceptance criteria"),
            (release, "Release value"),
            (area_path, "Area path"),
            (iteration_path, "Iteration path"),
        ] {
            if value.is_empty() {
                return Err(RollupError::MissingParameter(name));
            }
        }

        let ops = vec![
            PatchOp::add(format!("/fields/{}", FIELD_TITLE), title),
            PatchOp::add("/fields/System.Description", description),
            PatchOp::add("/fields/System.AssignedTo", assigned_to),
            PatchOp::add(
                "/fields/Microsoft.VSTS.Common.AcceptanceCriteria",
                acceptance_criteria,
            ),
            PatchOp::add(format!("/fields/{}", self.release_field), release),
            PatchOp::add(format!("/fields/{}", FIELD_AREA_PATH), area_path),
            PatchOp::add(format!("/fields/{}", FIELD_ITERATION_PATH), iteration_path),
        ];

        self.post_patch("$Product Backlog Item", &ops, "Failed to create PBI")
            .await
    }

    /// Instantiate a team template as a task under a parent, copying the
    /// parent's area and iteration paths.
    pub async fn create_task_from_template(
        &self,
        template_id: &str,
        parent_id: &str,
    ) -> Result<CreatedWorkItem, RollupError> {
        if template_id.is_empty() {
            return Err(RollupError::MissingParameter("Template ID"));
        }
        if parent_id.is_empty() {
            return Err(RollupError::MissingParameter("Parent work item ID"));
        }

        let template_url = format!(
            "{}/{}/{}/_apis/wit/templates/{}?api-version={}",
            self.org_url,
            self.project,
            self.team_id()?,
            template_id,
            self.api_version
        );
        let template: TemplateRecord = self
            .get_json(&template_url, "Failed to fetch template")
            .await?;

        let mut ops: Vec<PatchOp> = template
            .fields
            .iter()
            .map(|(key, value)| PatchOp::add(format!("/fields/{}", key), value.clone()))
            .collect();
        ops.push(self.parent_link_op(parent_id));

        let parent: WorkItemDetails = self
            .get_json(&self.work_item_url(parent_id), "Failed to fetch parent")
            .await?;
        for field in [FIELD_AREA_PATH, FIELD_ITERATION_PATH] {
            if let Some(value) = parent.fields.get(field) {
                ops.push(PatchOp::add(format!("/fields/{}", field), value.clone()));
            }
        }

        self.post_patch("$Task", &ops, "Failed to create Task").await
    }

    /// Open a pull request between two branches of a repository.
    pub async fn create_pull_request(
        &self,
        source_branch: &str,
        target_branch: &str,
        repository: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<CreatedPullRequest, RollupError> {
        for (value, name) in [
            (source_branch, "Source branch"),
            (target_branch, "Target branch"),
            (repository, "Repository"),
            (title, "Title"),
        ] {
            if value.is_empty() {
                return Err(RollupError::MissingParameter(name));
            }
        }

        let url = format!(
            "{}/{}/_apis/git/repositories/{}/pullrequests?api-version={}",
            self.org_url, self.project, repository, self.api_version
        );
        let body = serde_json::json!({
            "sourceRefName": format!("refs/heads/{}", source_branch),
            "targetRefName": format!("refs/heads/{}", target_branch),
            "title": title,
            "description": description.unwrap_or(""),
        });
        self.send_json(
            self.http.post(&url).json(&body),
            "Failed to create Pull Request",
        )
        .await
    }

    /// List the teams of the configured project.
    pub async fn fetch_teams(&self) -> Result<Vec<RemoteResource>, RollupError> {
        let url = format!(
            "{}/_apis/projects/{}/teams?api-version={}",
            self.org_url, self.project, self.api_version
        );
        let list: ResourceList = self.get_json(&url, "Failed to fetch teams").await?;
        Ok(list.value)
    }

    /// List the git repositories of the configured project.
    pub async fn fetch_repositories(&self) -> Result<Vec<RemoteResource>, RollupError> {
        let url = format!(
            "{}/{}/_apis/git/repositories?api-version={}",
            self.org_url, self.project, self.api_version
        );
        let list: ResourceList = self.get_json(&url, "Failed to fetch repositories").await?;
        Ok(list.value)
    }

    fn parent_link_op(&self, parent_id: &str) -> PatchOp {
        PatchOp::add(
            "/relations/-",
            serde_json::json!({
                "rel": HIERARCHY_REVERSE,
                "url": format!("{}/_apis/wit/workItems/{}", self.org_url, parent_id),
                "attributes": { "comment": "add parent" },
            }),
        )
    }

    async fn post_patch(
        &self,
        work_item_type: &str,
        ops: &[PatchOp],
        context: &'static str,
    ) -> Result<CreatedWorkItem, RollupError> {
        let url = format!(
            "{}/{}/_apis/wit/workitems/{}?api-version={}",
            self.org_url, self.project, work_item_type, self.api_version
        );
        let request = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json-patch+json")
            .json(ops);
        let created: WorkItemDetails = self.send_json(request, context).await?;
        debug!(id = created.id, %work_item_type, "created work item");
        Ok(CreatedWorkItem {
            id: created.id.to_string(),
            title: created
                .fields
                .get(FIELD_TITLE)
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }
}

/// A created pull request, as reported back by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPullRequest {
    /// Pull request number
    pub pull_request_id: u64,
    /// Pull request title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A team or repository entry from the project listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResource {
    /// Remote identifier
    pub id: String,
    /// Display name
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    value: Vec<RemoteResource>,
}

/// One JSON-patch operation in a work-item create request.
#[derive(Debug, Serialize)]
struct PatchOp {
    op: &'static str,
    path: String,
    from: Option<String>,
    value: serde_json::Value,
}

impl PatchOp {
    fn add(path: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            op: "add",
            path: path.into(),
            from: None,
            value: value.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Relation {
    rel: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct WorkItemEnvelope {
    #[serde(default)]
    relations: Vec<Relation>,
}

#[derive(Debug, Deserialize)]
struct WorkItemDetails {
    id: u64,
    #[serde(default)]
    fields: HashMap<String, serde_json::Value>,
    #[serde(default)]
    relations: Vec<Relation>,
}

#[derive(Debug, Deserialize)]
struct WorkItemBatch {
    value: Vec<WorkItemDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResponse {
    #[serde(default)]
    work_items: Vec<WiqlRef>,
}

#[derive(Debug, Deserialize)]
struct WiqlRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct TemplateList {
    value: Vec<TemplateRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateRecord {
    id: String,
    name: String,
    work_item_type_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, serde_json::Value>,
}

/// Last path segment of a relation URL, which is the linked item's id.
fn linked_id(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or("")
}

fn text_field(fields: &HashMap<String, serde_json::Value>, name: &str) -> String {
    fields
        .get(name)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn has_parent(record: &WorkItemDetails) -> bool {
    record.relations.iter().any(|r| r.rel == HIERARCHY_REVERSE)
}

fn to_work_item(
    record: WorkItemDetails,
    release_field: &str,
    relationship: Option<RelationshipKind>,
) -> WorkItemRef {
    let release = record
        .fields
        .get(release_field)
        .and_then(|v| v.as_str())
        .map(str::to_string);
    WorkItemRef {
        id: record.id.to_string(),
        title: text_field(&record.fields, FIELD_TITLE),
        state: text_field(&record.fields, FIELD_STATE),
        work_item_type: text_field(&record.fields, FIELD_TYPE),
        release,
        relationship,
    }
}

/// Map detail records to child references, applying the exclusion rules.
///
/// Records in a "Removed" state and "Test Case" records are dropped
/// unconditionally. When the filter carries a release and
/// `include_all_releases` is off, non-Task records must match it; Task
/// records always pass since they carry no release attribute. `kinds` is
/// present only for the with-related lookup and tags each surviving record
/// with its relationship kind.
fn map_children(
    records: Vec<WorkItemDetails>,
    filter: &ReleaseFilter,
    release_field: &str,
    kinds: Option<&HashMap<String, RelationshipKind>>,
) -> Vec<WorkItemRef> {
    records
        .into_iter()
        .filter_map(|record| {
            let state = text_field(&record.fields, FIELD_STATE);
            let work_item_type = text_field(&record.fields, FIELD_TYPE);
            if state == STATE_REMOVED || work_item_type == TYPE_TEST_CASE {
                return None;
            }

            if let Some(wanted) = filter.release.as_deref() {
                let release = record.fields.get(release_field).and_then(|v| v.as_str());
                if !filter.include_all_releases
                    && work_item_type != TYPE_TASK
                    && release != Some(wanted)
                {
                    return None;
                }
            }

            let id = record.id.to_string();
            let relationship = kinds.map(|kinds| {
                kinds
                    .get(&id)
                    .copied()
                    .unwrap_or(RelationshipKind::Hierarchy)
            });
            Some(to_work_item(record, release_field, relationship))
        })
        .collect()
}

/// Keep only Task templates, sorted by name.
fn task_templates(records: Vec<TemplateRecord>) -> Vec<TaskTemplate> {
    let mut templates: Vec<TaskTemplate> = records
        .into_iter()
        .filter(|t| t.work_item_type_name == TYPE_TASK)
        .map(|t| TaskTemplate {
            id: t.id,
            name: t.name,
            work_item_type_name: t.work_item_type_name,
            description: t.description,
        })
        .collect();
    templates.sort_by(|a, b| a.name.cmp(&b.name));
    templates
}
