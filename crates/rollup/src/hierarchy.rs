//! Recursive materialization of a work item's descendant tree.
//!
//! Expansion is depth-first with concurrent sibling fetches: all lookups for
//! one node's children are issued together and awaited together, and a node
//! counts as expanded only once every child subtree has resolved. The
//! requested strategy applies at the first level only; every deeper level
//! loads hierarchy children regardless of it.

use futures::future::{try_join_all, BoxFuture};
use tracing::debug;

use crate::directory::WorkItemDirectory;
use crate::domain::{HierarchyNode, ReleaseFilter};
use crate::error::RollupError;
use crate::strategy::Strategy;

/// Recursion guard against unbounded remote hierarchies. Items below this
/// depth come back with no children instead of erroring.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Load the full descendant tree of `root_id`.
///
/// Returns the root's direct children (depth 1), each with a fully
/// materialized `children` subtree. A root with no children yields an empty
/// vector. Any directory failure aborts the whole load.
pub async fn load_complete_hierarchy<D>(
    directory: &D,
    root_id: &str,
    filter: &ReleaseFilter,
    strategy: Strategy,
    max_depth: u32,
) -> Result<Vec<HierarchyNode>, RollupError>
where
    D: WorkItemDirectory + ?Sized,
{
    expand(directory, root_id, filter, strategy, max_depth, 0).await
}

fn expand<'a, D>(
    directory: &'a D,
    item_id: &'a str,
    filter: &'a ReleaseFilter,
    strategy: Strategy,
    max_depth: u32,
    depth: u32,
) -> BoxFuture<'a, Result<Vec<HierarchyNode>, RollupError>>
where
    D: WorkItemDirectory + ?Sized,
{
    Box::pin(async move {
        if depth > max_depth {
            debug!(%item_id, depth, "depth cap reached, truncating");
            return Ok(Vec::new());
        }

        // The broadened edge set applies at the queried root only; every
        // deeper level is hierarchy-only no matter what was requested.
        let children = if depth == 0 {
            strategy.load_children(directory, item_id, filter).await?
        } else {
            directory.fetch_children(item_id, filter).await?
        };

        let subtrees = try_join_all(children.iter().map(|child| {
            expand(directory, &child.id, filter, strategy, max_depth, depth + 1)
        }))
        .await?;

        Ok(children
            .into_iter()
            .zip(subtrees)
            .map(|(item, descendants)| HierarchyNode {
                item,
                children: descendants,
                depth: depth + 1,
            })
            .collect())
    })
}
