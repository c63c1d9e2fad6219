//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Progress rollups for hierarchical work items.
#[derive(Debug, Parser)]
#[command(name = "rollup", version, about = "Progress rollups for hierarchical work items")]
pub struct Cli {
    /// Path to the configuration file (default: rollup.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Roll up progress for the direct children of a work item
    Children {
        /// Root work item id
        id: String,
        /// Restrict to items tagged with this release
        #[arg(long)]
        release: Option<String>,
        /// Bypass release matching (removed/test-case exclusions still apply)
        #[arg(long)]
        all_releases: bool,
        /// Relationship strategy: hierarchy-only or hierarchy-with-related
        #[arg(long)]
        strategy: Option<String>,
    },
    /// Summarize an epic's progress from its rolled-up children
    EpicProgress {
        /// Epic work item id
        id: String,
        /// Restrict to items tagged with this release
        #[arg(long)]
        release: Option<String>,
        /// Bypass release matching (removed/test-case exclusions still apply)
        #[arg(long)]
        all_releases: bool,
        /// Relationship strategy: hierarchy-only or hierarchy-with-related
        #[arg(long)]
        strategy: Option<String>,
    },
    /// List top-level epics for a release and area path
    Epics {
        /// Release to list epics for (default: configured default_release)
        #[arg(long)]
        release: Option<String>,
        /// Area path to list epics for (default: configured default_area_path)
        #[arg(long)]
        area_path: Option<String>,
    },
    /// List the team's task templates
    Templates,
    /// Create a task, optionally under a parent work item
    CreateTask {
        /// Task title
        title: String,
        /// Parent work item id
        #[arg(long)]
        parent: Option<String>,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Assignee
        #[arg(long)]
        assigned_to: Option<String>,
    },
    /// Create a product backlog item under a parent feature
    CreatePbi {
        /// Backlog item title
        title: String,
        /// Backlog item description
        #[arg(long)]
        description: String,
        /// Assignee
        #[arg(long)]
        assigned_to: String,
        /// Acceptance criteria
        #[arg(long)]
        acceptance_criteria: String,
        /// Release tag (default: configured default_release)
        #[arg(long)]
        release: Option<String>,
        /// Area path (default: configured default_area_path)
        #[arg(long)]
        area_path: Option<String>,
        /// Iteration path
        #[arg(long)]
        iteration_path: String,
    },
    /// Instantiate task templates under a backlog item
    CreateTasksFromTemplates {
        /// Parent backlog item id
        pbi_id: String,
        /// Template ids to instantiate
        #[arg(required = true)]
        template_ids: Vec<String>,
    },
    /// Open a pull request between two branches
    CreatePr {
        /// Source branch name
        source: String,
        /// Target branch name
        target: String,
        /// Repository id or name
        repository: String,
        /// Pull request title
        title: String,
        /// Pull request description
        #[arg(long)]
        description: Option<String>,
    },
    /// List the project's teams
    Teams,
    /// List the project's git repositories
    Repos,
}
