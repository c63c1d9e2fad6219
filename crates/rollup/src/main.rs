//! Work-item progress rollup CLI.
//!
//! Thin dispatcher over the rollup engine and the directory client's
//! write-side operations. All commands print their result as JSON.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use rollup::cli::{Cli, Commands};
use rollup::config::RollupConfig;
use rollup::directory::{DirectoryCatalog, RestDirectory};
use rollup::domain::ReleaseFilter;
use rollup::rollup::ProgressService;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn filter_for(release: Option<String>, include_all_releases: bool) -> ReleaseFilter {
    ReleaseFilter {
        release: release.filter(|r| !r.is_empty()),
        include_all_releases,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = RollupConfig::load(cli.config.as_deref())?;
    let directory = RestDirectory::from_config(&config)?;
    let service = ProgressService::new(directory).with_max_depth(config.max_depth());

    match cli.command {
        Commands::Children {
            id,
            release,
            all_releases,
            strategy,
        } => {
            let name = strategy.unwrap_or_else(|| config.default_strategy());
            let results = service
                .children_with_progress_using_strategy(
                    &id,
                    &filter_for(release, all_releases),
                    Some(&name),
                )
                .await?;
            print_json(&results)
        }
        Commands::EpicProgress {
            id,
            release,
            all_releases,
            strategy,
        } => {
            let name = strategy.unwrap_or_else(|| config.default_strategy());
            let summary = service
                .epic_progress(&id, &filter_for(release, all_releases), Some(&name))
                .await?;
            print_json(&summary)
        }
        Commands::Epics { release, area_path } => {
            let release = release
                .or_else(|| config.default_release.clone())
                .unwrap_or_default();
            let area_path = area_path
                .or_else(|| config.default_area_path.clone())
                .unwrap_or_default();
            let epics = service.directory().fetch_epics(&release, &area_path).await?;
            print_json(&epics)
        }
        Commands::Templates => {
            let templates = service.directory().fetch_templates().await?;
            print_json(&templates)
        }
        Commands::CreateTask {
            title,
            parent,
            description,
            assigned_to,
        } => {
            let created = service
                .directory()
                .create_task(
                    &title,
                    parent.as_deref(),
                    description.as_deref(),
                    assigned_to.as_deref(),
                )
                .await?;
            print_json(&created)
        }
        Commands::CreatePbi {
            title,
            description,
            assigned_to,
            acceptance_criteria,
            release,
            area_path,
            iteration_path,
        } => {
            let release = release
                .or_else(|| config.default_release.clone())
                .unwrap_or_default();
            let area_path = area_path
                .or_else(|| config.default_area_path.clone())
                .unwrap_or_default();
            let created = service
                .directory()
                .create_backlog_item(
                    &title,
                    &description,
                    &assigned_to,
                    &acceptance_criteria,
                    &release,
                    &area_path,
                    &iteration_path,
                )
                .await?;
            print_json(&created)
        }
        Commands::CreateTasksFromTemplates {
            pbi_id,
            template_ids,
        } => {
            let created = service
                .directory()
                .create_tasks_from_templates(&pbi_id, &template_ids)
                .await?;
            print_json(&created)
        }
        Commands::CreatePr {
            source,
            target,
            repository,
            title,
            description,
        } => {
            let created = service
                .directory()
                .create_pull_request(&source, &target, &repository, &title, description.as_deref())
                .await?;
            print_json(&created)
        }
        Commands::Teams => {
            let teams = service.directory().fetch_teams().await?;
            print_json(&teams)
        }
        Commands::Repos => {
            let repos = service.directory().fetch_repositories().await?;
            print_json(&repos)
        }
    }
}
