use api::{DeletionPlan, Selection};
use colored::*;
use reclaimarr::{AnalysisOutcome, LifecycleEngine};
use serde::Serialize;
use shared::{
    decision::{DecisionRow, DecisionSet},
    deletion::{DeletionResult, ItemStatus, StepOutcome},
    library::ItemId,
    system::SystemHealth,
};
use thiserror::Error;

use crate::prompt::prompt_confirm;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] api::ApiError),

    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode output: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// How command output is written.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

pub async fn analyze(engine: &LifecycleEngine, out: Output) -> Result<()> {
    match api::run_analysis(engine).await? {
        AnalysisOutcome::Skipped { running } => {
            println!(
                "{}",
                format!("Analysis skipped: {running} already in progress").yellow()
            );
        }
        AnalysisOutcome::Completed(set) if out.json => out.json(set.as_ref())?,
        AnalysisOutcome::Completed(set) => print_set(&set),
    }
    Ok(())
}

pub async fn show(engine: &LifecycleEngine, out: Output) -> Result<()> {
    let set = api::latest_decision_set(engine).await?;
    if out.json {
        return out.json(set.as_ref());
    }
    print_set(&set);
    if engine.is_consumed(set.version).await {
        println!("{}", "This decision set was already executed.".yellow());
    }
    Ok(())
}

pub async fn execute(
    engine: &LifecycleEngine,
    ids: Vec<String>,
    yes: bool,
    out: Output,
) -> Result<()> {
    let selection = if ids.is_empty() {
        Selection::AutoRecommended
    } else {
        Selection::Items(ids.into_iter().map(ItemId::new).collect())
    };
    let plan = api::plan_deletion(engine, &selection).await?;
    if plan.is_empty() {
        println!("Nothing selected for deletion.");
        return Ok(());
    }

    if !yes && !confirm(&plan)? {
        println!("Aborted, nothing was deleted.");
        return Ok(());
    }

    let result = api::execute_deletion(engine, &plan.request).await?;
    if out.json {
        return out.json(&result);
    }
    print_result(&result);
    Ok(())
}

pub async fn stats(engine: &LifecycleEngine, out: Output) -> Result<()> {
    let stats = api::get_stats(engine).await?;
    if out.json {
        return out.json(&stats);
    }
    println!("Reports on disk:     {}", stats.total_reports);
    match stats.last_run {
        Some(at) => println!(
            "Last analysis:       {}",
            at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("Last analysis:       never"),
    }
    println!("Items flagged:       {}", stats.total_items_flagged);
    println!("Reclaimable:         {:.1} GB", stats.total_space_flagged_gb);
    Ok(())
}

pub async fn health(engine: &LifecycleEngine, out: Output) -> Result<bool> {
    let health = api::get_system_health(engine).await;
    if out.json {
        out.json(&health)?;
    } else {
        for (id, name) in engine.services().list() {
            println!("{:<8} {}", id, name.dimmed());
        }
        print_health(&health);
    }
    Ok(health.media_server_online)
}

pub async fn cleanup(engine: &LifecycleEngine, keep: usize, out: Output) -> Result<()> {
    let summary = api::cleanup_reports(engine, keep).await?;
    if out.json {
        return out.json(&summary);
    }
    println!(
        "Removed {} old decision sets and {} backup logs.",
        summary.reports, summary.backups
    );
    Ok(())
}

fn confirm(plan: &DeletionPlan) -> std::io::Result<bool> {
    println!("{}", "The following items will be deleted:".bold());
    for row in &plan.rows {
        print_row(row);
    }
    println!(
        "\n{} items, {:.1} GB. Files are removed from disk and cannot be restored.",
        plan.aggregate.count, plan.aggregate.total_size_gb
    );
    prompt_confirm("Proceed?", Some(false))
}

fn print_set(set: &DecisionSet) {
    println!(
        "{} {}  created {}  token {}",
        "Decision set".bold(),
        set.version.to_string().bold(),
        set.created_at.format("%Y-%m-%d %H:%M"),
        set.confirmation
    );
    for row in set.rows() {
        print_row(&row);
    }
    println!(
        "\n{} items ({} movies, {} shows), {:.1} GB reclaimable",
        set.aggregate.count,
        set.aggregate.movie_count,
        set.aggregate.show_count,
        set.aggregate.total_size_gb
    );
    if !set.protected.is_empty() {
        println!("{}", "Protected:".green());
        for item in &set.protected {
            println!("  {} {}  {}", item.id, item.title, item.reasons.join("; ").dimmed());
        }
    }
    if !set.duplicate_groups.is_empty() {
        println!("{} duplicate groups resolved", set.duplicate_groups.len());
    }
}

fn print_row(row: &DecisionRow) {
    let marker = if row.auto_recommended {
        "auto".green()
    } else {
        "review".yellow()
    };
    let year = row.year.map(|y| format!(" ({y})")).unwrap_or_default();
    println!(
        "  [{:>2}] {:<6} {:>8}  {}{}  {:.1} GB  {}",
        row.priority,
        marker,
        row.id.as_str(),
        row.title,
        year,
        row.size_gb,
        row.reasons.join("; ").dimmed()
    );
}

fn print_result(result: &DeletionResult) {
    for item in &result.per_item {
        let status = match item.status {
            ItemStatus::Success => item.status.to_string().green(),
            ItemStatus::Partial => item.status.to_string().yellow(),
            ItemStatus::Failed => item.status.to_string().red(),
        };
        println!("  {:<8} {} {}", status, item.id, item.title);
        for report in &item.steps {
            match &report.outcome {
                StepOutcome::Done => {}
                StepOutcome::Skipped(why) => {
                    println!("           {} skipped: {}", report.step, why.dimmed())
                }
                StepOutcome::Failed(why) => {
                    println!("           {} failed: {}", report.step, why.red())
                }
            }
        }
    }
    println!("\n{}", result.summary);
    if let Some(backup) = &result.backup_ref {
        println!("Backup written to {}", backup);
    }
}

fn print_health(health: &SystemHealth) {
    let state = |ok: bool| if ok { "online".green() } else { "offline".red() };
    println!("Plex:    {}", state(health.media_server_online));
    for (name, ready) in [
        ("Sonarr:", health.show_tracker_ready),
        ("Radarr:", health.movie_tracker_ready),
    ] {
        match ready {
            Some(ok) => println!("{:<8} {}", name, state(ok)),
            None => println!("{:<8} {}", name, "not configured".dimmed()),
        }
    }
}
