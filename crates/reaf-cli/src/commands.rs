use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use colored::{ColoredString, Colorize};
use serde_json::json;

use reaf_diff::{diff_with, side_by_side, DiffKind, DiffLine, DiffStrategy, DiffSummary};
use reaf_engine::{BulkOperationProgress, ProgressMessage};
use reaf_sdk::{Tracker, TrackerConfig};
use reaf_store::{EntityFilters, InMemoryRepository};
use reaf_tree::{EntityView, ExpansionState, TriState};
use reaf_types::{CombinationId, NewRequirement, ReaffirmationAction, ReaffirmationStatus};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    match cli.command {
        Command::Diff(args) => cmd_diff(args, cli.format),
        Command::Tree(args) => cmd_tree(args, config, cli.format).await,
        Command::Reaffirm(args) => cmd_reaffirm(args, config, cli.format).await,
    }
}

// ---- diff ----

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let original = read_text(&args.original)?;
    let proposed = read_text(&args.proposed)?;
    let strategy = match args.strategy {
        StrategyArg::Lookahead => DiffStrategy::Lookahead,
        StrategyArg::Myers => DiffStrategy::Myers,
    };
    let lines = diff_with(strategy, &original, &proposed);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    if args.side_by_side {
        print_side_by_side(&lines);
    } else {
        for line in &lines {
            println!(
                "{:>4} {}",
                line.line_number.to_string().dimmed(),
                paint(line.kind, &format!("{} {}", line.marker(), line.content))
            );
        }
    }

    if lines.is_identical() {
        println!("\n{}", "No changes.".dimmed());
    } else {
        println!(
            "\n{} {}, {} {}",
            lines.additions().to_string().green().bold(),
            "added".green(),
            lines.deletions().to_string().red().bold(),
            "removed".red()
        );
    }
    Ok(())
}

fn print_side_by_side(lines: &[DiffLine]) {
    let rows = side_by_side(lines);
    let width = rows
        .iter()
        .filter_map(|r| r.original)
        .map(|s| s.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(8, 60);
    for row in rows {
        let left = row.original.unwrap_or("");
        let right = row.proposed.unwrap_or("");
        let left = format!("{left:<width$}");
        let (left, right) = match row.kind {
            DiffKind::Unchanged => (left.normal(), right.normal()),
            DiffKind::Removed => (left.red(), "".normal()),
            DiffKind::Added => (" ".repeat(width).normal(), right.green()),
        };
        println!(
            "{:>4} {} {} {}",
            row.line_number.to_string().dimmed(),
            left,
            "│".dimmed(),
            right
        );
    }
}

fn paint(kind: DiffKind, text: &str) -> ColoredString {
    match kind {
        DiffKind::Unchanged => text.normal(),
        DiffKind::Added => text.green(),
        DiffKind::Removed => text.red(),
    }
}

// ---- tree ----

async fn cmd_tree(args: TreeArgs, config: TrackerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (_, mut tracker) = open_tracker(&args.data, &config).await?;
    if args.search.is_some() {
        let filters = EntityFilters {
            search: args.search.clone(),
            ..Default::default()
        };
        tracker.refresh(filters).await?;
    }
    if args.expand_all {
        tracker.load_all().await?;
    }

    let now = Utc::now();
    let view = tracker.tree().nested_view(now);

    if format == OutputFormat::Json {
        let entities: Vec<_> = view.iter().map(entity_json).collect();
        let doc = json!({ "summary": tracker.summary(), "entities": entities });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let summary = tracker.summary();
    println!(
        "{} entities, {} combinations ({} due soon, {} overdue)",
        summary.total_entities.to_string().bold(),
        summary.total_combinations.to_string().bold(),
        summary.due.to_string().yellow(),
        summary.overdue.to_string().red()
    );
    for entity in &view {
        print_entity(entity);
    }
    Ok(())
}

fn print_entity(entity: &EntityView<'_>) {
    let arrow = match entity.state {
        ExpansionState::Collapsed => "▸",
        _ => "▾",
    };
    println!(
        "{} {} {} {}",
        arrow,
        entity.name.bold(),
        format!("({})", entity.id).dimmed(),
        format!(
            "total {} · due {} · overdue {}",
            entity.total, entity.due, entity.overdue
        )
        .dimmed()
    );
    if entity.state == ExpansionState::Collapsed {
        return;
    }
    for version in &entity.versions {
        println!(
            "    v{} {} {}",
            version.sequence,
            version.id.as_str().dimmed(),
            status_label(version.status)
        );
        for combination in &version.combinations {
            println!(
                "        {} {} {} {}",
                if combination.selected { "[x]" } else { "[ ]" },
                combination.record.id.as_str().cyan(),
                combination.record.classification,
                status_label(combination.status)
            );
        }
    }
    if entity.has_more {
        println!(
            "    {}",
            format!(
                "… {} of {} loaded",
                entity.loaded_combinations(),
                entity.total
            )
            .dimmed()
        );
    }
}

fn entity_json(entity: &EntityView<'_>) -> serde_json::Value {
    let versions: Vec<_> = entity
        .versions
        .iter()
        .map(|v| {
            json!({
                "id": v.id,
                "sequence": v.sequence,
                "status": v.status,
                "selection": tri_state_name(v.selection),
                "combinations": v.combinations.iter().map(|c| json!({
                    "id": c.record.id,
                    "status": c.status,
                    "selected": c.selected,
                    "title": c.record.requirement.title,
                    "dueDate": c.record.due_date,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "id": entity.id,
        "name": entity.name,
        "total": entity.total,
        "due": entity.due,
        "overdue": entity.overdue,
        "hasMore": entity.has_more,
        "versions": versions,
    })
}

fn tri_state_name(state: TriState) -> &'static str {
    match state {
        TriState::None => "NONE",
        TriState::Partial => "PARTIAL",
        TriState::All => "ALL",
    }
}

fn status_label(status: ReaffirmationStatus) -> ColoredString {
    match status {
        ReaffirmationStatus::Current => status.as_str().green(),
        ReaffirmationStatus::DueSoon => status.as_str().yellow(),
        ReaffirmationStatus::Overdue => status.as_str().red().bold(),
    }
}

// ---- reaffirm ----

async fn cmd_reaffirm(
    args: ReaffirmArgs,
    config: TrackerConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (repo, tracker) = open_tracker(&args.data, &config).await?;
    let mut tracker = match &args.actor {
        Some(actor) => tracker.with_actor(actor.clone()),
        None => tracker,
    };
    tracker.load_all().await?;

    for id in &args.fail {
        repo.fail_on(id.as_str(), "rejected by repository");
    }
    for id in &args.entities {
        tracker.select_entity(&id.as_str().into(), true)?;
    }
    for id in &args.versions {
        tracker.select_version(&id.as_str().into(), true)?;
    }
    for id in &args.combinations {
        let id = CombinationId::from(id.as_str());
        if !tracker.tree().selection().is_selected(&id) {
            tracker.select_combination(&id)?;
        }
    }

    let (action, requirements) = match &args.with_changes {
        Some(spec) => (
            ReaffirmationAction::ReaffirmedWithChanges,
            vec![parse_requirement(spec)?],
        ),
        None => (ReaffirmationAction::ReaffirmedAsIs, Vec::new()),
    };

    let mut stream = tracker.submit_selected(action, args.comment.clone(), requirements)?;

    if format == OutputFormat::Text {
        println!(
            "{} {} {}",
            "Reaffirming".bold(),
            tracker.selected_ids().len(),
            format!("combinations ({action})").dimmed()
        );
    }

    let mut last: Option<BulkOperationProgress> = None;
    while let Some(message) = stream.recv().await {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&message)?),
            OutputFormat::Text => print_progress(&message),
        }
        let progress = message.into_data();
        let cancel = should_cancel(args.cancel_after, &progress);
        last = Some(progress);
        if cancel && tracker.cancel().is_some() {
            break;
        }
    }

    let Some(progress) = last else {
        bail!("bulk run ended without reporting progress");
    };
    if !progress.is_terminal() {
        if format == OutputFormat::Text {
            println!(
                "{} after {} of {} items",
                "Cancelled".yellow().bold(),
                progress.processed_items,
                progress.total_items
            );
        }
        return Ok(());
    }

    tracker.finish_run(&progress).await?;
    if format == OutputFormat::Text {
        print_summary(&progress, &tracker);
    }
    Ok(())
}

/// Cancel once `cancel_after` items are processed, but never after the
/// last item: by then every item is persisted and the outcome is pending.
fn should_cancel(cancel_after: Option<usize>, progress: &BulkOperationProgress) -> bool {
    cancel_after.is_some_and(|n| progress.processed_items >= n)
        && progress.processed_items < progress.total_items
        && !progress.is_terminal()
}

fn print_progress(message: &ProgressMessage) {
    let data = message.data();
    match message {
        ProgressMessage::ProgressUpdate { .. } => println!(
            "  [{:>3}%] {}/{} processed, {} failed",
            data.percent(),
            data.processed_items,
            data.total_items,
            data.failed_items
        ),
        ProgressMessage::Completion { .. } => {
            println!("{} {}", "✓".green().bold(), "Bulk reaffirmation completed".green())
        }
        ProgressMessage::Error { .. } => {
            println!("{} {}", "✗".red().bold(), "Bulk reaffirmation failed".red())
        }
    }
}

fn print_summary(progress: &BulkOperationProgress, tracker: &Tracker) {
    println!(
        "  Completed: {}  Failed: {}  Total: {}",
        progress.completed_items.to_string().green(),
        progress.failed_items.to_string().red(),
        progress.total_items
    );
    for error in &progress.errors {
        println!("  {} {}", "error:".red(), error);
    }
    let retry = tracker.selected_ids();
    if !retry.is_empty() {
        let ids: Vec<&str> = retry.iter().map(|id| id.as_str()).collect();
        println!("  Still selected for resubmission: {}", ids.join(", ").yellow());
    }
}

fn parse_requirement(spec: &str) -> anyhow::Result<NewRequirement> {
    let Some((title, text)) = spec.split_once(':') else {
        bail!("--with-changes expects TITLE:TEXT, got {spec:?}");
    };
    let (title, text) = (title.trim(), text.trim());
    if title.is_empty() || text.is_empty() {
        bail!("--with-changes needs a non-empty title and text");
    }
    // Literal "\n" sequences allow multi-line text on the command line.
    Ok(NewRequirement::new(title, text.replace("\\n", "\n")))
}

// ---- shared ----

async fn open_tracker(
    data: &Path,
    config: &TrackerConfig,
) -> anyhow::Result<(Arc<InMemoryRepository>, Tracker)> {
    let json = read_text(data)?;
    let repo = InMemoryRepository::from_json(&json, config.repository_config())
        .with_context(|| format!("loading data file {}", data.display()))?;
    let repo = Arc::new(repo);
    let mut tracker = Tracker::new(repo.clone(), config.clone());
    tracker.refresh(EntityFilters::default()).await?;
    Ok((repo, tracker))
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
