//! # Summary Command Handler
//!
//! The dashboard: headline counts plus whatever needs attention today.

use chrono::Utc;

use crate::commands::context::CliContext;
use crate::commands::plant::due_label;
use crate::commands::shared::validate_args_count_or_exit;
use crate::{CareTask, Plant, Summary, cli_utils};

/// Handles the `summary` command.
pub async fn handle_summary_command(args: &[String], ctx: &mut CliContext) {
    // `args` excludes the command name itself.
    validate_args_count_or_exit(args, 0, 0, "summary", "Usage: plantctl summary");
    ctx.require_login();

    let summary: Summary = ctx
        .execute_or_exit(
            |client| async move { client.get("summary").await },
            "Failed to load summary",
        )
        .await;
    if ctx.output() != cli_utils::OutputFormat::Text {
        cli_utils::print_formatted_or_exit(&summary, ctx.output(), "summary");
        return;
    }

    let plants: Vec<Plant> = ctx
        .execute_or_exit(
            |client| async move { client.get("plants").await },
            "Failed to list plants",
        )
        .await;

    if let Some(user) = &ctx.session().user {
        println!("Hello, {}!", user.name);
    }
    println!("Plants:          {}", summary.total_plants);
    println!("Overdue tasks:   {}", summary.overdue_tasks);
    println!("Completed tasks: {}", summary.completed_tasks);

    let now = Utc::now();
    let mut attention: Vec<(&Plant, CareTask)> = plants
        .iter()
        .flat_map(|plant| CareTask::ALL.into_iter().map(move |task| (plant, task)))
        .filter(|(plant, task)| plant.next_due(*task).date_naive() <= now.date_naive())
        .collect();
    attention.sort_by_key(|(plant, task)| plant.next_due(*task));

    if attention.is_empty() {
        println!();
        println!("Nothing needs care today.");
    } else {
        println!();
        println!("Needs attention:");
        for (plant, task) in attention {
            println!(
                "  {:<20}  {:<12}  {}",
                plant.name,
                task,
                due_label(plant.next_due(task), now)
            );
        }
    }
}
