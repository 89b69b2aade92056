//! # Activity Command Handler
//!
//! Viewing care history and logging care by hand.

use crate::commands::context::CliContext;
use crate::commands::shared::{
    dispatch_command, exit_with_handled, parse_activity_type_or_exit, parse_flag_pairs,
    parse_plant_id_or_exit, validate_args_count_or_exit,
};
use crate::{Activity, ActivityListItem, ActivityQuery, NewActivity, cli_utils};

const ACTIVITY_USAGE: &str = "Usage: plantctl activity <list|add> [args...]";
const LIST_USAGE: &str = "Usage: plantctl activity list [--plant <plant-id>] [--type <type>]";
const ADD_USAGE: &str = "Usage: plantctl activity add <plant-id> <type> [note]";

/// Handles all activity-related commands.
pub async fn handle_activity_command(args: &[String], ctx: &mut CliContext) {
    ctx.require_login();
    dispatch_command!("activity", ACTIVITY_USAGE, args, ctx, {
        "list" => handle_activity_list,
        "add" => handle_activity_add,
    });
}

async fn handle_activity_list(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(args, 1, 5, "list", LIST_USAGE);
    let mut query = ActivityQuery::default();
    let pairs = parse_flag_pairs(&args[1..], &["plant", "type"])
        .unwrap_or_else(|e| exit_with_handled(&e, "Invalid list options"));
    for (name, value) in pairs {
        match name {
            "plant" => query.plant_id = Some(parse_plant_id_or_exit(value).to_string()),
            _ => query.kind = Some(parse_activity_type_or_exit(value).to_string()),
        }
    }

    let items: Vec<ActivityListItem> = ctx
        .execute_or_exit(
            |client| async move { client.get_with_query("activities", &query).await },
            "Failed to list activities",
        )
        .await;

    if ctx.output() != cli_utils::OutputFormat::Text {
        cli_utils::print_formatted_or_exit(&items, ctx.output(), "activities");
    } else if items.is_empty() {
        println!("No activities found");
    } else {
        for item in &items {
            let plant = item.plant_name.as_deref().unwrap_or("(deleted plant)");
            let note = item
                .activity
                .note
                .as_deref()
                .map(|n| format!("  {}", n))
                .unwrap_or_default();
            println!(
                "{}  {:<20}  {:<19}{}",
                item.activity.date.format("%Y-%m-%d %H:%M"),
                plant,
                item.activity.kind,
                note
            );
        }
    }
}

async fn handle_activity_add(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(args, 3, 4, "add", ADD_USAGE);
    let request = NewActivity {
        plant: parse_plant_id_or_exit(&args[1]),
        kind: parse_activity_type_or_exit(&args[2]),
        date: None,
        note: args.get(3).cloned(),
    };
    let activity: Activity = ctx
        .execute_or_exit(
            |client| async move { client.post("activities", &request).await },
            "Failed to log activity",
        )
        .await;
    if ctx.output() == cli_utils::OutputFormat::Text {
        println!("Logged {} for plant {}", activity.kind, activity.plant);
    } else {
        cli_utils::print_formatted_or_exit(&activity, ctx.output(), "activity");
    }
}
