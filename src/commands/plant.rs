//! # Plant Command Handler
//!
//! Listing, inspecting, creating, editing, deleting and caring for plants.

use chrono::{DateTime, Utc};

use crate::commands::context::CliContext;
use crate::commands::shared::{
    dispatch_command, exit_with_handled, parse_days_or_exit, parse_flag_pairs,
    parse_plant_id_or_exit, validate_args_count_or_exit,
};
use crate::{CareTask, NewPlant, Plant, PlantUpdate, cli_utils};

const PLANT_USAGE: &str =
    "Usage: plantctl plant <list|get|create|update|delete|water|fertilize> [args...]";
const CREATE_USAGE: &str = "Usage: plantctl plant create <name> [--species <text>] [--water-every <days>] [--fertilize-every <days>] [--notes <text>] [--image <url>]";
const UPDATE_USAGE: &str = "Usage: plantctl plant update <plant-id> <json>";

/// Handles all plant-related commands.
pub async fn handle_plant_command(args: &[String], ctx: &mut CliContext) {
    ctx.require_login();
    dispatch_command!("plant", PLANT_USAGE, args, ctx, {
        "list" => handle_plant_list,
        "get" => handle_plant_get,
        "create" => handle_plant_create,
        "update" => handle_plant_update,
        "delete" => handle_plant_delete,
        "water" => handle_plant_water,
        "fertilize" => handle_plant_fertilize,
    });
}

/// Describes when a task is due relative to `now`.
pub fn due_label(next: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = next.date_naive().signed_duration_since(now.date_naive()).num_days();
    if next < now {
        match days {
            0 => "overdue (today)".to_string(),
            d => format!("overdue by {} day{}", -d, if d == -1 { "" } else { "s" }),
        }
    } else {
        match days {
            0 => "due today".to_string(),
            1 => "due tomorrow".to_string(),
            d => format!("in {} days", d),
        }
    }
}

fn print_plant_detail(plant: &Plant, now: DateTime<Utc>) {
    println!("{} ({})", plant.name, plant.id);
    if let Some(species) = &plant.species {
        println!("  Species:      {}", species);
    }
    for task in CareTask::ALL {
        let last = plant
            .last_done(task)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<12}  every {} days, last {}, next {} ({})",
            format!("{}:", cli_utils::capitalize(&task.to_string())),
            plant.frequency_days(task),
            last,
            plant.next_due(task).format("%Y-%m-%d"),
            due_label(plant.next_due(task), now)
        );
    }
    if let Some(notes) = &plant.notes {
        println!("  Notes:        {}", notes);
    }
    if plant.image.is_some() {
        println!("  Image:        attached");
    }
}

async fn handle_plant_list(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(args, 1, 1, "list", "Usage: plantctl plant list");
    let plants: Vec<Plant> = ctx
        .execute_or_exit(
            |client| async move { client.get("plants").await },
            "Failed to list plants",
        )
        .await;

    if ctx.output() != cli_utils::OutputFormat::Text {
        cli_utils::print_formatted_or_exit(&plants, ctx.output(), "plants");
    } else if plants.is_empty() {
        println!("No plants yet. Add one with `plantctl plant create <name>`.");
    } else {
        let now = Utc::now();
        println!("{:<36}  {:<20}  {:<18}  {:<18}", "ID", "NAME", "WATER", "FERTILIZE");
        for plant in &plants {
            println!(
                "{:<36}  {:<20}  {:<18}  {:<18}",
                plant.id,
                plant.name,
                due_label(plant.next_watering_date, now),
                due_label(plant.next_fertilizing_date, now)
            );
        }
    }
}

async fn handle_plant_get(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(args, 2, 2, "get", "Usage: plantctl plant get <plant-id>");
    let id = parse_plant_id_or_exit(&args[1]);
    let plant: Plant = ctx
        .execute_or_exit(
            |client| async move { client.get(&format!("plants/{}", id)).await },
            "Failed to get plant",
        )
        .await;
    if ctx.output() == cli_utils::OutputFormat::Text {
        print_plant_detail(&plant, Utc::now());
    } else {
        cli_utils::print_formatted_or_exit(&plant, ctx.output(), "plant");
    }
}

async fn handle_plant_create(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(args, 2, 12, "create", CREATE_USAGE);
    let mut request = NewPlant::named(args[1].clone());
    let pairs = parse_flag_pairs(
        &args[2..],
        &["species", "water-every", "fertilize-every", "notes", "image"],
    )
    .unwrap_or_else(|e| exit_with_handled(&e, "Invalid create options"));
    for (name, value) in pairs {
        match name {
            "species" => request.species = Some(value.to_string()),
            "water-every" => {
                request.watering_frequency_days = Some(parse_days_or_exit(value, "--water-every"))
            }
            "fertilize-every" => {
                request.fertilizing_frequency_days =
                    Some(parse_days_or_exit(value, "--fertilize-every"))
            }
            "notes" => request.notes = Some(value.to_string()),
            _ => request.image = Some(value.to_string()),
        }
    }

    let plant: Plant = ctx
        .execute_or_exit(
            |client| async move { client.post("plants", &request).await },
            "Failed to create plant",
        )
        .await;
    if ctx.output() == cli_utils::OutputFormat::Text {
        println!("Created plant: {}", plant.id);
        print_plant_detail(&plant, Utc::now());
    } else {
        cli_utils::print_formatted_or_exit(&plant, ctx.output(), "plant");
    }
}

async fn handle_plant_update(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(args, 3, 3, "update", UPDATE_USAGE);
    let id = parse_plant_id_or_exit(&args[1]);
    let update: PlantUpdate = serde_json::from_str(&args[2])
        .unwrap_or_else(|e| exit_with_handled(&e, "Invalid plant update"));
    let plant: Plant = ctx
        .execute_or_exit(
            |client| async move { client.put(&format!("plants/{}", id), &update).await },
            "Failed to update plant",
        )
        .await;
    if ctx.output() == cli_utils::OutputFormat::Text {
        println!("Updated plant: {}", plant.id);
        print_plant_detail(&plant, Utc::now());
    } else {
        cli_utils::print_formatted_or_exit(&plant, ctx.output(), "plant");
    }
}

async fn handle_plant_delete(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(
        args,
        2,
        2,
        "delete",
        "Usage: plantctl plant delete <plant-id>",
    );
    let id = parse_plant_id_or_exit(&args[1]);
    ctx.execute_or_exit(
        |client| async move { client.delete(&format!("plants/{}", id)).await },
        "Failed to delete plant",
    )
    .await;
    println!("Deleted plant: {}", id);
}

async fn mark_done(args: &[String], ctx: &mut CliContext, task: CareTask) {
    let command = match task {
        CareTask::Watering => "water",
        CareTask::Fertilizing => "fertilize",
    };
    validate_args_count_or_exit(
        args,
        2,
        2,
        command,
        &format!("Usage: plantctl plant {} <plant-id>", command),
    );
    let id = parse_plant_id_or_exit(&args[1]);
    let plant: Plant = ctx
        .execute_or_exit(
            |client| async move { client.post_empty(&format!("plants/{}/{}", id, command)).await },
            &format!("Failed to {} plant", command),
        )
        .await;
    if ctx.output() == cli_utils::OutputFormat::Text {
        println!(
            "{}: {} done, next {}",
            plant.name,
            task,
            plant.next_due(task).format("%Y-%m-%d")
        );
    } else {
        cli_utils::print_formatted_or_exit(&plant, ctx.output(), "plant");
    }
}

async fn handle_plant_water(args: &[String], ctx: &mut CliContext) {
    mark_done(args, ctx, CareTask::Watering).await
}

async fn handle_plant_fertilize(args: &[String], ctx: &mut CliContext) {
    mark_done(args, ctx, CareTask::Fertilizing).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn due_labels() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        assert_eq!(due_label(now + Duration::hours(3), now), "due today");
        assert_eq!(due_label(now - Duration::hours(3), now), "overdue (today)");
        assert_eq!(due_label(now + Duration::days(1), now), "due tomorrow");
        assert_eq!(due_label(now + Duration::days(6), now), "in 6 days");
        assert_eq!(due_label(now - Duration::days(1), now), "overdue by 1 day");
        assert_eq!(due_label(now - Duration::days(4), now), "overdue by 4 days");
    }
}
