use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use plantcare::commands::shared::exit_with_handled;
use plantcare::{
    DEFAULT_BASE_URL, SessionStore,
    cli_utils::{self, OutputFormat},
    commands::{
        CliContext, handle_account_command, handle_activity_command, handle_plant_command,
        handle_summary_command,
    },
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Options {
    #[arrrg(optional, "Base URL of the plantcare API server")]
    base_url: String,
    #[arrrg(optional, "Output format: text, json or yaml (default: text)")]
    output: OutputFormat,
    #[arrrg(optional, "Path of the session file")]
    session: String,
}

const USAGE: &str = r#"Usage: plantctl [options] <command> [args...]

Options:
  --base-url <url>     Base URL of the plantcare API server (default: http://localhost:5000)
  --output <format>    Output format: text, json or yaml (default: text)
  --session <path>     Session file (default: $PLANTCTL_SESSION or ~/.plantctl/session.json)

Commands:
  account register <name> <email> <password> [--age <n>] [--affiliation <text>]
  account login <email> <password>             Log in and remember the session
  account logout                               Forget the stored session
  account whoami                               Show the logged-in user
  plant list                                   List your plants
  plant get <plant-id>                         Show one plant
  plant create <name> [--species <s>] [--water-every <days>]
               [--fertilize-every <days>] [--notes <text>] [--image <url>]
  plant update <plant-id> <json>               Update fields of a plant
  plant delete <plant-id>                      Remove a plant
  plant water <plant-id>                       Record a watering
  plant fertilize <plant-id>                   Record a fertilizing
  activity list [--plant <plant-id>] [--type <type>]
  activity add <plant-id> <type> [note]        Log an activity by hand
  summary                                      Counts and what needs care today"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (options, free) =
        Options::from_command_line_relaxed("USAGE: plantctl <command> [args...]");

    if free.is_empty() {
        cli_utils::exit_with_usage_error("No command specified", USAGE);
    }

    let base_url = if options.base_url.is_empty() {
        DEFAULT_BASE_URL.to_string()
    } else {
        options.base_url
    };
    let sessions = if options.session.is_empty() {
        SessionStore::default_location()
    } else {
        SessionStore::new(options.session)
    };

    let mut ctx = CliContext::new(base_url, sessions, options.output)
        .unwrap_or_else(|e| exit_with_handled(&e, "Could not load session"));

    match free[0].as_str() {
        "account" => handle_account_command(&free[1..], &mut ctx).await,
        "plant" => handle_plant_command(&free[1..], &mut ctx).await,
        "activity" => handle_activity_command(&free[1..], &mut ctx).await,
        "summary" => handle_summary_command(&free[1..], &mut ctx).await,
        "help" => println!("{}", USAGE),
        _ => {
            cli_utils::exit_with_error(&format!(
                "Unknown command '{}'. Available commands: account, plant, activity, summary",
                free[0]
            ));
        }
    }

    Ok(())
}
