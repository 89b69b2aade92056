//! # Account Command Handler
//!
//! Registration, login, logout and showing who is logged in.

use crate::commands::context::CliContext;
use crate::commands::shared::{
    dispatch_command, exit_with_handled, parse_flag_pairs, validate_args_count_or_exit,
};
use crate::{AuthResponse, LoginRequest, RegisterRequest, cli_utils};

const ACCOUNT_USAGE: &str = "Usage: plantctl account <register|login|logout|whoami> [args...]";
const REGISTER_USAGE: &str =
    "Usage: plantctl account register <name> <email> <password> [--age <years>] [--affiliation <text>]";

/// Handles all account-related commands.
pub async fn handle_account_command(args: &[String], ctx: &mut CliContext) {
    dispatch_command!("account", ACCOUNT_USAGE, args, ctx, {
        "register" => handle_register,
        "login" => handle_login,
        "logout" => handle_logout,
        "whoami" => handle_whoami,
    });
}

async fn handle_register(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(args, 4, 8, "register", REGISTER_USAGE);
    let mut request = RegisterRequest {
        name: args[1].clone(),
        email: args[2].clone(),
        password: args[3].clone(),
        age: None,
        affiliation: None,
    };
    let pairs = parse_flag_pairs(&args[4..], &["age", "affiliation"])
        .unwrap_or_else(|e| exit_with_handled(&e, "Invalid register options"));
    for (name, value) in pairs {
        match name {
            "age" => {
                request.age = Some(value.parse().unwrap_or_else(|_| {
                    cli_utils::exit_with_error(&format!(
                        "age must be a whole number, got '{}'",
                        value
                    ))
                }))
            }
            _ => request.affiliation = Some(value.to_string()),
        }
    }

    let response: AuthResponse = ctx
        .execute_or_exit(
            |client| async move { client.post("register", &request).await },
            "Failed to register",
        )
        .await;
    let name = response.user.name.clone();
    ctx.establish(response)
        .unwrap_or_else(|e| exit_with_handled(&e, "Registered, but could not save the session"));
    println!("Welcome, {}! You are now logged in.", name);
}

async fn handle_login(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(
        args,
        3,
        3,
        "login",
        "Usage: plantctl account login <email> <password>",
    );
    let request = LoginRequest {
        email: args[1].clone(),
        password: args[2].clone(),
    };
    let response: AuthResponse = ctx
        .execute_or_exit(
            |client| async move { client.post("login", &request).await },
            "Failed to log in",
        )
        .await;
    let name = response.user.name.clone();
    ctx.establish(response)
        .unwrap_or_else(|e| exit_with_handled(&e, "Logged in, but could not save the session"));
    println!("Logged in as {}.", name);
}

async fn handle_logout(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(args, 1, 1, "logout", "Usage: plantctl account logout");
    ctx.end_session()
        .unwrap_or_else(|e| exit_with_handled(&e, "Could not clear the session"));
    println!("Logged out.");
}

async fn handle_whoami(args: &[String], ctx: &mut CliContext) {
    validate_args_count_or_exit(args, 1, 1, "whoami", "Usage: plantctl account whoami");
    ctx.require_login();
    match (&ctx.session().user, ctx.output()) {
        (Some(user), cli_utils::OutputFormat::Text) => {
            println!("{} <{}>", user.name, user.email);
            if let Some(expiry) = ctx.session().expires_at {
                println!("Session expires {}", expiry.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        (Some(user), format) => cli_utils::print_formatted_or_exit(user, format, "user"),
        (None, _) => println!("Logged in (no profile stored)."),
    }
}
