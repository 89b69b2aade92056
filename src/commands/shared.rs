//! # Shared Command Utilities
//!
//! Argument validation, ID parsing and the subcommand dispatcher used by
//! every `plantctl` command handler.

use std::str::FromStr;

use handled::Handle;

use crate::cli_utils;
use crate::commands::errors::UserError;
use crate::{ActivityType, PlantId};

/// Prints `error` (with its hint, when it has one) and exits.
pub fn exit_with_handled<E>(error: &E, context: &str) -> !
where
    E: Handle<UserError> + std::fmt::Display,
{
    match error.handle() {
        Some(UserError {
            message,
            usage_hint: Some(hint),
        }) => cli_utils::exit_with_usage_error(&format!("{}: {}", context, message), &hint),
        Some(UserError { message, .. }) => {
            cli_utils::exit_with_error(&format!("{}: {}", context, message))
        }
        None => cli_utils::exit_with_error(&format!("{}: {}", context, error)),
    }
}

/// Generic parsing function that works with any type that implements FromStr
/// and whose error type implements Handle<UserError>.
fn parse_or_exit_generic<T, E>(input: &str, what: &str) -> T
where
    T: FromStr<Err = E>,
    E: Handle<UserError> + std::fmt::Display,
{
    input
        .parse()
        .unwrap_or_else(|e: E| exit_with_handled(&e, &format!("Could not parse {}", what)))
}

/// Validates and parses a plant ID, or exits with a hint.
pub fn parse_plant_id_or_exit(input: &str) -> PlantId {
    parse_or_exit_generic(input, "plant ID")
}

/// Validates and parses an activity type, or exits listing the valid ones.
pub fn parse_activity_type_or_exit(input: &str) -> ActivityType {
    input.parse().unwrap_or_else(|_| {
        let valid: Vec<&str> = ActivityType::ALL.iter().map(|k| k.as_str()).collect();
        cli_utils::exit_with_error(&format!(
            "Unknown activity type '{}'. Valid types: {}",
            input,
            valid.join(", ")
        ))
    })
}

/// Parses a positive day count, or exits.
pub fn parse_days_or_exit(input: &str, field: &str) -> u32 {
    match input.parse::<u32>() {
        Ok(days) if days > 0 => days,
        _ => cli_utils::exit_with_error(&format!(
            "{} must be a positive whole number of days, got '{}'",
            field, input
        )),
    }
}

/// Validates both minimum and maximum argument counts.
///
/// # Arguments
/// * `args` - The command arguments array
/// * `min_count` - The minimum number of arguments required (including subcommand)
/// * `max_count` - The maximum number of arguments allowed (including subcommand)
/// * `command` - The command name for error message
/// * `usage` - The usage string to display
pub fn validate_args_count_or_exit(
    args: &[String],
    min_count: usize,
    max_count: usize,
    command: &str,
    usage: &str,
) {
    if args.len() < min_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command requires more arguments", command),
            usage,
        );
    }
    if args.len() > max_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command has too many arguments", command),
            usage,
        );
    }
}

/// Splits `--name value` pairs out of `args`.  Unknown names and dangling
/// flags are reported as errors.
pub fn parse_flag_pairs<'a>(
    args: &'a [String],
    known: &[&str],
) -> Result<Vec<(&'a str, &'a str)>, UserError> {
    let mut pairs = Vec::new();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let Some(name) = flag.strip_prefix("--") else {
            return Err(UserError::new(format!("unexpected argument '{}'", flag)));
        };
        if !known.contains(&name) {
            return Err(UserError::new(format!("unknown option '--{}'", name))
                .with_hint(format!("Valid options: --{}", known.join(", --"))));
        }
        let Some(value) = iter.next() else {
            return Err(UserError::new(format!("option '--{}' needs a value", name)));
        };
        pairs.push((name, value.as_str()));
    }
    Ok(pairs)
}

/// Macro to generate command dispatcher boilerplate.
macro_rules! dispatch_command {
    ($command_name:expr, $usage:expr, $args:expr, $ctx:expr, {
        $($subcommand:expr => $handler:expr),* $(,)?
    }) => {
        if $args.is_empty() {
            crate::cli_utils::exit_with_usage_error(
                &format!("{} command requires a subcommand", $command_name),
                $usage,
            );
        }

        match $args[0].as_str() {
            $(
                $subcommand => $handler($args, $ctx).await,
            )*
            _ => {
                let available_subcommands = vec![$($subcommand),*];
                crate::cli_utils::exit_with_error(&format!(
                    "Unknown {} subcommand '{}'. Available subcommands: {}",
                    $command_name,
                    $args[0],
                    available_subcommands.join(", ")
                ));
            }
        }
    };
}

pub(crate) use dispatch_command;

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_pairs() {
        let args = strings(&["--plant", "abc", "--type", "watered"]);
        assert_eq!(
            parse_flag_pairs(&args, &["plant", "type"]).unwrap(),
            vec![("plant", "abc"), ("type", "watered")]
        );
    }

    #[test]
    fn flag_pair_errors() {
        let dangling = strings(&["--plant"]);
        assert!(parse_flag_pairs(&dangling, &["plant"]).is_err());

        let unknown = strings(&["--colour", "green"]);
        let err = parse_flag_pairs(&unknown, &["plant", "type"]).unwrap_err();
        assert_eq!(err.usage_hint.as_deref(), Some("Valid options: --plant, --type"));

        let bare = strings(&["plant"]);
        assert!(parse_flag_pairs(&bare, &["plant"]).is_err());
    }
}
