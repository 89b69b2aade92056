use std::fmt;
use std::process;
use std::str::FromStr;

use serde::Serialize;

/// How `plantctl` renders results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables and sentences.
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(format!(
                "unknown output format '{}' (expected text, json or yaml)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Exits the program with an error message
pub fn exit_with_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Exits the program with an error message and usage information
pub fn exit_with_usage_error(message: &str, usage: &str) -> ! {
    eprintln!("Error: {}", message);
    eprintln!("{}", usage);
    process::exit(1);
}

/// Upper-cases the first character of `word`
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Renders `value` as JSON or YAML.  Text output is the caller's job, so
/// `OutputFormat::Text` falls back to JSON here.
pub fn format_structured<T>(value: &T, format: OutputFormat) -> Result<String, String>
where
    T: Serialize,
{
    match format {
        OutputFormat::Yaml => serde_yml::to_string(value).map_err(|e| e.to_string()),
        OutputFormat::Json | OutputFormat::Text => {
            serde_json::to_string_pretty(value).map_err(|e| e.to_string())
        }
    }
}

/// Prints `value` as JSON or YAML, or exits with an error
pub fn print_formatted_or_exit<T>(value: &T, format: OutputFormat, context: &str)
where
    T: Serialize,
{
    match format_structured(value, format) {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => exit_with_error(&format!("Failed to format {} as {}: {}", context, format, e)),
    }
}
