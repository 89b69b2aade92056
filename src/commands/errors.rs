//! # Command Error Handling
//!
//! Converts the errors `plantctl` can hit into [`UserError`]s through the
//! `handled` crate, so every failure prints a message and, where one helps,
//! a hint.

use handled::Handle;

use crate::{ClientError, IdParseError, SessionError, cli_utils};

/// User-friendly error information that can be extracted from various error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserError {
    /// The main error message to display to the user
    pub message: String,
    /// Optional usage hint to help the user correct the error
    pub usage_hint: Option<String>,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        UserError {
            message: message.into(),
            usage_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.usage_hint = Some(hint.into());
        self
    }
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Handle<UserError> for UserError {
    fn handle(&self) -> Option<UserError> {
        Some(self.clone())
    }
}

impl Handle<UserError> for IdParseError {
    fn handle(&self) -> Option<UserError> {
        Some(
            UserError::new(format!("Invalid {} ID '{}'", self.kind(), self.input())).with_hint(
                format!(
                    "{} IDs are UUIDs, e.g. 67e55044-10b1-426f-9247-bb680e5fe0c8; `plantctl plant list` shows them",
                    cli_utils::capitalize(self.kind())
                ),
            ),
        )
    }
}

impl Handle<UserError> for ClientError {
    fn handle(&self) -> Option<UserError> {
        let error = UserError::new(self.to_string());
        let hint = match self {
            ClientError::Transport(_) => {
                Some("Is plantcared running? Point plantctl at it with --base-url.")
            }
            ClientError::NotLoggedIn => {
                Some("Log in with `plantctl account login <email> <password>`.")
            }
            ClientError::Api { status, .. } => match status {
                400 => Some("Check your input data and try again."),
                401 => Some("Your session has ended. Log in again with `plantctl account login`."),
                404 => Some("The requested resource was not found. Check the ID and try again."),
                409 => Some("That email is already registered. Try logging in instead."),
                500..=599 => Some("Server error. The service may be temporarily unavailable."),
                _ => None,
            },
        };
        Some(match hint {
            Some(hint) => error.with_hint(hint),
            None => error,
        })
    }
}

impl Handle<UserError> for SessionError {
    fn handle(&self) -> Option<UserError> {
        let error = UserError::new(self.to_string());
        Some(match self {
            SessionError::Corrupt { path, .. } => error.with_hint(format!(
                "Delete {} or run `plantctl account logout`, then log in again.",
                path.display()
            )),
            SessionError::Io { .. } => {
                error.with_hint(format!("Set {} to a writable path.", crate::SESSION_PATH_ENV))
            }
        })
    }
}

impl Handle<UserError> for serde_json::Error {
    fn handle(&self) -> Option<UserError> {
        Some(
            UserError::new(format!("JSON parsing error: {}", self))
                .with_hint("Ensure the JSON is properly formatted and uses camelCase field names"),
        )
    }
}

/// Enhanced error formatting for CLI output
pub fn format_cli_error<E>(error: &E) -> String
where
    E: Handle<UserError> + std::fmt::Display,
{
    if let Some(user_error) = error.handle() {
        let mut output = format!("Error: {}", user_error.message);
        if let Some(hint) = user_error.usage_hint {
            output.push_str(&format!("\nHint: {}", hint));
        }
        output
    } else {
        format!("Error: {}", error)
    }
}
