//! # Command Handlers
//!
//! This module contains the command handlers for the plantctl CLI application.
//! Each command type is implemented in a dedicated submodule.
//!
//! ## Structure
//!
//! - `account` - Registration, login, logout, whoami
//! - `plant` - Plant commands (list, get, create, update, delete, water, fertilize)
//! - `activity` - Care history (list, add)
//! - `summary` - Dashboard counts and today's tasks
//! - `context` - Client, session and output format shared by every handler
//! - `shared` - Shared utilities and validation functions

pub mod account;
pub mod activity;
pub mod context;
pub mod errors;
pub mod plant;
pub mod shared;
pub mod summary;

pub use account::handle_account_command;
pub use activity::handle_activity_command;
pub use context::CliContext;
pub use plant::handle_plant_command;
pub use summary::handle_summary_command;
