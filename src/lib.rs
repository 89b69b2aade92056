//! # Plantcare: Care Reminders for House Plants
//!
//! Plantcare keeps track of a user's plants and when each one next needs
//! watering and fertilizing.  Users record care as it happens; the service
//! derives the next due dates from each plant's schedule and, in the
//! background, writes an overdue reminder the first time a task slips past
//! its date on a given day.
//!
//! This crate provides:
//!
//! - **Accounts**: Email/password registration and login with Argon2id password
//!   hashes and HS256 bearer tokens
//! - **Plant registry**: Per-user plants with watering and fertilizing schedules
//!   whose next dates are always re-derived from the last recorded care
//! - **Activity log**: An append-only history of care, manual notes and overdue
//!   reminders, filterable by plant and type
//! - **Overdue sweep**: A periodic task that records at most one overdue
//!   reminder per plant, task and day
//! - **HTTP API**: JSON endpoints under `/api` served by `plantcared`
//! - **CLI**: `plantctl`, a client that remembers its session on disk
//!
//! ## Core Concepts
//!
//! ### Ownership
//! Every plant and activity is tagged with the [`UserId`] of its owner.  A
//! plant belonging to someone else is indistinguishable from a missing one.
//!
//! ### Derivation
//! For each care task, `next = last + frequency` when the task has been done,
//! and `now + frequency` otherwise.  Creating, updating and marking a plant
//! done all re-derive both dates.
//!
//! ### Storage
//! The [`DataStore`] trait has two implementations: [`InMemoryDataStore`] for
//! development and tests, and [`sql::PgDataStore`] backed by PostgreSQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ HTTP API Layer (Axum routes)            │
//! ├─────────────────────────────────────────┤
//! │ Auth extractor (bearer token → UserId)  │
//! ├─────────────────────────────────────────┤
//! │ Registry, activity log, summary         │
//! ├─────────────────────────────────────────┤
//! │ Data Store (Trait-based abstraction)    │
//! ├─────────────────────────────────────────┤
//! │ Persistence (in-memory or PostgreSQL)   │
//! └─────────────────────────────────────────┘
//!           ▲
//!           └── Overdue sweep (tokio interval)
//! ```
//!
//! ## Usage Examples
//!
//! ### Scheduling
//!
//! ```rust
//! # use plantcare::{CareTask, NewPlant, UserId};
//! # use chrono::{Duration, TimeZone, Utc};
//! let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
//! let plant = NewPlant {
//!     watering_frequency_days: Some(3),
//!     ..NewPlant::named("Basil")
//! }
//! .into_plant(UserId::generate(), now)
//! .unwrap();
//!
//! assert_eq!(plant.next_due(CareTask::Watering), now + Duration::days(3));
//! assert!(!plant.is_overdue(CareTask::Watering, now));
//! ```
//!
//! ### Serving the API
//!
//! ```rust
//! # use std::sync::Arc;
//! # use plantcare::{AppState, AuthService, InMemoryDataStore, SystemClock, create_router};
//! let auth = AuthService::new(b"a-secret-of-sixteen-bytes", chrono::Duration::days(7));
//! let state = AppState::new(
//!     Arc::new(InMemoryDataStore::new()),
//!     Arc::new(auth),
//!     Arc::new(SystemClock),
//! );
//! let app: axum::Router = create_router(state);
//! # let _ = app;
//! ```

mod activity;
mod auth;
mod clock;
mod config;
mod data_store;
mod errors;
mod extract;
mod ids;
mod plant;
mod router;
mod session;
mod summary;
mod sweep;
mod user;

// CLI utility modules

/// Command-line interface utilities for program termination and output formatting.
///
/// This module provides common CLI utilities for plantcare binaries, including
/// error handling, formatted output, and program termination functions.
pub mod cli_utils;

/// Command-line interface command handlers.
///
/// This module contains organized command handlers for the plantctl CLI application,
/// with each command type implemented in a dedicated submodule.
pub mod commands;

/// HTTP client utilities for interacting with the plantcare service.
///
/// This module provides a typed HTTP client for the plantcare JSON API,
/// handling bearer tokens, requests, responses, and error conditions.
pub mod http_utils;

/// PostgreSQL persistence and the embedded schema migrations.
pub mod sql;

pub use activity::{
    Activity, ActivityFilter, ActivityListItem, ActivityQuery, ActivityType, NewActivity,
    create_activity_router,
};
pub use auth::{
    AuthError, AuthService, AuthUser, DEFAULT_TOKEN_TTL_DAYS, MAX_AGE, create_auth_router,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DATABASE_URL_ENV, JWT_SECRET_ENV, ServerConfig};
pub use data_store::{DataStore, InMemoryDataStore};
pub use errors::{ApiError, DataStoreError, ErrorBody};
pub use extract::ApiJson;
pub use http_utils::{ClientError, DEFAULT_BASE_URL, PlantClient};
pub use ids::{ActivityId, IdParseError, PlantId, UserId};
pub use plant::{
    CareTask, DEFAULT_FERTILIZING_FREQUENCY_DAYS, DEFAULT_WATERING_FREQUENCY_DAYS,
    MAX_FREQUENCY_DAYS, NewPlant, Plant, PlantUpdate, create_plant_router, next_due,
};
pub use router::{AppState, create_router};
pub use session::{SESSION_PATH_ENV, Session, SessionError, SessionStore};
pub use summary::{Summary, create_summary_router, summarize};
pub use sweep::{DEFAULT_SWEEP_INTERVAL, OverdueSweep, RecurringTask, SweepReport};
pub use user::{AuthResponse, LoginRequest, RegisterRequest, User, UserProfile, normalize_email};
