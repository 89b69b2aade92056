use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActivityFilter, ApiError, AppState, AuthUser, CareTask, DataStore, UserId};

/// Dashboard counts for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_plants: usize,
    /// One per overdue watering plus one per overdue fertilizing.
    pub overdue_tasks: usize,
    /// Watered and fertilized activities ever logged.
    pub completed_tasks: usize,
}

/// Computes `owner`'s dashboard counts as of `now`.
pub async fn summarize(
    store: &dyn DataStore,
    owner: UserId,
    now: DateTime<Utc>,
) -> Result<Summary, ApiError> {
    let plants = store.list_plants(owner).await?;
    let overdue_tasks = plants
        .iter()
        .map(|plant| {
            CareTask::ALL
                .iter()
                .filter(|task| plant.is_overdue(**task, now))
                .count()
        })
        .sum();
    let completed_tasks = store
        .list_activities(owner, &ActivityFilter::default())
        .await?
        .iter()
        .filter(|a| a.kind.is_completion())
        .count();
    Ok(Summary {
        total_plants: plants.len(),
        overdue_tasks,
        completed_tasks,
    })
}

async fn summary_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> Result<Json<Summary>, ApiError> {
    summarize(state.store.as_ref(), owner, state.clock.now())
        .await
        .map(Json)
}

/// Creates an Axum router with the dashboard summary endpoint.
pub fn create_summary_router(state: AppState) -> Router {
    Router::new()
        .route("/summary", get(summary_handler))
        .with_state(state)
}
