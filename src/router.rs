use std::sync::Arc;

use axum::{Router, routing::get};

use crate::{
    AuthService, Clock, DataStore, create_activity_router, create_auth_router,
    create_plant_router, create_summary_router,
};

/// Shared handles every request handler receives.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub auth: Arc<AuthService>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>, auth: Arc<AuthService>, clock: Arc<dyn Clock>) -> Self {
        AppState { store, auth, clock }
    }
}

async fn banner() -> &'static str {
    "plantcare API is running"
}

/// Assembles the full application: every resource under `/api`, plus a
/// plain-text banner at `/`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .nest("/api", create_auth_router(state.clone()))
        .nest("/api", create_plant_router(state.clone()))
        .nest("/api", create_activity_router(state.clone()))
        .nest("/api", create_summary_router(state))
}
