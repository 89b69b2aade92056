//! PostgreSQL database operations for plantcare.
//!
//! This module provides functions for interacting with the PostgreSQL database,
//! organized by table, and [`PgDataStore`], which implements [`DataStore`] on
//! top of them.  Each [`DataStore`] call runs in its own transaction.

use axum::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::{
    Activity, ActivityFilter, ActivityType, CareTask, DataStore, DataStoreError, Plant, PlantId,
    User, UserId,
};

/// Activity log operations.
pub mod activity;
/// Plant operations.
pub mod plant;
/// User operations.
pub mod user;

/// Result type for database operations.
pub type SqlResult<T> = Result<T, DataStoreError>;

/// The embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// [`DataStore`] backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgDataStore {
    pool: PgPool,
}

impl PgDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, DataStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies any pending migrations.
    pub async fn migrate(&self) -> Result<(), DataStoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| DataStoreError::Internal(format!("migration failed: {}", e)))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

macro_rules! in_transaction {
    ($store:expr, |$tx:ident| $body:expr) => {{
        let mut $tx = $store.pool.begin().await?;
        let result = $body.await?;
        $tx.commit().await?;
        Ok(result)
    }};
}

#[async_trait]
impl DataStore for PgDataStore {
    async fn create_user(&self, user: &User) -> Result<(), DataStoreError> {
        in_transaction!(self, |tx| user::create(&mut tx, user))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DataStoreError> {
        in_transaction!(self, |tx| user::find_by_email(&mut tx, email))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, DataStoreError> {
        in_transaction!(self, |tx| user::get(&mut tx, id))
    }

    async fn create_plant(&self, p: &Plant) -> Result<(), DataStoreError> {
        in_transaction!(self, |tx| plant::create(&mut tx, p))
    }

    async fn get_plant(
        &self,
        owner: UserId,
        id: PlantId,
    ) -> Result<Option<Plant>, DataStoreError> {
        in_transaction!(self, |tx| plant::get(&mut tx, owner, id))
    }

    async fn list_plants(&self, owner: UserId) -> Result<Vec<Plant>, DataStoreError> {
        in_transaction!(self, |tx| plant::list(&mut tx, owner))
    }

    async fn update_plant(&self, p: &Plant) -> Result<bool, DataStoreError> {
        in_transaction!(self, |tx| plant::update(&mut tx, p))
    }

    async fn delete_plant(&self, owner: UserId, id: PlantId) -> Result<bool, DataStoreError> {
        in_transaction!(self, |tx| plant::delete(&mut tx, owner, id))
    }

    async fn list_overdue_plants(
        &self,
        task: CareTask,
        now: DateTime<Utc>,
    ) -> Result<Vec<Plant>, DataStoreError> {
        in_transaction!(self, |tx| plant::list_overdue(&mut tx, task, now))
    }

    async fn append_activity(&self, a: &Activity) -> Result<(), DataStoreError> {
        in_transaction!(self, |tx| activity::append(&mut tx, a))
    }

    async fn list_activities(
        &self,
        owner: UserId,
        filter: &ActivityFilter,
    ) -> Result<Vec<Activity>, DataStoreError> {
        in_transaction!(self, |tx| activity::list(&mut tx, owner, filter))
    }

    async fn activity_exists_since(
        &self,
        p: PlantId,
        kind: ActivityType,
        since: DateTime<Utc>,
    ) -> Result<bool, DataStoreError> {
        in_transaction!(self, |tx| activity::exists_since(&mut tx, p, kind, since))
    }
}
