use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    Activity, ActivityType, ApiError, ApiJson, AppState, AuthUser, Clock, DataStore, PlantId,
    UserId,
};

/// Watering interval applied when a plant is created without one.
pub const DEFAULT_WATERING_FREQUENCY_DAYS: u32 = 7;
/// Fertilizing interval applied when a plant is created without one.
pub const DEFAULT_FERTILIZING_FREQUENCY_DAYS: u32 = 30;
/// Upper bound on either interval (ten years).
pub const MAX_FREQUENCY_DAYS: u32 = 3650;

////////////////////////////////////////////// CareTask //////////////////////////////////////////////

/// One of the two recurring care actions a plant is scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CareTask {
    Watering,
    Fertilizing,
}

impl CareTask {
    /// Both tasks, watering first.
    pub const ALL: [CareTask; 2] = [CareTask::Watering, CareTask::Fertilizing];

    /// The activity logged when the task is marked done.
    pub fn done_activity(self) -> ActivityType {
        match self {
            CareTask::Watering => ActivityType::Watered,
            CareTask::Fertilizing => ActivityType::Fertilized,
        }
    }

    /// The activity logged when the sweep finds the task overdue.
    pub fn overdue_activity(self) -> ActivityType {
        match self {
            CareTask::Watering => ActivityType::OverdueWatering,
            CareTask::Fertilizing => ActivityType::OverdueFertilizing,
        }
    }

    /// Note attached to manual "mark done" activities.
    pub fn done_note(self) -> &'static str {
        match self {
            CareTask::Watering => "Marked as watered",
            CareTask::Fertilizing => "Marked as fertilized",
        }
    }

    /// JSON name of the last-done field, used in validation messages.
    pub fn last_field(self) -> &'static str {
        match self {
            CareTask::Watering => "lastWateredDate",
            CareTask::Fertilizing => "lastFertilizedDate",
        }
    }

    /// Note attached to sweep-generated activities.
    pub fn overdue_note(self) -> &'static str {
        match self {
            CareTask::Watering => "Auto detected overdue watering",
            CareTask::Fertilizing => "Auto detected overdue fertilizing",
        }
    }
}

impl std::fmt::Display for CareTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CareTask::Watering => write!(f, "watering"),
            CareTask::Fertilizing => write!(f, "fertilizing"),
        }
    }
}

/////////////////////////////////////////////// Plant /////////////////////////////////////////////////

/// A plant and its care schedule.
///
/// `next_watering_date` and `next_fertilizing_date` are derived: each equals
/// the matching last date plus its interval, or the derivation time plus the
/// interval when the plant has never received that care.  See [`next_due`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: PlantId,
    pub owner: UserId,
    pub name: String,
    pub species: Option<String>,
    pub watering_frequency_days: u32,
    pub fertilizing_frequency_days: u32,
    pub last_watered_date: Option<DateTime<Utc>>,
    pub last_fertilized_date: Option<DateTime<Utc>>,
    pub next_watering_date: DateTime<Utc>,
    pub next_fertilizing_date: DateTime<Utc>,
    /// Opaque image payload: a data URL or a link.
    pub image: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Computes the next due date: `last + frequency`, or `now + frequency` when
/// the task has never been done.  `None` when the result falls outside the
/// representable date range.
pub fn next_due(
    last: Option<DateTime<Utc>>,
    frequency_days: u32,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    last.unwrap_or(now)
        .checked_add_signed(Duration::days(i64::from(frequency_days)))
}

fn derive_next(
    task: CareTask,
    last: Option<DateTime<Utc>>,
    frequency_days: u32,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ApiError> {
    next_due(last, frequency_days, now)
        .ok_or_else(|| ApiError::Validation(format!("{} is out of range", task.last_field())))
}

impl Plant {
    /// Interval in days for `task`.
    pub fn frequency_days(&self, task: CareTask) -> u32 {
        match task {
            CareTask::Watering => self.watering_frequency_days,
            CareTask::Fertilizing => self.fertilizing_frequency_days,
        }
    }

    /// When `task` was last done, if ever.
    pub fn last_done(&self, task: CareTask) -> Option<DateTime<Utc>> {
        match task {
            CareTask::Watering => self.last_watered_date,
            CareTask::Fertilizing => self.last_fertilized_date,
        }
    }

    /// When `task` is next due.
    pub fn next_due(&self, task: CareTask) -> DateTime<Utc> {
        match task {
            CareTask::Watering => self.next_watering_date,
            CareTask::Fertilizing => self.next_fertilizing_date,
        }
    }

    /// Whether `task` was due strictly before `now`.
    pub fn is_overdue(&self, task: CareTask, now: DateTime<Utc>) -> bool {
        self.next_due(task) < now
    }

    /// Re-derives the next date of `task` from its last date and interval.
    pub fn rederive(&mut self, task: CareTask, now: DateTime<Utc>) -> Result<(), ApiError> {
        let next = derive_next(task, self.last_done(task), self.frequency_days(task), now)?;
        match task {
            CareTask::Watering => self.next_watering_date = next,
            CareTask::Fertilizing => self.next_fertilizing_date = next,
        }
        Ok(())
    }

    /// Re-derives both next dates.
    pub fn rederive_all(&mut self, now: DateTime<Utc>) -> Result<(), ApiError> {
        for task in CareTask::ALL {
            self.rederive(task, now)?;
        }
        Ok(())
    }

    /// Records `task` as done at `now`; only that task's next date moves.
    pub fn mark_done(&mut self, task: CareTask, now: DateTime<Utc>) -> Result<(), ApiError> {
        match task {
            CareTask::Watering => self.last_watered_date = Some(now),
            CareTask::Fertilizing => self.last_fertilized_date = Some(now),
        }
        self.rederive(task, now)?;
        self.updated_at = now;
        Ok(())
    }
}

////////////////////////////////////////// Request bodies /////////////////////////////////////////////

/// Body of `POST /plants`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watering_frequency_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fertilizing_frequency_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_watered_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fertilized_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewPlant {
    /// A plant with only a name; everything else defaults.
    pub fn named(name: impl Into<String>) -> Self {
        NewPlant {
            name: name.into(),
            ..NewPlant::default()
        }
    }

    /// Validates the request and builds the plant owned by `owner`, deriving
    /// both next dates relative to `now`.
    pub fn into_plant(self, owner: UserId, now: DateTime<Utc>) -> Result<Plant, ApiError> {
        let name = validate_name(&self.name)?;
        let watering = validate_frequency(
            "wateringFrequencyDays",
            self.watering_frequency_days
                .unwrap_or(DEFAULT_WATERING_FREQUENCY_DAYS),
        )?;
        let fertilizing = validate_frequency(
            "fertilizingFrequencyDays",
            self.fertilizing_frequency_days
                .unwrap_or(DEFAULT_FERTILIZING_FREQUENCY_DAYS),
        )?;
        let next_watering_date =
            derive_next(CareTask::Watering, self.last_watered_date, watering, now)?;
        let next_fertilizing_date =
            derive_next(CareTask::Fertilizing, self.last_fertilized_date, fertilizing, now)?;
        Ok(Plant {
            id: PlantId::generate(),
            owner,
            name,
            species: non_blank(self.species),
            watering_frequency_days: watering,
            fertilizing_frequency_days: fertilizing,
            last_watered_date: self.last_watered_date,
            last_fertilized_date: self.last_fertilized_date,
            next_watering_date,
            next_fertilizing_date,
            image: non_blank(self.image),
            notes: non_blank(self.notes),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Body of `PUT /plants/:id`.
///
/// Absent fields are left untouched.  For nullable fields an explicit `null`
/// clears the stored value, which is why those are `Option<Option<_>>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub species: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watering_frequency_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fertilizing_frequency_days: Option<u32>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_watered_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_fertilized_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
}

impl PlantUpdate {
    /// Merges the supplied fields into `plant`, then re-derives both next
    /// dates whether or not anything schedule-related changed.
    pub fn apply(self, plant: &mut Plant, now: DateTime<Utc>) -> Result<(), ApiError> {
        if let Some(name) = self.name {
            plant.name = validate_name(&name)?;
        }
        if let Some(days) = self.watering_frequency_days {
            plant.watering_frequency_days = validate_frequency("wateringFrequencyDays", days)?;
        }
        if let Some(days) = self.fertilizing_frequency_days {
            plant.fertilizing_frequency_days =
                validate_frequency("fertilizingFrequencyDays", days)?;
        }
        if let Some(species) = self.species {
            plant.species = non_blank(species);
        }
        if let Some(last) = self.last_watered_date {
            plant.last_watered_date = last;
        }
        if let Some(last) = self.last_fertilized_date {
            plant.last_fertilized_date = last;
        }
        if let Some(image) = self.image {
            plant.image = non_blank(image);
        }
        if let Some(notes) = self.notes {
            plant.notes = non_blank(notes);
        }
        plant.rederive_all(now)?;
        plant.updated_at = now;
        Ok(())
    }
}

fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_name(name: &str) -> Result<String, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("plant name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_frequency(field: &str, days: u32) -> Result<u32, ApiError> {
    if days == 0 || days > MAX_FREQUENCY_DAYS {
        return Err(ApiError::Validation(format!(
            "{} must be between 1 and {}",
            field, MAX_FREQUENCY_DAYS
        )));
    }
    Ok(days)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

///////////////////////////////////////// Registry operations /////////////////////////////////////////

/// Lists `owner`'s plants, newest first.
pub async fn list_plants(store: &dyn DataStore, owner: UserId) -> Result<Vec<Plant>, ApiError> {
    Ok(store.list_plants(owner).await?)
}

/// Fetches one of `owner`'s plants.
pub async fn get_plant(
    store: &dyn DataStore,
    owner: UserId,
    id: PlantId,
) -> Result<Plant, ApiError> {
    store
        .get_plant(owner, id)
        .await?
        .ok_or_else(ApiError::plant_not_found)
}

/// Creates a plant for `owner`.
pub async fn create_plant(
    store: &dyn DataStore,
    clock: &dyn Clock,
    owner: UserId,
    request: NewPlant,
) -> Result<Plant, ApiError> {
    let plant = request.into_plant(owner, clock.now())?;
    store.create_plant(&plant).await?;
    tracing::info!(plant = %plant.id, owner = %owner, "plant created");
    Ok(plant)
}

/// Applies a partial update to one of `owner`'s plants.
pub async fn update_plant(
    store: &dyn DataStore,
    clock: &dyn Clock,
    owner: UserId,
    id: PlantId,
    update: PlantUpdate,
) -> Result<Plant, ApiError> {
    let mut plant = get_plant(store, owner, id).await?;
    update.apply(&mut plant, clock.now())?;
    if !store.update_plant(&plant).await? {
        return Err(ApiError::plant_not_found());
    }
    Ok(plant)
}

/// Deletes one of `owner`'s plants.  Its activities are kept.
pub async fn delete_plant(
    store: &dyn DataStore,
    owner: UserId,
    id: PlantId,
) -> Result<(), ApiError> {
    if !store.delete_plant(owner, id).await? {
        return Err(ApiError::plant_not_found());
    }
    tracing::info!(plant = %id, owner = %owner, "plant deleted");
    Ok(())
}

/// Marks `task` done now on one of `owner`'s plants and logs it.
pub async fn mark_done(
    store: &dyn DataStore,
    clock: &dyn Clock,
    owner: UserId,
    id: PlantId,
    task: CareTask,
) -> Result<Plant, ApiError> {
    let now = clock.now();
    let mut plant = get_plant(store, owner, id).await?;
    plant.mark_done(task, now)?;
    if !store.update_plant(&plant).await? {
        return Err(ApiError::plant_not_found());
    }
    let activity = Activity::new(
        owner,
        plant.id,
        task.done_activity(),
        now,
        Some(task.done_note().to_string()),
    );
    store.append_activity(&activity).await?;
    Ok(plant)
}

fn parse_plant_id(raw: &str) -> Result<PlantId, ApiError> {
    // A malformed id cannot name an existing plant.
    raw.parse().map_err(|_| ApiError::plant_not_found())
}

////////////////////////////////////////////// Routes //////////////////////////////////////////////////

async fn list_plants_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> Result<Json<Vec<Plant>>, ApiError> {
    list_plants(state.store.as_ref(), owner).await.map(Json)
}

async fn get_plant_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Plant>, ApiError> {
    let id = parse_plant_id(&id)?;
    get_plant(state.store.as_ref(), owner, id).await.map(Json)
}

async fn create_plant_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiJson(request): ApiJson<NewPlant>,
) -> Result<(StatusCode, Json<Plant>), ApiError> {
    let plant = create_plant(state.store.as_ref(), state.clock.as_ref(), owner, request).await?;
    Ok((StatusCode::CREATED, Json(plant)))
}

async fn update_plant_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<PlantUpdate>,
) -> Result<Json<Plant>, ApiError> {
    let id = parse_plant_id(&id)?;
    update_plant(state.store.as_ref(), state.clock.as_ref(), owner, id, update)
        .await
        .map(Json)
}

async fn delete_plant_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_plant_id(&id)?;
    delete_plant(state.store.as_ref(), owner, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn water_plant_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Plant>, ApiError> {
    let id = parse_plant_id(&id)?;
    mark_done(
        state.store.as_ref(),
        state.clock.as_ref(),
        owner,
        id,
        CareTask::Watering,
    )
    .await
    .map(Json)
}

async fn fertilize_plant_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Plant>, ApiError> {
    let id = parse_plant_id(&id)?;
    mark_done(
        state.store.as_ref(),
        state.clock.as_ref(),
        owner,
        id,
        CareTask::Fertilizing,
    )
    .await
    .map(Json)
}

////////////////////////////////////////////// Router //////////////////////////////////////////////////

/// Creates an Axum router with the plant registry endpoints.
pub fn create_plant_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/plants",
            get(list_plants_handler).post(create_plant_handler),
        )
        .route(
            "/plants/:id",
            get(get_plant_handler)
                .put(update_plant_handler)
                .delete(delete_plant_handler),
        )
        .route("/plants/:id/water", post(water_plant_handler))
        .route("/plants/:id/fertilize", post(fertilize_plant_handler))
        .with_state(state)
}
