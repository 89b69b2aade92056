//! Plant operations for PostgreSQL database.
//!
//! Every statement that reads or writes a single plant is filtered by owner
//! as well as id, so a plant owned by another user is indistinguishable from
//! a missing one.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::SqlResult;
use crate::{CareTask, DataStoreError, Plant, PlantId, UserId};

#[derive(Debug, FromRow)]
struct PlantRow {
    plant_id: Uuid,
    owner_id: Uuid,
    name: String,
    species: Option<String>,
    watering_frequency_days: i32,
    fertilizing_frequency_days: i32,
    last_watered_date: Option<DateTime<Utc>>,
    last_fertilized_date: Option<DateTime<Utc>>,
    next_watering_date: DateTime<Utc>,
    next_fertilizing_date: DateTime<Utc>,
    image: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn frequency(plant: Uuid, days: i32) -> Result<u32, DataStoreError> {
    u32::try_from(days)
        .map_err(|_| DataStoreError::Corrupt(format!("negative frequency on plant {}", plant)))
}

impl TryFrom<PlantRow> for Plant {
    type Error = DataStoreError;

    fn try_from(row: PlantRow) -> Result<Self, Self::Error> {
        Ok(Plant {
            id: PlantId::new(row.plant_id),
            owner: UserId::new(row.owner_id),
            watering_frequency_days: frequency(row.plant_id, row.watering_frequency_days)?,
            fertilizing_frequency_days: frequency(row.plant_id, row.fertilizing_frequency_days)?,
            name: row.name,
            species: row.species,
            last_watered_date: row.last_watered_date,
            last_fertilized_date: row.last_fertilized_date,
            next_watering_date: row.next_watering_date,
            next_fertilizing_date: row.next_fertilizing_date,
            image: row.image,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_to_plants(rows: Vec<PlantRow>) -> SqlResult<Vec<Plant>> {
    rows.into_iter().map(Plant::try_from).collect()
}

fn days(value: u32) -> SqlResult<i32> {
    i32::try_from(value).map_err(|_| DataStoreError::Internal("frequency out of range".to_string()))
}

const SELECT_PLANT: &str = r#"
    SELECT plant_id, owner_id, name, species,
           watering_frequency_days, fertilizing_frequency_days,
           last_watered_date, last_fertilized_date,
           next_watering_date, next_fertilizing_date,
           image, notes, created_at, updated_at
    FROM plants
"#;

/// Inserts a plant.
pub async fn create(tx: &mut Transaction<'_, Postgres>, plant: &Plant) -> SqlResult<()> {
    sqlx::query(
        r#"
        INSERT INTO plants (
            plant_id, owner_id, name, species,
            watering_frequency_days, fertilizing_frequency_days,
            last_watered_date, last_fertilized_date,
            next_watering_date, next_fertilizing_date,
            image, notes, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(plant.id.as_uuid())
    .bind(plant.owner.as_uuid())
    .bind(&plant.name)
    .bind(&plant.species)
    .bind(days(plant.watering_frequency_days)?)
    .bind(days(plant.fertilizing_frequency_days)?)
    .bind(plant.last_watered_date)
    .bind(plant.last_fertilized_date)
    .bind(plant.next_watering_date)
    .bind(plant.next_fertilizing_date)
    .bind(&plant.image)
    .bind(&plant.notes)
    .bind(plant.created_at)
    .bind(plant.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Retrieves a plant belonging to `owner`.
pub async fn get(
    tx: &mut Transaction<'_, Postgres>,
    owner: UserId,
    id: PlantId,
) -> SqlResult<Option<Plant>> {
    let row: Option<PlantRow> = sqlx::query_as(&format!(
        "{} WHERE plant_id = $1 AND owner_id = $2",
        SELECT_PLANT
    ))
    .bind(id.as_uuid())
    .bind(owner.as_uuid())
    .fetch_optional(&mut **tx)
    .await?;
    row.map(Plant::try_from).transpose()
}

/// Lists `owner`'s plants, newest-created first.  Plants created at the same
/// instant come back in reverse insertion order.
pub async fn list(tx: &mut Transaction<'_, Postgres>, owner: UserId) -> SqlResult<Vec<Plant>> {
    let rows: Vec<PlantRow> = sqlx::query_as(&format!(
        "{} WHERE owner_id = $1 ORDER BY created_at DESC, seq DESC",
        SELECT_PLANT
    ))
    .bind(owner.as_uuid())
    .fetch_all(&mut **tx)
    .await?;
    rows_to_plants(rows)
}

/// Replaces every mutable column of a plant matched by id and owner.
///
/// # Returns
/// * `Ok(true)` - Plant updated
/// * `Ok(false)` - No such plant for this owner
pub async fn update(tx: &mut Transaction<'_, Postgres>, plant: &Plant) -> SqlResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE plants
        SET name = $3,
            species = $4,
            watering_frequency_days = $5,
            fertilizing_frequency_days = $6,
            last_watered_date = $7,
            last_fertilized_date = $8,
            next_watering_date = $9,
            next_fertilizing_date = $10,
            image = $11,
            notes = $12,
            updated_at = $13
        WHERE plant_id = $1 AND owner_id = $2
        "#,
    )
    .bind(plant.id.as_uuid())
    .bind(plant.owner.as_uuid())
    .bind(&plant.name)
    .bind(&plant.species)
    .bind(days(plant.watering_frequency_days)?)
    .bind(days(plant.fertilizing_frequency_days)?)
    .bind(plant.last_watered_date)
    .bind(plant.last_fertilized_date)
    .bind(plant.next_watering_date)
    .bind(plant.next_fertilizing_date)
    .bind(&plant.image)
    .bind(&plant.notes)
    .bind(plant.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes a plant matched by id and owner.
pub async fn delete(
    tx: &mut Transaction<'_, Postgres>,
    owner: UserId,
    id: PlantId,
) -> SqlResult<bool> {
    let result = sqlx::query("DELETE FROM plants WHERE plant_id = $1 AND owner_id = $2")
        .bind(id.as_uuid())
        .bind(owner.as_uuid())
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Lists plants of all users whose next `task` date precedes `now`.
pub async fn list_overdue(
    tx: &mut Transaction<'_, Postgres>,
    task: CareTask,
    now: DateTime<Utc>,
) -> SqlResult<Vec<Plant>> {
    let column = match task {
        CareTask::Watering => "next_watering_date",
        CareTask::Fertilizing => "next_fertilizing_date",
    };
    let rows: Vec<PlantRow> = sqlx::query_as(&format!("{} WHERE {} < $1", SELECT_PLANT, column))
        .bind(now)
        .fetch_all(&mut **tx)
        .await?;
    rows_to_plants(rows)
}
