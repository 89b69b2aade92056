//! Activity log operations for PostgreSQL database.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::SqlResult;
use crate::{Activity, ActivityFilter, ActivityId, ActivityType, DataStoreError, PlantId, UserId};

#[derive(Debug, FromRow)]
struct ActivityRow {
    activity_id: Uuid,
    owner_id: Uuid,
    plant_id: Uuid,
    kind: String,
    date: DateTime<Utc>,
    note: Option<String>,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = DataStoreError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let kind: ActivityType = row.kind.parse().map_err(DataStoreError::Corrupt)?;
        Ok(Activity {
            id: ActivityId::new(row.activity_id),
            owner: UserId::new(row.owner_id),
            plant: PlantId::new(row.plant_id),
            kind,
            date: row.date,
            note: row.note,
        })
    }
}

/// Appends an activity.
pub async fn append(tx: &mut Transaction<'_, Postgres>, activity: &Activity) -> SqlResult<()> {
    sqlx::query(
        r#"
        INSERT INTO activities (activity_id, owner_id, plant_id, kind, date, note)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(activity.id.as_uuid())
    .bind(activity.owner.as_uuid())
    .bind(activity.plant.as_uuid())
    .bind(activity.kind.as_str())
    .bind(activity.date)
    .bind(&activity.note)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Lists `owner`'s activities matching `filter`, newest first.  Entries with
/// equal dates list most recently inserted first.
pub async fn list(
    tx: &mut Transaction<'_, Postgres>,
    owner: UserId,
    filter: &ActivityFilter,
) -> SqlResult<Vec<Activity>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT activity_id, owner_id, plant_id, kind, date, note FROM activities WHERE owner_id = ",
    );
    query.push_bind(owner.as_uuid());
    if let Some(plant) = filter.plant {
        query.push(" AND plant_id = ").push_bind(plant.as_uuid());
    }
    if let Some(kind) = filter.kind {
        query.push(" AND kind = ").push_bind(kind.as_str());
    }
    query.push(" ORDER BY date DESC, seq DESC");

    let rows: Vec<ActivityRow> = query.build_query_as().fetch_all(&mut **tx).await?;
    rows.into_iter().map(Activity::try_from).collect()
}

/// Whether `plant` has a `kind` activity dated at or after `since`.
pub async fn exists_since(
    tx: &mut Transaction<'_, Postgres>,
    plant: PlantId,
    kind: ActivityType,
    since: DateTime<Utc>,
) -> SqlResult<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM activities
            WHERE plant_id = $1 AND kind = $2 AND date >= $3
        )
        "#,
    )
    .bind(plant.as_uuid())
    .bind(kind.as_str())
    .bind(since)
    .fetch_one(&mut **tx)
    .await?;
    Ok(exists)
}
