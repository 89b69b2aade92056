use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActivityId, ApiError, ApiJson, AppState, AuthUser, Clock, DataStore, PlantId, UserId};

/// The kind of care event an [`Activity`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Watered,
    Fertilized,
    OverdueWatering,
    OverdueFertilizing,
}

impl ActivityType {
    /// Every activity type, in declaration order.
    pub const ALL: [ActivityType; 4] = [
        ActivityType::Watered,
        ActivityType::Fertilized,
        ActivityType::OverdueWatering,
        ActivityType::OverdueFertilizing,
    ];

    /// The wire and storage tag.
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Watered => "watered",
            ActivityType::Fertilized => "fertilized",
            ActivityType::OverdueWatering => "overdue_watering",
            ActivityType::OverdueFertilizing => "overdue_fertilizing",
        }
    }

    /// Whether this records care actually given, as opposed to a sweep flag.
    pub fn is_completion(self) -> bool {
        matches!(self, ActivityType::Watered | ActivityType::Fertilized)
    }
}

impl Display for ActivityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown activity type: {}", s))
    }
}

/// One entry of the append-only care log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub owner: UserId,
    pub plant: PlantId,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Activity {
    /// Creates an activity with a fresh id.
    pub fn new(
        owner: UserId,
        plant: PlantId,
        kind: ActivityType,
        date: DateTime<Utc>,
        note: Option<String>,
    ) -> Self {
        Activity {
            id: ActivityId::generate(),
            owner,
            plant,
            kind,
            date,
            note,
        }
    }
}

/// Narrows an activity listing.  `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub plant: Option<PlantId>,
    pub kind: Option<ActivityType>,
}

impl ActivityFilter {
    /// Whether `activity` passes the filter.
    pub fn matches(&self, activity: &Activity) -> bool {
        self.plant.is_none_or(|plant| plant == activity.plant)
            && self.kind.is_none_or(|kind| kind == activity.kind)
    }
}

/// Body of `POST /activities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    #[serde(alias = "plantId")]
    pub plant: PlantId,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// An activity as listed, with the plant's current name (null once the plant
/// has been deleted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityListItem {
    #[serde(flatten)]
    pub activity: Activity,
    pub plant_name: Option<String>,
}

/// Query string of `GET /activities`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ActivityQuery {
    /// Converts the raw query into a filter.
    ///
    /// Empty values count as absent.  A value that cannot match anything
    /// yields `None`, meaning the listing is empty.
    pub fn to_filter(&self) -> Option<ActivityFilter> {
        let mut filter = ActivityFilter::default();
        if let Some(raw) = self.plant_id.as_deref().filter(|s| !s.is_empty()) {
            filter.plant = Some(raw.parse().ok()?);
        }
        if let Some(raw) = self.kind.as_deref().filter(|s| !s.is_empty()) {
            filter.kind = Some(raw.parse().ok()?);
        }
        Some(filter)
    }
}

//////////////////////////////////////////// Log operations ////////////////////////////////////////////

/// Lists `owner`'s activities, newest first, each with its plant's name.
pub async fn list_activities(
    store: &dyn DataStore,
    owner: UserId,
    filter: &ActivityFilter,
) -> Result<Vec<ActivityListItem>, ApiError> {
    let activities = store.list_activities(owner, filter).await?;
    let names: HashMap<PlantId, String> = store
        .list_plants(owner)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    Ok(activities
        .into_iter()
        .map(|activity| ActivityListItem {
            plant_name: names.get(&activity.plant).cloned(),
            activity,
        })
        .collect())
}

/// Appends an activity for `owner`.  The plant is not checked.
pub async fn append_activity(
    store: &dyn DataStore,
    clock: &dyn Clock,
    owner: UserId,
    request: NewActivity,
) -> Result<Activity, ApiError> {
    let date = request.date.unwrap_or_else(|| clock.now());
    let activity = Activity::new(owner, request.plant, request.kind, date, request.note);
    store.append_activity(&activity).await?;
    Ok(activity)
}

async fn list_activities_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityListItem>>, ApiError> {
    let Some(filter) = query.to_filter() else {
        return Ok(Json(Vec::new()));
    };
    list_activities(state.store.as_ref(), owner, &filter)
        .await
        .map(Json)
}

async fn append_activity_handler(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiJson(request): ApiJson<NewActivity>,
) -> Result<(StatusCode, Json<Activity>), ApiError> {
    let activity =
        append_activity(state.store.as_ref(), state.clock.as_ref(), owner, request).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

/// Creates an Axum router with the activity log endpoints.
pub fn create_activity_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/activities",
            get(list_activities_handler).post(append_activity_handler),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Plant;
    use crate::test_utils::test_helpers::{register_token, test_server};

    #[test]
    fn type_tags() {
        for kind in ActivityType::ALL {
            assert_eq!(kind.to_string().parse::<ActivityType>(), Ok(kind));
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.to_string())
            );
        }
        assert!("dusted".parse::<ActivityType>().is_err());
    }

    #[test]
    fn query_filters() {
        let plant = PlantId::generate();
        let query = ActivityQuery {
            plant_id: Some(plant.to_string()),
            kind: Some(String::new()),
        };
        assert_eq!(
            query.to_filter(),
            Some(ActivityFilter {
                plant: Some(plant),
                kind: None,
            })
        );

        let bad = ActivityQuery {
            plant_id: None,
            kind: Some("dusted".to_string()),
        };
        assert_eq!(bad.to_filter(), None);
    }

    #[test]
    fn new_activity_accepts_plant_id_alias() {
        let plant = PlantId::generate();
        let body = format!(r#"{{"plantId":"{}","type":"watered"}}"#, plant);
        let request: NewActivity = serde_json::from_str(&body).unwrap();
        assert_eq!(request.plant, plant);
        assert_eq!(request.kind, ActivityType::Watered);
        assert!(request.date.is_none());
    }

    #[test]
    fn list_item_flattens() {
        let activity = Activity::new(
            UserId::generate(),
            PlantId::generate(),
            ActivityType::OverdueWatering,
            Utc::now(),
            None,
        );
        let item = ActivityListItem {
            activity,
            plant_name: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "overdue_watering");
        assert!(json["plantName"].is_null());
        assert!(json.get("note").is_none());
    }

    #[tokio::test]
    async fn append_defaults_date_and_lists_plant_names() {
        let (server, _store, clock) = test_server();
        let token = register_token(&server, "sage@example.com").await;
        let plant: Plant = server
            .post("/api/plants")
            .authorization_bearer(&token)
            .json(&serde_json::json!({"name": "Sage"}))
            .await
            .json();

        let created = server
            .post("/api/activities")
            .authorization_bearer(&token)
            .json(&serde_json::json!({
                "plant": plant.id,
                "type": "fertilized",
                "note": "half dose",
            }))
            .await;
        created.assert_status(StatusCode::CREATED);
        let created: Activity = created.json();
        assert_eq!(created.date, clock.now());

        let orphan = PlantId::generate();
        server
            .post("/api/activities")
            .authorization_bearer(&token)
            .json(&serde_json::json!({"plantId": orphan, "type": "watered"}))
            .await
            .assert_status(StatusCode::CREATED);

        let listed: Vec<ActivityListItem> = server
            .get("/api/activities")
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(listed.len(), 2);
        let named = listed.iter().find(|i| i.activity.plant == plant.id).unwrap();
        assert_eq!(named.plant_name.as_deref(), Some("Sage"));
        let orphaned = listed.iter().find(|i| i.activity.plant == orphan).unwrap();
        assert_eq!(orphaned.plant_name, None);
    }

    #[tokio::test]
    async fn unknown_type_filter_lists_nothing() {
        let (server, _store, _clock) = test_server();
        let token = register_token(&server, "yew@example.com").await;
        server
            .post("/api/activities")
            .authorization_bearer(&token)
            .json(&serde_json::json!({"plant": PlantId::generate(), "type": "watered"}))
            .await
            .assert_status(StatusCode::CREATED);

        let listed: Vec<ActivityListItem> = server
            .get("/api/activities")
            .add_query_param("type", "dusted")
            .authorization_bearer(&token)
            .await
            .json();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn bad_activity_type_is_rejected() {
        let (server, _store, _clock) = test_server();
        let token = register_token(&server, "oak@example.com").await;
        server
            .post("/api/activities")
            .authorization_bearer(&token)
            .json(&serde_json::json!({"plant": PlantId::generate(), "type": "dusted"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
