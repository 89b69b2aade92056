use std::sync::Arc;

use argon2::Params;
use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};

use plantcare::{
    ActivityListItem, ActivityType, AppState, AuthResponse, AuthService, Clock, InMemoryDataStore,
    ManualClock, OverdueSweep, Plant, Summary, create_router,
};

/// A server over a fresh in-memory store, plus handles to drive it.
struct Harness {
    server: TestServer,
    store: Arc<InMemoryDataStore>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryDataStore::new());
        let clock = Arc::new(ManualClock::default());
        let auth = AuthService::new(b"integration-test-secret", Duration::days(7))
            .with_hash_params(Params::new(8, 1, 1, None).unwrap());
        let state = AppState::new(store.clone(), Arc::new(auth), clock.clone());
        let server = TestServer::new(create_router(state)).unwrap();
        Harness {
            server,
            store,
            clock,
        }
    }

    fn sweep(&self) -> OverdueSweep {
        OverdueSweep::new(self.store.clone(), self.clock.clone())
    }

    async fn register(&self, name: &str, email: &str) -> AuthResponse {
        let response = self
            .server
            .post("/api/register")
            .json(&json!({"name": name, "email": email, "password": "s3cret-pass"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    async fn create_plant(&self, token: &str, body: Value) -> Plant {
        let response = self
            .server
            .post("/api/plants")
            .authorization_bearer(token)
            .json(&body)
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    async fn summary(&self, token: &str) -> Summary {
        let response = self
            .server
            .get("/api/summary")
            .authorization_bearer(token)
            .await;
        response.assert_status_ok();
        response.json()
    }

    async fn activities(&self, token: &str, kind: Option<&str>) -> Vec<ActivityListItem> {
        let mut request = self.server.get("/api/activities").authorization_bearer(token);
        if let Some(kind) = kind {
            request = request.add_query_param("type", kind);
        }
        let response = request.await;
        response.assert_status_ok();
        response.json()
    }
}

fn days_ago(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

#[tokio::test]
async fn register_create_and_water() {
    let h = Harness::new();
    let account = h.register("Fern", "fern@example.com").await;
    assert_eq!(account.user.name, "Fern");

    let plant = h
        .create_plant(
            &account.token,
            json!({
                "name": "Monstera",
                "species": "Monstera deliciosa",
                "wateringFrequencyDays": 5,
            }),
        )
        .await;
    let now = h.clock.now();
    assert_eq!(plant.next_watering_date, now + Duration::days(5));
    assert_eq!(plant.next_fertilizing_date, now + Duration::days(30));
    assert_eq!(plant.last_watered_date, None);

    h.clock.advance(Duration::days(2));
    let response = h
        .server
        .post(&format!("/api/plants/{}/water", plant.id))
        .authorization_bearer(&account.token)
        .await;
    response.assert_status_ok();
    let watered: Plant = response.json();
    let later = h.clock.now();
    assert_eq!(watered.last_watered_date, Some(later));
    assert_eq!(watered.next_watering_date, later + Duration::days(5));
    assert_eq!(watered.next_fertilizing_date, plant.next_fertilizing_date);

    let log = h.activities(&account.token, None).await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].activity.kind, ActivityType::Watered);
    assert_eq!(log[0].plant_name.as_deref(), Some("Monstera"));
}

#[tokio::test]
async fn login_returns_a_working_token() {
    let h = Harness::new();
    h.register("Ash", "ash@example.com").await;

    let bad = h
        .server
        .post("/api/login")
        .json(&json!({"email": "ash@example.com", "password": "wrong"}))
        .await;
    bad.assert_status(StatusCode::UNAUTHORIZED);

    let good = h
        .server
        .post("/api/login")
        .json(&json!({"email": "ASH@example.com ", "password": "s3cret-pass"}))
        .await;
    good.assert_status_ok();
    let session: AuthResponse = good.json();

    let plants = h
        .server
        .get("/api/plants")
        .authorization_bearer(&session.token)
        .await;
    plants.assert_status_ok();
    assert!(plants.json::<Vec<Plant>>().is_empty());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let h = Harness::new();
    h.register("Rowan", "rowan@example.com").await;
    let again = h
        .server
        .post("/api/register")
        .json(&json!({"name": "Rowan Two", "email": " Rowan@Example.com", "password": "x"}))
        .await;
    again.assert_status(StatusCode::CONFLICT);
    assert_eq!(h.store.user_count(), 1);
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let h = Harness::new();
    h.server
        .get("/api/plants")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .get("/api/summary")
        .authorization_bearer("not-a-token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn plants_are_private_to_their_owner() {
    let h = Harness::new();
    let alice = h.register("Alice", "alice@example.com").await;
    let bob = h.register("Bob", "bob@example.com").await;
    let plant = h.create_plant(&alice.token, json!({"name": "Aloe"})).await;
    let path = format!("/api/plants/{}", plant.id);

    h.server
        .get(&path)
        .authorization_bearer(&bob.token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .put(&path)
        .authorization_bearer(&bob.token)
        .json(&json!({"name": "Mine now"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .post(&format!("{}/water", path))
        .authorization_bearer(&bob.token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .delete(&path)
        .authorization_bearer(&bob.token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let listed: Vec<Plant> = h
        .server
        .get("/api/plants")
        .authorization_bearer(&bob.token)
        .await
        .json();
    assert!(listed.is_empty());
    assert_eq!(h.store.activity_count(), 0);

    let still_there: Plant = h
        .server
        .get(&path)
        .authorization_bearer(&alice.token)
        .await
        .json();
    assert_eq!(still_there.name, "Aloe");
}

#[tokio::test]
async fn update_rederives_and_delete_keeps_history() {
    let h = Harness::new();
    let user = h.register("Ivy", "ivy@example.com").await;
    let now = h.clock.now();
    let plant = h
        .create_plant(
            &user.token,
            json!({"name": "Ivy", "lastWateredDate": days_ago(now, 1), "notes": "north window"}),
        )
        .await;
    let path = format!("/api/plants/{}", plant.id);

    let updated: Plant = h
        .server
        .put(&path)
        .authorization_bearer(&user.token)
        .json(&json!({"wateringFrequencyDays": 2, "notes": null}))
        .await
        .json();
    assert_eq!(updated.next_watering_date, days_ago(now, 1) + Duration::days(2));
    assert_eq!(updated.notes, None);
    assert_eq!(updated.created_at, plant.created_at);

    h.server
        .post(&format!("{}/fertilize", path))
        .authorization_bearer(&user.token)
        .await
        .assert_status_ok();
    h.server
        .delete(&path)
        .authorization_bearer(&user.token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    h.server
        .get(&path)
        .authorization_bearer(&user.token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let log = h.activities(&user.token, Some("fertilized")).await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].plant_name, None);
}

#[tokio::test]
async fn sweep_logs_each_overdue_task_once_per_day() {
    let h = Harness::new();
    let user = h.register("Basil", "basil@example.com").await;
    let now = h.clock.now();
    h.create_plant(
        &user.token,
        json!({"name": "Thirsty", "lastWateredDate": days_ago(now, 10)}),
    )
    .await;
    h.create_plant(&user.token, json!({"name": "Fine"})).await;

    let first = h.sweep().tick().await.unwrap();
    assert_eq!(first.overdue_watering, 1);
    assert_eq!(first.overdue_fertilizing, 0);

    h.clock.advance(Duration::minutes(1));
    assert_eq!(h.sweep().tick().await.unwrap().total(), 0);

    h.clock.advance(Duration::days(1));
    assert_eq!(h.sweep().tick().await.unwrap().overdue_watering, 1);

    let overdue = h.activities(&user.token, Some("overdue_watering")).await;
    assert_eq!(overdue.len(), 2);
    assert!(overdue.iter().all(|item| item.plant_name.as_deref() == Some("Thirsty")));
    assert!(overdue[0].activity.date > overdue[1].activity.date);
}

#[tokio::test]
async fn summary_tracks_overdue_and_completed_tasks() {
    let h = Harness::new();
    let user = h.register("Sorrel", "sorrel@example.com").await;
    let now = h.clock.now();
    let plant = h
        .create_plant(
            &user.token,
            json!({
                "name": "Lemon tree",
                "lastWateredDate": days_ago(now, 8),
                "lastFertilizedDate": days_ago(now, 40),
            }),
        )
        .await;
    h.create_plant(&user.token, json!({"name": "Cactus", "wateringFrequencyDays": 21}))
        .await;

    assert_eq!(
        h.summary(&user.token).await,
        Summary {
            total_plants: 2,
            overdue_tasks: 2,
            completed_tasks: 0,
        }
    );

    h.server
        .post(&format!("/api/plants/{}/water", plant.id))
        .authorization_bearer(&user.token)
        .await
        .assert_status_ok();
    h.sweep().tick().await.unwrap();

    assert_eq!(
        h.summary(&user.token).await,
        Summary {
            total_plants: 2,
            overdue_tasks: 1,
            completed_tasks: 1,
        }
    );
}

#[tokio::test]
async fn activity_filters_ignore_empty_and_reject_unknown_values() {
    let h = Harness::new();
    let user = h.register("Yarrow", "yarrow@example.com").await;
    let plant = h.create_plant(&user.token, json!({"name": "Yarrow"})).await;
    h.server
        .post("/api/activities")
        .authorization_bearer(&user.token)
        .json(&json!({"plantId": plant.id, "type": "fertilized", "note": "half strength"}))
        .await
        .assert_status(StatusCode::CREATED);

    let all: Vec<ActivityListItem> = h
        .server
        .get("/api/activities")
        .authorization_bearer(&user.token)
        .add_query_param("type", "")
        .add_query_param("plantId", "")
        .await
        .json();
    assert_eq!(all.len(), 1);

    let unknown: Vec<ActivityListItem> = h
        .server
        .get("/api/activities")
        .authorization_bearer(&user.token)
        .add_query_param("type", "sang_to")
        .await
        .json();
    assert!(unknown.is_empty());

    let by_plant: Vec<ActivityListItem> = h
        .server
        .get("/api/activities")
        .authorization_bearer(&user.token)
        .add_query_param("plantId", plant.id)
        .await
        .json();
    assert_eq!(by_plant[0].activity.note.as_deref(), Some("half strength"));
}
