//! # Data Storage Abstraction
//!
//! This module defines the [`DataStore`] trait that the HTTP layer and the
//! overdue sweep share, plus [`InMemoryDataStore`], a mutex-guarded
//! implementation used for development and tests.  The PostgreSQL backend
//! lives in [`crate::sql`].
//!
//! ## Storage Model
//!
//! ```text
//! User (id, unique email) ──┬── Plant (owner, schedule, derived next dates)
//!                           └── Activity (owner, plant, type, date)
//! ```
//!
//! Activities reference plants by id only.  Deleting a plant leaves its
//! activities in place.
//!
//! ## Usage Examples
//!
//! ```rust
//! use plantcare::{DataStore, InMemoryDataStore};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = InMemoryDataStore::new();
//! assert!(store.find_user_by_email("nobody@example.com").await.unwrap().is_none());
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use axum::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Activity, ActivityFilter, ActivityType, CareTask, DataStoreError, Plant, PlantId, User, UserId,
};

/// Trait defining the storage interface shared by the API and the sweep.
///
/// All plant reads and writes take the owner's [`UserId`]; a plant owned by
/// someone else behaves exactly as a missing one.  The only owner-agnostic
/// queries are [`DataStore::list_overdue_plants`] and
/// [`DataStore::activity_exists_since`], which the sweep uses across all
/// users.
///
/// Implementors must be thread-safe; every operation is a single atomic write
/// or read.
#[async_trait]
pub trait DataStore: Send + Sync {
    // User operations

    /// Stores a new user.
    ///
    /// # Returns
    /// * `Ok(())` - User stored
    /// * `Err(DataStoreError::AlreadyExists)` - The email is already registered
    async fn create_user(&self, user: &User) -> Result<(), DataStoreError>;

    /// Looks a user up by exact email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DataStoreError>;

    /// Looks a user up by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, DataStoreError>;

    // Plant operations

    /// Stores a new plant.
    async fn create_plant(&self, plant: &Plant) -> Result<(), DataStoreError>;

    /// Retrieves a plant if it exists and belongs to `owner`.
    async fn get_plant(&self, owner: UserId, id: PlantId)
    -> Result<Option<Plant>, DataStoreError>;

    /// Lists every plant belonging to `owner`, newest-created first.
    async fn list_plants(&self, owner: UserId) -> Result<Vec<Plant>, DataStoreError>;

    /// Replaces a stored plant, matched by id and owner.
    ///
    /// # Returns
    /// * `Ok(true)` - Plant existed and was replaced
    /// * `Ok(false)` - No plant with that id belongs to the owner
    async fn update_plant(&self, plant: &Plant) -> Result<bool, DataStoreError>;

    /// Deletes a plant, matched by id and owner.
    ///
    /// # Returns
    /// * `Ok(true)` - Plant existed and was deleted
    /// * `Ok(false)` - No plant with that id belongs to the owner
    async fn delete_plant(&self, owner: UserId, id: PlantId) -> Result<bool, DataStoreError>;

    /// Lists plants of every user whose next `task` date is strictly before `now`.
    async fn list_overdue_plants(
        &self,
        task: CareTask,
        now: DateTime<Utc>,
    ) -> Result<Vec<Plant>, DataStoreError>;

    // Activity operations

    /// Appends an activity.  No check is made that the plant exists.
    async fn append_activity(&self, activity: &Activity) -> Result<(), DataStoreError>;

    /// Lists `owner`'s activities matching `filter`, newest event first.
    async fn list_activities(
        &self,
        owner: UserId,
        filter: &ActivityFilter,
    ) -> Result<Vec<Activity>, DataStoreError>;

    /// Reports whether `plant` has an activity of `kind` dated at or after `since`.
    async fn activity_exists_since(
        &self,
        plant: PlantId,
        kind: ActivityType,
        since: DateTime<Utc>,
    ) -> Result<bool, DataStoreError>;
}

/// Thread-safe in-memory implementation of the DataStore trait.
///
/// Users are keyed by id with a secondary email index.  Plants and activities
/// are kept in insertion order so that equal timestamps still list
/// newest-inserted first.
pub struct InMemoryDataStore {
    users: Mutex<Users>,
    plants: Mutex<Vec<Plant>>,
    activities: Mutex<Vec<Activity>>,
}

#[derive(Default)]
struct Users {
    by_id: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
}

impl InMemoryDataStore {
    /// Creates a new empty in-memory data store.
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Users::default()),
            plants: Mutex::new(Vec::new()),
            activities: Mutex::new(Vec::new()),
        }
    }

    /// Number of activities stored across all users.
    pub fn activity_count(&self) -> usize {
        self.activities.lock().unwrap().len()
    }

    /// Number of users stored.
    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().by_id.len()
    }
}

impl Default for InMemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn create_user(&self, user: &User) -> Result<(), DataStoreError> {
        let mut users = self.users.lock().unwrap();
        if users.by_email.contains_key(&user.email) || users.by_id.contains_key(&user.id) {
            return Err(DataStoreError::AlreadyExists);
        }
        users.by_email.insert(user.email.clone(), user.id);
        users.by_id.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DataStoreError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, DataStoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.by_id.get(&id).cloned())
    }

    async fn create_plant(&self, plant: &Plant) -> Result<(), DataStoreError> {
        let mut plants = self.plants.lock().unwrap();
        if plants.iter().any(|p| p.id == plant.id) {
            return Err(DataStoreError::AlreadyExists);
        }
        plants.push(plant.clone());
        Ok(())
    }

    async fn get_plant(
        &self,
        owner: UserId,
        id: PlantId,
    ) -> Result<Option<Plant>, DataStoreError> {
        let plants = self.plants.lock().unwrap();
        Ok(plants
            .iter()
            .find(|p| p.id == id && p.owner == owner)
            .cloned())
    }

    async fn list_plants(&self, owner: UserId) -> Result<Vec<Plant>, DataStoreError> {
        let plants = self.plants.lock().unwrap();
        let mut owned: Vec<Plant> = plants
            .iter()
            .rev()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn update_plant(&self, plant: &Plant) -> Result<bool, DataStoreError> {
        let mut plants = self.plants.lock().unwrap();
        match plants
            .iter_mut()
            .find(|p| p.id == plant.id && p.owner == plant.owner)
        {
            Some(stored) => {
                *stored = plant.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_plant(&self, owner: UserId, id: PlantId) -> Result<bool, DataStoreError> {
        let mut plants = self.plants.lock().unwrap();
        let before = plants.len();
        plants.retain(|p| !(p.id == id && p.owner == owner));
        Ok(plants.len() != before)
    }

    async fn list_overdue_plants(
        &self,
        task: CareTask,
        now: DateTime<Utc>,
    ) -> Result<Vec<Plant>, DataStoreError> {
        let plants = self.plants.lock().unwrap();
        Ok(plants
            .iter()
            .filter(|p| p.is_overdue(task, now))
            .cloned()
            .collect())
    }

    async fn append_activity(&self, activity: &Activity) -> Result<(), DataStoreError> {
        let mut activities = self.activities.lock().unwrap();
        activities.push(activity.clone());
        Ok(())
    }

    async fn list_activities(
        &self,
        owner: UserId,
        filter: &ActivityFilter,
    ) -> Result<Vec<Activity>, DataStoreError> {
        let activities = self.activities.lock().unwrap();
        let mut matching: Vec<Activity> = activities
            .iter()
            .rev()
            .filter(|a| a.owner == owner && filter.matches(a))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(matching)
    }

    async fn activity_exists_since(
        &self,
        plant: PlantId,
        kind: ActivityType,
        since: DateTime<Utc>,
    ) -> Result<bool, DataStoreError> {
        let activities = self.activities.lock().unwrap();
        Ok(activities
            .iter()
            .any(|a| a.plant == plant && a.kind == kind && a.date >= since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::NewPlant;

    fn test_user(email: &str) -> User {
        User {
            id: UserId::generate(),
            name: "Fern Keeper".to_string(),
            age: None,
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            affiliation: None,
            created_at: Utc::now(),
        }
    }

    fn test_plant(owner: UserId, name: &str, created_at: DateTime<Utc>) -> Plant {
        NewPlant::named(name).into_plant(owner, created_at).unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryDataStore::new();
        store.create_user(&test_user("a@example.com")).await.unwrap();
        let err = store
            .create_user(&test_user("a@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err, DataStoreError::AlreadyExists);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn users_found_by_email_and_id() {
        let store = InMemoryDataStore::new();
        let user = test_user("b@example.com");
        store.create_user(&user).await.unwrap();
        assert_eq!(
            store.find_user_by_email("b@example.com").await.unwrap(),
            Some(user.clone())
        );
        assert_eq!(store.get_user(user.id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn plants_are_owner_scoped() {
        let store = InMemoryDataStore::new();
        let alice = UserId::generate();
        let bob = UserId::generate();
        let plant = test_plant(alice, "Monstera", Utc::now());
        store.create_plant(&plant).await.unwrap();

        assert!(store.get_plant(bob, plant.id).await.unwrap().is_none());
        assert!(store.list_plants(bob).await.unwrap().is_empty());
        assert!(!store.delete_plant(bob, plant.id).await.unwrap());

        let mut stolen = plant.clone();
        stolen.owner = bob;
        stolen.name = "Mine now".to_string();
        assert!(!store.update_plant(&stolen).await.unwrap());

        let stored = store.get_plant(alice, plant.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Monstera");
    }

    #[tokio::test]
    async fn plants_list_newest_first() {
        let store = InMemoryDataStore::new();
        let owner = UserId::generate();
        let now = Utc::now();
        let old = test_plant(owner, "Old", now - Duration::days(2));
        let new = test_plant(owner, "New", now);
        let same_time = test_plant(owner, "Also new", now);
        store.create_plant(&old).await.unwrap();
        store.create_plant(&new).await.unwrap();
        store.create_plant(&same_time).await.unwrap();

        let names: Vec<String> = store
            .list_plants(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Also new", "New", "Old"]);
    }

    #[tokio::test]
    async fn overdue_query_spans_all_users() {
        let store = InMemoryDataStore::new();
        let now = Utc::now();
        let long_ago = now - Duration::days(40);
        let a = test_plant(UserId::generate(), "A", long_ago);
        let b = test_plant(UserId::generate(), "B", long_ago);
        let fresh = test_plant(UserId::generate(), "Fresh", now);
        for p in [&a, &b, &fresh] {
            store.create_plant(p).await.unwrap();
        }

        let overdue = store
            .list_overdue_plants(CareTask::Watering, now)
            .await
            .unwrap();
        assert_eq!(overdue.len(), 2);
        assert!(overdue.iter().all(|p| p.name != "Fresh"));
    }

    #[tokio::test]
    async fn activities_filter_and_order() {
        let store = InMemoryDataStore::new();
        let owner = UserId::generate();
        let plant = PlantId::generate();
        let other_plant = PlantId::generate();
        let now = Utc::now();

        let early = Activity::new(
            owner,
            plant,
            ActivityType::Watered,
            now - Duration::hours(3),
            None,
        );
        let late = Activity::new(owner, plant, ActivityType::Fertilized, now, None);
        let elsewhere = Activity::new(
            owner,
            other_plant,
            ActivityType::Watered,
            now - Duration::hours(1),
            None,
        );
        let foreign = Activity::new(UserId::generate(), plant, ActivityType::Watered, now, None);
        for a in [&early, &late, &elsewhere, &foreign] {
            store.append_activity(a).await.unwrap();
        }

        let all = store
            .list_activities(owner, &ActivityFilter::default())
            .await
            .unwrap();
        assert_eq!(all, vec![late.clone(), elsewhere.clone(), early.clone()]);

        let watered_here = store
            .list_activities(
                owner,
                &ActivityFilter {
                    plant: Some(plant),
                    kind: Some(ActivityType::Watered),
                },
            )
            .await
            .unwrap();
        assert_eq!(watered_here, vec![early]);
    }

    #[tokio::test]
    async fn activity_exists_since_respects_cutoff() {
        let store = InMemoryDataStore::new();
        let plant = PlantId::generate();
        let now = Utc::now();
        let entry = Activity::new(
            UserId::generate(),
            plant,
            ActivityType::OverdueWatering,
            now - Duration::days(1),
            None,
        );
        store.append_activity(&entry).await.unwrap();

        assert!(
            store
                .activity_exists_since(
                    plant,
                    ActivityType::OverdueWatering,
                    now - Duration::days(2),
                )
                .await
                .unwrap()
        );
        assert!(
            !store
                .activity_exists_since(
                    plant,
                    ActivityType::OverdueWatering,
                    now - Duration::hours(1),
                )
                .await
                .unwrap()
        );
        assert!(
            !store
                .activity_exists_since(
                    plant,
                    ActivityType::OverdueFertilizing,
                    now - Duration::days(2),
                )
                .await
                .unwrap()
        );
    }
}
