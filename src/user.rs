use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A registered account.  Users are never updated after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Identity used as the ownership tag on plants and activities.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Optional age in years.
    pub age: Option<u32>,
    /// Unique, normalized (trimmed, lowercased) login email.
    pub email: String,
    /// Argon2id hash in PHC string format.
    pub password_hash: String,
    /// Optional free-form affiliation (school, club, ...).
    pub affiliation: Option<String>,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// The public face of a [`User`]; never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            age: user.age,
            affiliation: user.affiliation.clone(),
        }
    }
}

/// Body of `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, alias = "collegeName", skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by register and login: a bearer token plus who it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Normalizes an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
