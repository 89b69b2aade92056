//! User operations for PostgreSQL database.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::SqlResult;
use crate::{DataStoreError, User, UserId};

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: Uuid,
    name: String,
    age: Option<i32>,
    email: String,
    password_hash: String,
    affiliation: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DataStoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let age = row
            .age
            .map(u32::try_from)
            .transpose()
            .map_err(|_| {
                DataStoreError::Corrupt(format!("negative age for user {}", row.user_id))
            })?;
        Ok(User {
            id: UserId::new(row.user_id),
            name: row.name,
            age,
            email: row.email,
            password_hash: row.password_hash,
            affiliation: row.affiliation,
            created_at: row.created_at,
        })
    }
}

const SELECT_USER: &str = r#"
    SELECT user_id, name, age, email, password_hash, affiliation, created_at
    FROM users
"#;

/// Inserts a user.
///
/// # Returns
/// * `Ok(())` - User created
/// * `Err(DataStoreError::AlreadyExists)` - Email or id already taken
pub async fn create(tx: &mut Transaction<'_, Postgres>, user: &User) -> SqlResult<()> {
    let age = user
        .age
        .map(i32::try_from)
        .transpose()
        .map_err(|_| DataStoreError::Internal("age out of range".to_string()))?;
    sqlx::query(
        r#"
        INSERT INTO users (user_id, name, age, email, password_hash, affiliation, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(user.id.as_uuid())
    .bind(&user.name)
    .bind(age)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.affiliation)
    .bind(user.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Looks a user up by exact email.
pub async fn find_by_email(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
) -> SqlResult<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(&format!("{} WHERE email = $1", SELECT_USER))
        .bind(email)
        .fetch_optional(&mut **tx)
        .await?;
    row.map(User::try_from).transpose()
}

/// Looks a user up by id.
pub async fn get(tx: &mut Transaction<'_, Postgres>, id: UserId) -> SqlResult<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(&format!("{} WHERE user_id = $1", SELECT_USER))
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;
    row.map(User::try_from).transpose()
}
