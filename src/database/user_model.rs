// User data access: the collaborator trait used by the routes and its
// PostgreSQL implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::models::user::{self, NewUser, User, UserChanges, UserFilters, UserId, ValidationErrors};

const USER_COLUMNS: &str = "id, firstname, lastname, email, city, language";

/// Persistence and validation for users. Handlers only ever talk to this
/// trait, so any store (or a test double) can sit behind `AppState`.
#[async_trait]
pub trait UserModel: Send + Sync {
    /// Lists users matching the filters, ordered by id.
    async fn find_many(&self, filters: &UserFilters) -> Result<Vec<User>>;

    /// Fetches a single user, `None` when the id is unknown.
    async fn find_one(&self, id: UserId) -> Result<Option<User>>;

    /// Stores a new user and returns it with its assigned id.
    async fn create(&self, user: &NewUser) -> Result<User>;

    /// Writes the fields present in `changes`.
    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<()>;

    /// Removes a user; `true` when a record was actually deleted.
    async fn destroy(&self, id: UserId) -> Result<bool>;

    /// Validates a request body with creation rules or update rules.
    fn validate(&self, body: &Value, for_creation: bool) -> Option<ValidationErrors> {
        user::validate(body, for_creation)
    }
}

/// UPDATE for the columns present in `changes`; `None` when there is nothing to write
fn build_update_query(id: UserId, changes: &UserChanges) -> Option<QueryBuilder<'static, Postgres>> {
    if changes.is_empty() {
        return None;
    }

    let mut builder: QueryBuilder<'static, Postgres> = QueryBuilder::new("UPDATE users SET ");
    {
        let mut columns = builder.separated(", ");

        if let Some(firstname) = &changes.firstname {
            columns.push("firstname = ").push_bind_unseparated(firstname.clone());
        }
        if let Some(lastname) = &changes.lastname {
            columns.push("lastname = ").push_bind_unseparated(lastname.clone());
        }
        if let Some(email) = &changes.email {
            columns.push("email = ").push_bind_unseparated(email.clone());
        }
        if let Some(city) = &changes.city {
            columns.push("city = ").push_bind_unseparated(city.clone());
        }
        if let Some(language) = &changes.language {
            columns.push("language = ").push_bind_unseparated(language.clone());
        }
    }
    builder.push(" WHERE id = ").push_bind(id);

    Some(builder)
}

/// `UserModel` backed by the `users` table
#[derive(Clone, Debug)]
pub struct PgUserModel {
    pool: PgPool,
}

impl PgUserModel {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserModel for PgUserModel {
    async fn find_many(&self, filters: &UserFilters) -> Result<Vec<User>> {
        let users: Vec<User> = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE ($1::text IS NULL OR language = $1) ORDER BY id"
        ))
        .bind(filters.language.as_deref())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        debug!("Fetched {} users", users.len());
        Ok(users)
    }

    async fn find_one(&self, id: UserId) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to fetch user {}", id))
    }

    async fn create(&self, user: &NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (firstname, lastname, email, city, language)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(user.city.as_deref())
        .bind(user.language.as_deref())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert user")
    }

    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<()> {
        let Some(mut builder) = build_update_query(id, changes) else {
            return Ok(());
        };

        builder
            .build()
            .execute(&self.pool)
            .await
            .context(format!("Failed to update user {}", id))?;

        Ok(())
    }

    async fn destroy(&self, id: UserId) -> Result<bool> {
        let result: sqlx::postgres::PgQueryResult = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context(format!("Failed to delete user {}", id))?;

        Ok(result.rows_affected() > 0)
    }
}
