use serde::Serialize;
use sqlx::{prelude::FromRow, Executor, Sqlite};

use crate::{errors::AppError, log_and_wrap_custom_internal};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub full_name: String,
    pub bio: String,
    pub avatar_url: String,
}

impl User {
    /// Name shown on cards and in the navigation: the full name when the
    /// profile has one, the username otherwise.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }

    pub async fn create<'e, E>(
        username: &str,
        password_hash: &str,
        executor: E,
    ) -> Result<Self, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = sqlx::query("INSERT INTO users (username, password_hash) VALUES ($1, $2);")
            .bind(username)
            .bind(password_hash)
            .execute(executor)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::validation("Username is already taken.")
                }
                e => log_and_wrap_custom_internal!(e),
            })
            .map(|q| q.last_insert_rowid())?;

        Ok(Self {
            id,
            username: username.to_owned(),
            password_hash: password_hash.to_owned(),
            full_name: String::new(),
            bio: String::new(),
            avatar_url: String::new(),
        })
    }

    pub async fn find<'e, E>(id: i64, executor: E) -> Result<Option<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM users WHERE id = $1;")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn find_by_username<'e, E>(
        username: &str,
        executor: E,
    ) -> Result<Option<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM users WHERE username = $1;")
            .bind(username)
            .fetch_optional(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM users ORDER BY username;")
            .fetch_all(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn update_profile<'e, E>(&self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE users SET full_name = $1, bio = $2, avatar_url = $3 WHERE id = $4;")
            .bind(&self.full_name)
            .bind(&self.bio)
            .bind(&self.avatar_url)
            .bind(self.id)
            .execute(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        Ok(())
    }
}
