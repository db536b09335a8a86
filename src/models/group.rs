use serde::Serialize;
use sqlx::{prelude::FromRow, Executor, Sqlite, SqliteConnection};

use crate::{errors::AppError, log_and_wrap_custom_internal};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Member {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

impl Group {
    /// Creates the group and makes `creator_id` its first member.
    pub async fn create(
        name: &str,
        creator_id: i64,
        tx: &mut SqliteConnection,
    ) -> Result<Self, AppError> {
        let id = sqlx::query("INSERT INTO groups (name) VALUES ($1);")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
            .map(|q| q.last_insert_rowid())?;

        Self::add_member(id, creator_id, &mut *tx).await?;

        Ok(Self {
            id,
            name: name.to_owned(),
        })
    }

    pub async fn find<'e, E>(id: i64, executor: E) -> Result<Option<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT id, name FROM groups WHERE id = $1;")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn list_for_user<'e, E>(user_id: i64, executor: E) -> Result<Vec<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "SELECT groups.id, groups.name
                FROM groups
                INNER JOIN group_memberships ON group_memberships.group_id = groups.id
                WHERE group_memberships.user_id = $1
                ORDER BY groups.id;",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
        .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn list_members<'e, E>(group_id: i64, executor: E) -> Result<Vec<Member>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "SELECT users.id, users.username, users.full_name
                FROM users
                INNER JOIN group_memberships ON group_memberships.user_id = users.id
                WHERE group_memberships.group_id = $1
                ORDER BY users.username;",
        )
        .bind(group_id)
        .fetch_all(executor)
        .await
        .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn member_ids<'e, E>(group_id: i64, executor: E) -> Result<Vec<i64>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT user_id FROM group_memberships WHERE group_id = $1;")
            .bind(group_id)
            .fetch_all(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn add_member<'e, E>(group_id: i64, user_id: i64, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("INSERT INTO group_memberships (user_id, group_id) VALUES ($1, $2);")
            .bind(user_id)
            .bind(group_id)
            .execute(executor)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::validation("User is already in the group.")
                }
                e => log_and_wrap_custom_internal!(e),
            })?;
        Ok(())
    }

    /// Returns whether a membership row was actually removed.
    pub async fn remove_member<'e, E>(
        group_id: i64,
        user_id: i64,
        executor: E,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM group_memberships WHERE user_id = $1 AND group_id = $2;")
            .bind(user_id)
            .bind(group_id)
            .execute(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
            .map(|r| r.rows_affected() > 0)
    }
}
