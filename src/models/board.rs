use serde::Serialize;
use sqlx::{prelude::FromRow, Executor, Sqlite};

use crate::{errors::AppError, log_and_wrap_custom_internal};

#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct Board {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub owner_group_id: Option<i64>,
}

impl Board {
    pub async fn create<'e, E>(name: &str, owner_id: i64, executor: E) -> Result<Self, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = sqlx::query("INSERT INTO boards (name, owner_id) VALUES ($1, $2);")
            .bind(name)
            .bind(owner_id)
            .execute(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
            .map(|q| q.last_insert_rowid())?;

        Ok(Self {
            id,
            name: name.to_owned(),
            owner_id,
            owner_group_id: None,
        })
    }

    pub async fn find<'e, E>(id: i64, executor: E) -> Result<Option<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM boards WHERE id = $1;")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn list_owned_by<'e, E>(owner_id: i64, executor: E) -> Result<Vec<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM boards WHERE owner_id = $1 ORDER BY id DESC;")
            .bind(owner_id)
            .fetch_all(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    /// Boards attached to any group `user_id` belongs to, whoever owns them.
    pub async fn list_shared_with<'e, E>(user_id: i64, executor: E) -> Result<Vec<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "SELECT DISTINCT boards.*
                FROM boards
                INNER JOIN group_memberships ON group_memberships.group_id = boards.owner_group_id
                WHERE group_memberships.user_id = $1
                ORDER BY boards.id DESC;",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
        .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn set_group<'e, E>(
        &mut self,
        group_id: Option<i64>,
        executor: E,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE boards SET owner_group_id = $1 WHERE id = $2;")
            .bind(group_id)
            .bind(self.id)
            .execute(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        self.owner_group_id = group_id;
        Ok(())
    }

    pub async fn delete<'e, E>(self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM boards WHERE id = $1;")
            .bind(self.id)
            .execute(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        Ok(())
    }
}
