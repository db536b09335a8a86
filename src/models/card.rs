use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Executor, Sqlite};
use utoipa::ToSchema;

use crate::{deadline, errors::AppError, log_and_wrap_custom_internal};

/// Column a card sits in. Any status can follow any other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CardStatus {
    #[default]
    Ideas,
    Todo,
    Wip,
    Done,
}

impl CardStatus {
    pub const ALL: [CardStatus; 4] = [Self::Ideas, Self::Todo, Self::Wip, Self::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ideas => "ideas",
            Self::Todo => "todo",
            Self::Wip => "wip",
            Self::Done => "done",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ideas => "Ideas",
            Self::Todo => "To Do",
            Self::Wip => "In progress",
            Self::Done => "Done",
        }
    }
}

impl FromStr for CardStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ideas" => Ok(Self::Ideas),
            "todo" => Ok(Self::Todo),
            "wip" => Ok(Self::Wip),
            "done" => Ok(Self::Done),
            _ => Err(AppError::validation("Invalid status")),
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Card {
    pub id: i64,
    pub board_id: i64,
    pub name: String,
    pub task_creator: String,
    pub task_assignee: String,
    pub task_description: String,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub status: CardStatus,
}

/// Already validated fields of a card about to be inserted.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub name: String,
    pub task_creator: String,
    pub task_assignee: String,
    pub task_description: String,
    pub status: CardStatus,
}

impl Card {
    pub async fn create<'e, E>(
        board_id: i64,
        card: NewCard,
        created_at: DateTime<Utc>,
        executor: E,
    ) -> Result<Self, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = sqlx::query(
            "INSERT INTO cards (board_id, name, task_creator, task_assignee, task_description, created_at, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7);",
        )
        .bind(board_id)
        .bind(&card.name)
        .bind(&card.task_creator)
        .bind(&card.task_assignee)
        .bind(&card.task_description)
        .bind(created_at)
        .bind(card.status)
        .execute(executor)
        .await
        .map_err(|e| log_and_wrap_custom_internal!(e))
        .map(|q| q.last_insert_rowid())?;

        Ok(Self {
            id,
            board_id,
            name: card.name,
            task_creator: card.task_creator,
            task_assignee: card.task_assignee,
            task_description: card.task_description,
            deadline: None,
            created_at,
            status: card.status,
        })
    }

    pub async fn find<'e, E>(id: i64, executor: E) -> Result<Option<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM cards WHERE id = $1;")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn find_on_board<'e, E>(
        board_id: i64,
        id: i64,
        executor: E,
    ) -> Result<Option<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM cards WHERE board_id = $1 AND id = $2;")
            .bind(board_id)
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn list_for_board<'e, E>(board_id: i64, executor: E) -> Result<Vec<Self>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM cards WHERE board_id = $1 ORDER BY id DESC;")
            .bind(board_id)
            .fetch_all(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    pub async fn set_status<'e, E>(&mut self, status: CardStatus, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE cards SET status = $1 WHERE id = $2;")
            .bind(status)
            .bind(self.id)
            .execute(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        self.status = status;
        Ok(())
    }

    pub async fn set_detail<'e, E>(
        &mut self,
        description: String,
        deadline: Option<DateTime<Utc>>,
        executor: E,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE cards SET task_description = $1, deadline = $2 WHERE id = $3;")
            .bind(&description)
            .bind(deadline)
            .bind(self.id)
            .execute(executor)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        self.task_description = description;
        self.deadline = deadline;
        Ok(())
    }

    pub fn deadline_display(&self) -> String {
        self.deadline
            .as_ref()
            .map(deadline::format_display)
            .unwrap_or_default()
    }

    pub fn deadline_input(&self) -> String {
        self.deadline
            .as_ref()
            .map(deadline::format_input)
            .unwrap_or_default()
    }

    pub fn created_display(&self) -> String {
        deadline::format_display(&self.created_at)
    }
}
