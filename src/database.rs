use std::{ops::Deref, str::FromStr};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool, Transaction,
};

use crate::{errors::AppError, log_and_wrap_custom_internal};

#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Database {
    pub fn new(url: &str) -> Self {
        let database_config = SqliteConnectOptions::from_str(url)
            .expect("Cannot connect to database")
            .foreign_keys(true)
            .create_if_missing(true);

        // Every connection to an in-memory url opens its own empty database.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_lazy_with(database_config)
        } else {
            SqlitePoolOptions::new().connect_lazy_with(database_config)
        };

        Self(pool)
    }

    pub async fn run_migrations(&self) {
        sqlx::migrate!("./migrations")
            .run(&**self)
            .await
            .expect("Migrations failed");
    }

    pub async fn start_transaction(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        self.begin()
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }
}

pub struct TestDatabase(Database);

impl Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TestDatabase {
    pub async fn setup() -> Self {
        let database = Database::new("sqlite::memory:");
        database.run_migrations().await;
        Self(database)
    }

    pub fn database(&self) -> &Database {
        &self.0
    }
}
