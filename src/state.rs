use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::WebsiteConfig, database::Database, sessions::Sessions};

/// Everything a request handler may touch, built once at startup.
#[derive(Clone, Debug, FromRef)]
pub struct WebsiteState {
    config: Arc<WebsiteConfig>,
    database: Database,
    sessions: Sessions,
}

impl WebsiteState {
    pub fn new(config: WebsiteConfig) -> Self {
        let database = Database::new(&config.database_url);
        Self {
            sessions: Sessions::new(database.clone()),
            database,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &WebsiteConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}
