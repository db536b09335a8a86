use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{database::Database, errors::AppError, log_and_wrap_custom_internal};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Error,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Clone)]
pub struct Session(Arc<RwLock<UserSession>>);

impl Session {
    pub async fn is_authenticated(&self) -> bool {
        self.0.read().await.user_pk.is_some()
    }

    pub async fn user_pk(&self) -> Option<i64> {
        self.0.read().await.user_pk
    }

    pub async fn id(&self) -> String {
        self.0.read().await.session_id.to_owned()
    }

    pub async fn flash(&self, level: FlashLevel, message: impl Into<String>) {
        self.0.write().await.flashes.push(Flash {
            level,
            message: message.into(),
        });
    }

    /// Messages are shown once: reading them empties the queue.
    pub async fn take_flashes(&self) -> Vec<Flash> {
        std::mem::take(&mut self.0.write().await.flashes)
    }
}

#[derive(Clone, Debug)]
pub struct Sessions(Database);

impl Sessions {
    pub fn new(database: Database) -> Self {
        Self(database)
    }

    /// `cookie_value` is the signed token set by [`Sessions::cookie_value`];
    /// unsigned, tampered or expired sessions resolve to `None`.
    pub async fn find_session(
        &self,
        cookie_value: &str,
        secret: &str,
    ) -> Result<Option<Session>, AppError> {
        let Some(session_id) = verify_token(secret, cookie_value) else {
            return Ok(None);
        };

        let session = UserSession::from_session_id(session_id, &self.0).await?;
        Ok(session
            .filter(|s| s.expiration > Utc::now())
            .map(|s| Session(Arc::new(RwLock::new(s.decode_data())))))
    }

    /// Every new session first clears out the expired ones, which keeps the
    /// table bounded by the number of live visitors.
    pub async fn create_session(&self, session_expiration: i64) -> Result<Session, AppError> {
        self.purge_expired().await?;
        let session = UserSession::new(session_expiration);
        session.save(&self.0).await?;
        Ok(Session(Arc::new(RwLock::new(session))))
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let purged = sqlx::query("DELETE FROM web_sessions WHERE expiration < $1;")
            .bind(Utc::now())
            .execute(&*self.0)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?
            .rows_affected();
        if purged > 0 {
            tracing::debug!(purged, "expired sessions removed");
        }
        Ok(purged)
    }

    /// Writes the flash queue back and refreshes the last access time.
    pub async fn persist(&self, session: &Session) -> Result<(), AppError> {
        session
            .0
            .write()
            .await
            .update_last_accessed()
            .update(&self.0)
            .await
    }

    /// Gives the session a fresh id bound to `user_pk`, so an id seen before
    /// login (or logout) is useless afterwards.
    pub async fn reuse_current_as_new_one(
        &self,
        session: &Session,
        user_pk: Option<i64>,
    ) -> Result<(), AppError> {
        session
            .0
            .write()
            .await
            .rotate(user_pk, &self.0)
            .await
    }

    pub async fn cookie_value(session: &Session, secret: &str) -> String {
        sign_token(secret, &session.id().await)
    }
}

#[derive(Debug, sqlx::FromRow, Clone)]
pub struct UserSession {
    session_id: String,
    user_pk: Option<i64>,
    last_accessed: DateTime<Utc>,
    expiration: DateTime<Utc>,
    data: Option<Vec<u8>>,
    #[sqlx(skip)]
    flashes: Vec<Flash>,
}

impl UserSession {
    fn new(session_expiration: i64) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::now_v7().to_string(),
            user_pk: None,
            last_accessed: now,
            expiration: now + Duration::days(session_expiration),
            data: None,
            flashes: Vec::new(),
        }
    }

    fn decode_data(mut self) -> Self {
        self.flashes = self
            .data
            .as_deref()
            .and_then(|data| serde_json::from_slice(data).ok())
            .unwrap_or_default();
        self
    }

    fn encode_data(&self) -> Result<Option<Vec<u8>>, AppError> {
        if self.flashes.is_empty() {
            return Ok(None);
        }
        serde_json::to_vec(&self.flashes)
            .map(Some)
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    fn update_last_accessed(&mut self) -> &mut Self {
        self.last_accessed = Utc::now();
        self
    }

    async fn from_session_id(
        session_id: &str,
        database: &Database,
    ) -> Result<Option<Self>, AppError> {
        sqlx::query_as("SELECT * FROM web_sessions WHERE session_id = $1;")
            .bind(session_id)
            .fetch_optional(&**database)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))
    }

    async fn save(&self, database: &Database) -> Result<(), AppError> {
        sqlx::query("INSERT INTO web_sessions(session_id, user_pk, last_accessed, expiration, data) VALUES ($1, $2, $3, $4, $5);")
            .bind(&self.session_id)
            .bind(self.user_pk)
            .bind(self.last_accessed)
            .bind(self.expiration)
            .bind(self.encode_data()?)
            .execute(&**database)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        Ok(())
    }

    async fn update(&self, database: &Database) -> Result<(), AppError> {
        sqlx::query("UPDATE web_sessions SET last_accessed = $1, data = $2 WHERE session_id = $3;")
            .bind(self.last_accessed)
            .bind(self.encode_data()?)
            .bind(&self.session_id)
            .execute(&**database)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        Ok(())
    }

    async fn rotate(&mut self, user_pk: Option<i64>, database: &Database) -> Result<(), AppError> {
        let new_id = Uuid::now_v7().to_string();
        sqlx::query("UPDATE web_sessions SET session_id = $1, user_pk = $2 WHERE session_id = $3;")
            .bind(&new_id)
            .bind(user_pk)
            .bind(&self.session_id)
            .execute(&**database)
            .await
            .map_err(|e| log_and_wrap_custom_internal!(e))?;
        self.session_id = new_id;
        self.user_pk = user_pk;
        Ok(())
    }
}

fn mac(secret: &str, data: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    mac
}

fn sign_token(secret: &str, session_id: &str) -> String {
    let signature = hex::encode(mac(secret, session_id).finalize().into_bytes());
    format!("{}.{}", session_id, signature)
}

fn verify_token<'a>(secret: &str, token: &'a str) -> Option<&'a str> {
    let (session_id, signature) = token.rsplit_once('.')?;
    let signature = hex::decode(signature).ok()?;
    mac(secret, session_id)
        .verify_slice(&signature)
        .ok()
        .map(|_| session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::TestDatabase;

    #[test]
    fn test_signed_token_verifies() {
        let token = sign_token("secret", "abc");
        assert_eq!(verify_token("secret", &token), Some("abc"));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let token = sign_token("secret", "abc");
        let forged = token.replacen("abc", "abd", 1);
        assert_eq!(verify_token("secret", &forged), None);
        assert_eq!(verify_token("other-secret", &token), None);
        assert_eq!(verify_token("secret", "abc"), None);
        assert_eq!(verify_token("secret", "abc.zz"), None);
    }

    #[tokio::test]
    async fn test_flashes_survive_a_round_trip() {
        let database = TestDatabase::setup().await;
        let sessions = Sessions::new(database.database().clone());

        let session = sessions.create_session(30).await.unwrap();
        session.flash(FlashLevel::Success, "Board created").await;
        sessions.persist(&session).await.unwrap();

        let token = Sessions::cookie_value(&session, "secret").await;
        let found = sessions.find_session(&token, "secret").await.unwrap().unwrap();
        assert_eq!(
            found.take_flashes().await,
            vec![Flash {
                level: FlashLevel::Success,
                message: "Board created".into()
            }]
        );
        assert!(found.take_flashes().await.is_empty());
    }

    #[tokio::test]
    async fn test_rotation_invalidates_the_old_id() {
        let database = TestDatabase::setup().await;
        let sessions = Sessions::new(database.database().clone());
        let session = sessions.create_session(30).await.unwrap();
        let old_token = Sessions::cookie_value(&session, "secret").await;

        sessions
            .reuse_current_as_new_one(&session, None)
            .await
            .unwrap();

        assert!(sessions.find_session(&old_token, "secret").await.unwrap().is_none());
        let new_token = Sessions::cookie_value(&session, "secret").await;
        assert!(sessions.find_session(&new_token, "secret").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_not_found() {
        let database = TestDatabase::setup().await;
        let sessions = Sessions::new(database.database().clone());
        let session = sessions.create_session(-1).await.unwrap();
        let token = Sessions::cookie_value(&session, "secret").await;

        assert!(sessions.find_session(&token, "secret").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_sessions_clear_out_expired_ones() {
        let database = TestDatabase::setup().await;
        let sessions = Sessions::new(database.database().clone());
        for _ in 0..3 {
            sessions.create_session(-1).await.unwrap();
        }
        let live = sessions.create_session(30).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM web_sessions;")
            .fetch_one(&**database.database())
            .await
            .unwrap();
        assert_eq!(count, 1);
        let token = Sessions::cookie_value(&live, "secret").await;
        assert!(sessions.find_session(&token, "secret").await.unwrap().is_some());
    }
}
