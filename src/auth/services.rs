use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::{database::Database, errors::AppError, models::User};

use super::credentials::{hash_password, verify_password};

#[derive(Debug, Default, Deserialize)]
pub struct IngressForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Validate)]
struct Registration {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long."))]
    username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    password: String,
}

impl Registration {
    fn from_form(input: &IngressForm) -> Result<Self, AppError> {
        let registration = Self {
            username: input.username.trim().to_owned(),
            password: input.password.clone(),
        };
        if registration.username.is_empty() || registration.password.is_empty() {
            return Err(AppError::validation("Please fill in all fields."));
        }
        registration
            .validate()
            .map_err(|errors| AppError::Validation(first_message(&errors)))?;
        Ok(registration)
    }
}

/// Username problems are reported before password ones.
fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    ["username", "password"]
        .iter()
        .filter_map(|field| fields.get(*field))
        .filter_map(|errors| errors.first())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input.".to_owned())
}

pub async fn register(database: &Database, input: &IngressForm) -> Result<User, AppError> {
    let registration = Registration::from_form(input)?;

    if User::find_by_username(&registration.username, &**database)
        .await?
        .is_some()
    {
        return Err(AppError::validation("Username is already taken."));
    }

    let password = hash_password(&registration.password)?;
    let user = User::create(&registration.username, &password, &**database).await?;
    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Unknown usernames and wrong passwords fail with the same message.
pub async fn authenticate(database: &Database, input: &IngressForm) -> Result<User, AppError> {
    let username = input.username.trim();
    if username.is_empty() || input.password.is_empty() {
        return Err(AppError::validation(
            "Please enter your username and password.",
        ));
    }

    match User::find_by_username(username, &**database).await? {
        Some(user) if verify_password(&input.password, &user.password_hash) => {
            tracing::info!(user_id = user.id, "user logged in");
            Ok(user)
        }
        _ => {
            tracing::warn!(username, "failed login attempt");
            Err(AppError::validation("Invalid username or password."))
        }
    }
}

/// Only local paths are followed after login so `next` cannot send the user
/// to another site.
pub fn login_redirect<'a>(next: Option<&'a str>, default: &'a str) -> &'a str {
    match next {
        Some(next) if is_local_path(next) => next,
        _ => default,
    }
}

// Browsers read `/\host` the same as `//host`.
fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/' | '\\'))
        && !path.chars().any(|c| c.is_ascii_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::TestDatabase;

    fn form(username: &str, password: &str) -> IngressForm {
        IngressForm {
            username: username.into(),
            password: password.into(),
            next: None,
        }
    }

    fn message(error: AppError) -> String {
        match error {
            AppError::Validation(message) => message,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let database = TestDatabase::setup().await;
        let user = register(&database, &form("alice", "verysecurepass"))
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let logged = authenticate(&database, &form("alice", "verysecurepass"))
            .await
            .unwrap();
        assert_eq!(logged.id, user.id);
    }

    #[tokio::test]
    async fn test_username_is_trimmed() {
        let database = TestDatabase::setup().await;
        register(&database, &form("  carol  ", "verysecurepass"))
            .await
            .unwrap();
        assert!(authenticate(&database, &form("carol", "verysecurepass"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_registration_policy() {
        let database = TestDatabase::setup().await;
        assert_eq!(
            message(register(&database, &form("", "verysecurepass")).await.unwrap_err()),
            "Please fill in all fields."
        );
        assert_eq!(
            message(register(&database, &form("al", "verysecurepass")).await.unwrap_err()),
            "Username must be at least 3 characters long."
        );
        assert_eq!(
            message(register(&database, &form("al", "short")).await.unwrap_err()),
            "Username must be at least 3 characters long."
        );
        assert_eq!(
            message(register(&database, &form("alice", "short")).await.unwrap_err()),
            "Password must be at least 8 characters long."
        );

        register(&database, &form("alice", "verysecurepass"))
            .await
            .unwrap();
        assert_eq!(
            message(register(&database, &form("alice", "anotherpass")).await.unwrap_err()),
            "Username is already taken."
        );
    }

    #[tokio::test]
    async fn test_bad_credentials_share_one_message() {
        let database = TestDatabase::setup().await;
        register(&database, &form("alice", "verysecurepass"))
            .await
            .unwrap();

        let wrong_password = authenticate(&database, &form("alice", "wrongpassword"))
            .await
            .unwrap_err();
        let unknown_user = authenticate(&database, &form("mallory", "verysecurepass"))
            .await
            .unwrap_err();
        assert_eq!(message(wrong_password), "Invalid username or password.");
        assert_eq!(message(unknown_user), "Invalid username or password.");
    }

    #[test]
    fn test_login_redirect_only_follows_local_paths() {
        assert_eq!(login_redirect(Some("/board/3"), "/boards"), "/board/3");
        assert_eq!(login_redirect(Some("//evil.com"), "/boards"), "/boards");
        assert_eq!(login_redirect(Some("https://evil.com"), "/boards"), "/boards");
        assert_eq!(login_redirect(Some("/\\evil.com"), "/boards"), "/boards");
        assert_eq!(login_redirect(Some("/\t/evil.com"), "/boards"), "/boards");
        assert_eq!(login_redirect(Some("/boards\r\nX: 1"), "/boards"), "/boards");
        assert_eq!(login_redirect(Some("/"), "/boards"), "/");
        assert_eq!(login_redirect(None, "/boards"), "/boards");
    }
}
