use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::website::{ErrorTemplate, Meta};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Error hashing the password: {0}")]
    ErrorHashingPassword(argon2::password_hash::Error),
    #[error("Error rendering the template: {0}")]
    TemplateError(#[from] askama::Error),
    #[error("{0}")]
    CustomInternal(String),
}

impl AppError {
    pub fn custom_internal(message: &str) -> Self {
        Self::CustomInternal(message.to_owned())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Internal failures collapse into a generic message so nothing about the
    /// storage or the templates leaks to the client.
    pub fn get_status_code_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::PermissionDenied(message) => (StatusCode::FORBIDDEN, message.clone()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::ErrorHashingPassword(_) | Self::TemplateError(_) | Self::CustomInternal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
            ),
        }
    }
}

#[macro_export]
macro_rules! log_and_wrap_custom_internal {
    ($e:expr) => {{
        let error = $e;
        tracing::error!(error = %error, file = file!(), line = line!(), "internal error");
        $crate::errors::AppError::custom_internal(&error.to_string())
    }};
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Unauthorized = self {
            return Redirect::to("/login").into_response();
        }

        let (status, message) = self.get_status_code_and_message();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let template = ErrorTemplate {
            meta: Meta::new(status.canonical_reason().unwrap_or("Error")),
            flashes: Vec::new(),
            status: status.as_u16(),
            message,
        };
        match template.render() {
            Ok(body) => (status, Html(body)).into_response(),
            Err(_) => (status, Html("<h1>Something went wrong</h1>".to_owned())).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_keep_their_message() {
        let (status, message) = AppError::permission_denied("Permission denied")
            .get_status_code_and_message();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(message, "Permission denied");

        let (status, message) = AppError::not_found("Card not found").get_status_code_and_message();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "Card not found");

        let (status, _) = AppError::validation("Invalid status").get_status_code_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let (status, message) =
            AppError::custom_internal("no such table: cards").get_status_code_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn test_unauthorized_redirects_to_login() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }
}
