use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Extension,
};

use crate::{
    errors::AppError,
    models::User,
    sessions::{Flash, FlashLevel, Session},
    state::WebsiteState,
};

use super::Meta;

pub type HtmlResult = Result<Html<String>, AppError>;

pub fn template_to_response<T: Template>(tmpl: &T) -> HtmlResult {
    tmpl.render().map(Html).map_err(AppError::TemplateError)
}

/// Errors the user can act on become a flash message on the page at `to`;
/// anything else is returned untouched.
pub async fn flash_redirect(session: &Session, error: AppError, to: &str) -> Result<Response, AppError> {
    match error {
        AppError::Validation(message) | AppError::PermissionDenied(message) => {
            session.flash(FlashLevel::Error, message).await;
            Ok(Redirect::to(to).into_response())
        }
        error => Err(error),
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub meta: Meta<'a>,
    pub flashes: Vec<Flash>,
    pub status: u16,
    pub message: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    user: User,
}

pub async fn index(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
) -> HtmlResult {
    let flashes = session.take_flashes().await;
    let user = match session.user_pk().await {
        Some(pk) => User::find(pk, &**state.database()).await?,
        None => None,
    };

    match user {
        Some(user) => template_to_response(&HomeTemplate {
            meta: Meta::authenticated("Home"),
            flashes,
            user,
        }),
        None => template_to_response(&IndexTemplate {
            meta: Meta::new("Taskboard"),
            flashes,
        }),
    }
}

pub async fn error_404() -> Response {
    AppError::not_found("Nothing to see here").into_response()
}
