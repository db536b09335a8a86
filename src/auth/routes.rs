use askama::Template;
use axum::{
    extract::{Query, State},
    middleware::from_fn,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Form, Router,
};
use serde::Deserialize;

use crate::{
    errors::AppError,
    sessions::{Flash, FlashLevel, Session},
    state::WebsiteState,
    website::{template_to_response, HtmlResult, Meta},
};

use super::{
    middlewares::login_required_middleware,
    services::{authenticate, login_redirect, register, IngressForm},
};

pub fn routes(state: WebsiteState) -> Router<WebsiteState> {
    Router::new()
        .route("/logout", get(logout))
        .route_layer(from_fn(login_required_middleware))
        .route("/login", get(login).post(post_login))
        .route("/register", get(register_form).post(post_register))
        .with_state(state)
}

#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    error: Option<String>,
    username: String,
    next: String,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
struct RegisterTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    error: Option<String>,
    username: String,
}

#[derive(Debug, Deserialize)]
pub struct IngressParams {
    next: Option<String>,
}

pub async fn login(
    Extension(session): Extension<Session>,
    Query(params): Query<IngressParams>,
) -> HtmlResult {
    template_to_response(&LoginTemplate {
        meta: Meta::new("Log in"),
        flashes: session.take_flashes().await,
        error: None,
        username: String::new(),
        next: params.next.unwrap_or_default(),
    })
}

pub async fn post_login(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Form(input): Form<IngressForm>,
) -> Result<Response, AppError> {
    match authenticate(state.database(), &input).await {
        Ok(user) => {
            state
                .sessions()
                .reuse_current_as_new_one(&session, Some(user.id))
                .await?;
            let to = login_redirect(input.next.as_deref(), &state.config().login_redirect_to);
            Ok(Redirect::to(to).into_response())
        }
        Err(AppError::Validation(message)) => template_to_response(&LoginTemplate {
            meta: Meta::new("Log in"),
            flashes: session.take_flashes().await,
            error: Some(message),
            username: input.username.trim().to_owned(),
            next: input.next.unwrap_or_default(),
        })
        .map(IntoResponse::into_response),
        Err(e) => Err(e),
    }
}

pub async fn register_form(Extension(session): Extension<Session>) -> HtmlResult {
    template_to_response(&RegisterTemplate {
        meta: Meta::new("Register"),
        flashes: session.take_flashes().await,
        error: None,
        username: String::new(),
    })
}

pub async fn post_register(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Form(input): Form<IngressForm>,
) -> Result<Response, AppError> {
    match register(state.database(), &input).await {
        Ok(_) => {
            session
                .flash(FlashLevel::Success, "Account created! Now log in.")
                .await;
            Ok(Redirect::to("/login").into_response())
        }
        Err(AppError::Validation(message)) => template_to_response(&RegisterTemplate {
            meta: Meta::new("Register"),
            flashes: session.take_flashes().await,
            error: Some(message),
            username: input.username.trim().to_owned(),
        })
        .map(IntoResponse::into_response),
        Err(e) => Err(e),
    }
}

pub async fn logout(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
) -> Result<Redirect, AppError> {
    state
        .sessions()
        .reuse_current_as_new_one(&session, None)
        .await?;
    session
        .flash(FlashLevel::Info, "You have been logged out.")
        .await;
    Ok(Redirect::to("/login"))
}
