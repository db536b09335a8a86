use askama::Template;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Router,
};

use crate::{
    auth::Principal,
    errors::AppError,
    models::User,
    sessions::{Flash, FlashLevel, Session},
    state::WebsiteState,
    website::{template_to_response, HtmlResult, Meta},
};

use super::services::{update_profile, ProfileUpdate};

pub fn routes(state: WebsiteState) -> Router<WebsiteState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/profile/edit", get(edit_profile).post(post_edit_profile))
        .with_state(state)
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    user: User,
}

#[derive(Template)]
#[template(path = "profile_edit.html")]
struct ProfileEditTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    user: User,
    error: Option<String>,
}

pub async fn profile(
    Extension(session): Extension<Session>,
    Principal(user): Principal,
) -> HtmlResult {
    template_to_response(&ProfileTemplate {
        meta: Meta::authenticated("Profile"),
        flashes: session.take_flashes().await,
        user,
    })
}

pub async fn edit_profile(
    Extension(session): Extension<Session>,
    Principal(user): Principal,
) -> HtmlResult {
    template_to_response(&ProfileEditTemplate {
        meta: Meta::authenticated("Edit profile"),
        flashes: session.take_flashes().await,
        user,
        error: None,
    })
}

pub async fn post_edit_profile(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(mut user): Principal,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let update = match ProfileUpdate::from_multipart(multipart).await {
        Ok(update) => update,
        Err(AppError::Validation(message)) => return render_edit(&session, user, message).await,
        Err(e) => return Err(e),
    };
    let (full_name, bio) = (update.full_name.clone(), update.bio.clone());

    match update_profile(
        state.database(),
        &state.config().uploads_dir(),
        &mut user,
        update,
    )
    .await
    {
        Ok(()) => {
            session.flash(FlashLevel::Success, "Profile updated.").await;
            Ok(Redirect::to("/profile").into_response())
        }
        Err(AppError::Validation(message)) => {
            // Keep what was typed so only the file has to be picked again.
            user.full_name = full_name;
            user.bio = bio;
            render_edit(&session, user, message).await
        }
        Err(e) => Err(e),
    }
}

async fn render_edit(session: &Session, user: User, error: String) -> Result<Response, AppError> {
    template_to_response(&ProfileEditTemplate {
        meta: Meta::authenticated("Edit profile"),
        flashes: session.take_flashes().await,
        user,
        error: Some(error),
    })
    .map(IntoResponse::into_response)
}
