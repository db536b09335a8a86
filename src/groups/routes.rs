use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use serde::Deserialize;

use crate::{
    auth::Principal,
    errors::AppError,
    models::{Group, Member, User},
    sessions::{Flash, FlashLevel, Session},
    state::WebsiteState,
    website::{flash_redirect, template_to_response, Meta},
};

use super::services::{
    add_member, candidates, create_group, list_groups_for, load_group, remove_member,
    MembershipForm, Removal,
};

pub fn routes(state: WebsiteState) -> Router<WebsiteState> {
    Router::new()
        .route("/groups", get(groups).post(post_group))
        .route("/group/delete", post(post_remove_member))
        .route("/group/{group_id}", get(group).post(post_add_member))
        .with_state(state)
}

#[derive(Template)]
#[template(path = "groups.html")]
struct GroupsTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    groups: Vec<Group>,
    error: Option<String>,
    name: String,
}

#[derive(Template)]
#[template(path = "group_detail.html")]
struct GroupDetailTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    group: Group,
    members: Vec<Member>,
    candidates: Vec<User>,
    principal_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct GroupForm {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberForm {
    user_id: Option<String>,
}

fn group_path(group_id: i64) -> String {
    format!("/group/{}", group_id)
}

async fn render_groups(
    state: &WebsiteState,
    session: &Session,
    principal: &User,
    error: Option<String>,
    name: String,
) -> Result<Response, AppError> {
    let groups = list_groups_for(state.database(), principal).await?;
    template_to_response(&GroupsTemplate {
        meta: Meta::authenticated("Groups"),
        flashes: session.take_flashes().await,
        groups,
        error,
        name,
    })
    .map(IntoResponse::into_response)
}

pub async fn groups(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
) -> Result<Response, AppError> {
    render_groups(&state, &session, &principal, None, String::new()).await
}

pub async fn post_group(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Form(input): Form<GroupForm>,
) -> Result<Response, AppError> {
    match create_group(state.database(), &principal, &input.name).await {
        Ok(group) => {
            session
                .flash(FlashLevel::Success, format!("Group \"{}\" created.", group.name))
                .await;
            Ok(Redirect::to(&group_path(group.id)).into_response())
        }
        Err(AppError::Validation(message)) => {
            render_groups(&state, &session, &principal, Some(message), input.name).await
        }
        Err(e) => Err(e),
    }
}

pub async fn group(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Path(group_id): Path<i64>,
) -> Result<Response, AppError> {
    let (group, members) = match load_group(state.database(), &principal, group_id).await {
        Ok(found) => found,
        Err(e) => return flash_redirect(&session, e, "/groups").await,
    };
    let candidates = candidates(state.database(), &members).await?;

    template_to_response(&GroupDetailTemplate {
        meta: Meta::authenticated(group.name.clone()),
        flashes: session.take_flashes().await,
        group,
        members,
        candidates,
        principal_id: principal.id,
    })
    .map(IntoResponse::into_response)
}

pub async fn post_add_member(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Path(group_id): Path<i64>,
    Form(input): Form<AddMemberForm>,
) -> Result<Response, AppError> {
    let user_id = input
        .user_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i64>().ok());

    match add_member(state.database(), &principal, group_id, user_id).await {
        Ok(user) => {
            session
                .flash(
                    FlashLevel::Success,
                    format!("{} was added to the group.", user.username),
                )
                .await;
            Ok(Redirect::to(&group_path(group_id)).into_response())
        }
        Err(e @ AppError::PermissionDenied(_)) => flash_redirect(&session, e, "/groups").await,
        Err(e) => flash_redirect(&session, e, &group_path(group_id)).await,
    }
}

pub async fn post_remove_member(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Form(input): Form<MembershipForm>,
) -> Result<Response, AppError> {
    let group_id = input.group_id()?;
    let to = group_path(group_id);
    match remove_member(state.database(), &principal, group_id, input.user_id()).await {
        Ok(Removal::Removed) => {
            session
                .flash(FlashLevel::Success, "Member removed from the group.")
                .await;
            Ok(Redirect::to(&to).into_response())
        }
        Ok(Removal::AlreadyGone) => {
            session
                .flash(
                    FlashLevel::Info,
                    "User has already been removed from the group.",
                )
                .await;
            Ok(Redirect::to(&to).into_response())
        }
        Err(e @ AppError::PermissionDenied(_)) => flash_redirect(&session, e, "/groups").await,
        Err(e) => flash_redirect(&session, e, &to).await,
    }
}
