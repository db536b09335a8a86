use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use serde::Deserialize;

use crate::{
    access::is_board_owner,
    auth::Principal,
    errors::AppError,
    models::{Board, Card, CardStatus, Group, User},
    sessions::{Flash, FlashLevel, Session},
    state::WebsiteState,
    website::{flash_redirect, template_to_response, Meta},
};

use super::{
    api::move_card_route,
    services::{
        attach_group, create_board, create_card, delete_board, detach_group, group_by_status,
        list_boards_for, list_cards_for, load_board, load_card, update_card_detail, CardForm,
        Column,
    },
};

pub fn routes(state: WebsiteState) -> Router<WebsiteState> {
    Router::new()
        .route("/boards", get(boards).post(post_board))
        .route("/board/add_group", post(add_group))
        .route("/board/remove_group", post(remove_group))
        .route("/board/{board_id}", get(board).post(post_card))
        .route("/board/{board_id}/delete", post(remove_board))
        .route(
            "/board/{board_id}/card/{card_id}",
            get(card_detail).post(post_card_detail),
        )
        .route("/card/move", post(move_card_route))
        .with_state(state)
}

#[derive(Template)]
#[template(path = "boards.html")]
struct BoardsTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    boards: Vec<Board>,
    principal_id: i64,
    error: Option<String>,
    name: String,
}

#[derive(Template)]
#[template(path = "board.html")]
struct BoardTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    board: Board,
    is_owner: bool,
    columns: Vec<Column>,
    statuses: &'static [CardStatus],
    groups: Vec<Group>,
    attached_group: Option<Group>,
    error: Option<String>,
}

#[derive(Template)]
#[template(path = "card_detail.html")]
struct CardDetailTemplate<'a> {
    meta: Meta<'a>,
    flashes: Vec<Flash>,
    board: Board,
    card: Card,
    description: String,
    deadline: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BoardForm {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct GroupLinkForm {
    board_id: Option<String>,
    group_id: Option<String>,
}

impl GroupLinkForm {
    /// A missing or garbled board id points at no board at all.
    fn board_id(&self) -> Result<i64, AppError> {
        parse_id(self.board_id.as_deref()).ok_or_else(|| AppError::not_found("Board not found"))
    }

    fn group_id(&self) -> Option<i64> {
        parse_id(self.group_id.as_deref())
    }
}

fn parse_id(value: Option<&str>) -> Option<i64> {
    value.and_then(|id| id.trim().parse::<i64>().ok())
}

#[derive(Debug, Deserialize)]
pub struct CardDetailForm {
    #[serde(default)]
    task_description: String,
    #[serde(default)]
    deadline: String,
}

fn board_path(board_id: i64) -> String {
    format!("/board/{}", board_id)
}

async fn render_boards(
    state: &WebsiteState,
    session: &Session,
    principal: &User,
    error: Option<String>,
    name: String,
) -> Result<Response, AppError> {
    let boards = list_boards_for(state.database(), principal).await?;
    template_to_response(&BoardsTemplate {
        meta: Meta::authenticated("Boards"),
        flashes: session.take_flashes().await,
        boards,
        principal_id: principal.id,
        error,
        name,
    })
    .map(IntoResponse::into_response)
}

pub async fn boards(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
) -> Result<Response, AppError> {
    render_boards(&state, &session, &principal, None, String::new()).await
}

pub async fn post_board(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Form(input): Form<BoardForm>,
) -> Result<Response, AppError> {
    match create_board(state.database(), &principal, &input.name).await {
        Ok(board) => {
            session
                .flash(FlashLevel::Success, format!("Board \"{}\" created.", board.name))
                .await;
            Ok(Redirect::to("/boards").into_response())
        }
        Err(AppError::Validation(message)) => {
            render_boards(&state, &session, &principal, Some(message), input.name).await
        }
        Err(e) => Err(e),
    }
}

async fn render_board(
    state: &WebsiteState,
    session: &Session,
    principal: &User,
    board: Board,
    error: Option<String>,
) -> Result<Response, AppError> {
    let database = state.database();
    let cards = list_cards_for(database, &board).await?;
    let groups = Group::list_for_user(principal.id, &**database).await?;
    let attached_group = match board.owner_group_id {
        Some(group_id) => Group::find(group_id, &**database).await?,
        None => None,
    };

    template_to_response(&BoardTemplate {
        meta: Meta::authenticated(board.name.clone()),
        flashes: session.take_flashes().await,
        is_owner: is_board_owner(principal.id, &board),
        board,
        columns: group_by_status(cards),
        statuses: &CardStatus::ALL,
        groups,
        attached_group,
        error,
    })
    .map(IntoResponse::into_response)
}

pub async fn board(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Path(board_id): Path<i64>,
) -> Result<Response, AppError> {
    match load_board(state.database(), &principal, board_id).await {
        Ok(board) => render_board(&state, &session, &principal, board, None).await,
        Err(e) => flash_redirect(&session, e, "/boards").await,
    }
}

pub async fn post_card(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Path(board_id): Path<i64>,
    Form(input): Form<CardForm>,
) -> Result<Response, AppError> {
    let board = match load_board(state.database(), &principal, board_id).await {
        Ok(board) => board,
        Err(e) => return flash_redirect(&session, e, "/boards").await,
    };

    match create_card(state.database(), &principal, &board, input).await {
        Ok(card) => {
            session
                .flash(FlashLevel::Success, format!("Task \"{}\" added.", card.name))
                .await;
            Ok(Redirect::to(&board_path(board.id)).into_response())
        }
        Err(AppError::Validation(message)) => {
            render_board(&state, &session, &principal, board, Some(message)).await
        }
        Err(e) => flash_redirect(&session, e, "/boards").await,
    }
}

pub async fn remove_board(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Path(board_id): Path<i64>,
) -> Result<Response, AppError> {
    match delete_board(state.database(), &principal, board_id).await {
        Ok(()) => {
            session.flash(FlashLevel::Success, "Board deleted.").await;
            Ok(Redirect::to("/boards").into_response())
        }
        Err(e) => flash_redirect(&session, e, "/boards").await,
    }
}

pub async fn add_group(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Form(input): Form<GroupLinkForm>,
) -> Result<Response, AppError> {
    let board_id = input.board_id()?;
    let to = board_path(board_id);
    let Some(group_id) = input.group_id() else {
        return flash_redirect(&session, AppError::validation("Choose a group."), &to).await;
    };

    match attach_group(state.database(), &principal, board_id, group_id).await {
        Ok(_) => {
            session
                .flash(FlashLevel::Success, "The group now has access to the board.")
                .await;
            Ok(Redirect::to(&to).into_response())
        }
        Err(e) => flash_redirect(&session, e, &to).await,
    }
}

pub async fn remove_group(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Form(input): Form<GroupLinkForm>,
) -> Result<Response, AppError> {
    let board_id = input.board_id()?;
    let to = board_path(board_id);
    match detach_group(state.database(), &principal, board_id).await {
        Ok(_) => {
            session
                .flash(FlashLevel::Success, "The board is no longer shared with the group.")
                .await;
            Ok(Redirect::to(&to).into_response())
        }
        Err(e) => flash_redirect(&session, e, &to).await,
    }
}

async fn render_card(
    session: &Session,
    board: Board,
    card: Card,
    submitted: Option<CardDetailForm>,
    error: Option<String>,
) -> Result<Response, AppError> {
    let (description, deadline) = match submitted {
        Some(form) => (form.task_description, form.deadline),
        None => (card.task_description.clone(), card.deadline_input()),
    };
    template_to_response(&CardDetailTemplate {
        meta: Meta::authenticated(card.name.clone()),
        flashes: session.take_flashes().await,
        board,
        card,
        description,
        deadline,
        error,
    })
    .map(IntoResponse::into_response)
}

pub async fn card_detail(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Path((board_id, card_id)): Path<(i64, i64)>,
) -> Result<Response, AppError> {
    match load_card(state.database(), &principal, board_id, card_id).await {
        Ok((board, card)) => render_card(&session, board, card, None, None).await,
        Err(e) => flash_redirect(&session, e, "/boards").await,
    }
}

pub async fn post_card_detail(
    State(state): State<WebsiteState>,
    Extension(session): Extension<Session>,
    Principal(principal): Principal,
    Path((board_id, card_id)): Path<(i64, i64)>,
    Form(input): Form<CardDetailForm>,
) -> Result<Response, AppError> {
    let (board, mut card) = match load_card(state.database(), &principal, board_id, card_id).await
    {
        Ok(found) => found,
        Err(e) => return flash_redirect(&session, e, "/boards").await,
    };

    match update_card_detail(
        state.database(),
        &mut card,
        &input.task_description,
        &input.deadline,
    )
    .await
    {
        Ok(()) => {
            session.flash(FlashLevel::Success, "Task updated.").await;
            let to = format!("{}/card/{}", board_path(board.id), card.id);
            Ok(Redirect::to(&to).into_response())
        }
        Err(AppError::Validation(message)) => {
            render_card(&session, board, card, Some(input), Some(message)).await
        }
        Err(e) => Err(e),
    }
}
