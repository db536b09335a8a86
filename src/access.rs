//! Who may see a board and who may change a group.
//!
//! The rules themselves are plain functions over already loaded data; the
//! async helpers below only fetch the membership lists they need.

use crate::{
    database::Database,
    errors::AppError,
    models::{Board, Group},
};

pub fn is_board_owner(principal_id: i64, board: &Board) -> bool {
    board.owner_id == principal_id
}

/// `group_members` are the members of the board's attached group, empty when
/// the board has none.
pub fn can_view_board(principal_id: i64, board: &Board, group_members: &[i64]) -> bool {
    is_board_owner(principal_id, board)
        || (board.owner_group_id.is_some() && group_members.contains(&principal_id))
}

pub fn can_modify_group(principal_id: i64, group_members: &[i64]) -> bool {
    group_members.contains(&principal_id)
}

pub async fn board_members(database: &Database, board: &Board) -> Result<Vec<i64>, AppError> {
    match board.owner_group_id {
        Some(group_id) => Group::member_ids(group_id, &**database).await,
        None => Ok(Vec::new()),
    }
}

pub async fn ensure_can_view_board(
    database: &Database,
    principal_id: i64,
    board: &Board,
    message: &str,
) -> Result<(), AppError> {
    if is_board_owner(principal_id, board) {
        return Ok(());
    }
    let members = board_members(database, board).await?;
    if can_view_board(principal_id, board, &members) {
        Ok(())
    } else {
        tracing::warn!(principal_id, board_id = board.id, "board access denied");
        Err(AppError::permission_denied(message))
    }
}

pub async fn ensure_can_modify_group(
    database: &Database,
    principal_id: i64,
    group_id: i64,
) -> Result<(), AppError> {
    let members = Group::member_ids(group_id, &**database).await?;
    if can_modify_group(principal_id, &members) {
        Ok(())
    } else {
        tracing::warn!(principal_id, group_id, "group modification denied");
        Err(AppError::permission_denied(
            "You have no rights to modify this group.",
        ))
    }
}
