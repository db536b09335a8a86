use serde::Deserialize;

use crate::{
    access::ensure_can_modify_group,
    database::Database,
    errors::AppError,
    log_and_wrap_custom_internal,
    models::{Group, Member, User},
};

#[derive(Debug, Deserialize)]
pub struct MembershipForm {
    pub group_id: Option<String>,
    pub user_id: Option<String>,
}

impl MembershipForm {
    pub fn group_id(&self) -> Result<i64, AppError> {
        self.group_id
            .as_deref()
            .and_then(|id| id.trim().parse::<i64>().ok())
            .ok_or_else(|| AppError::not_found("Group not found"))
    }

    /// Blank or garbled ids read as no user at all.
    pub fn user_id(&self) -> Option<i64> {
        self.user_id.as_deref().and_then(|id| id.trim().parse::<i64>().ok())
    }
}

/// What happened to a member removal that did not fail.
#[derive(Debug, PartialEq, Eq)]
pub enum Removal {
    Removed,
    AlreadyGone,
}

pub async fn create_group(
    database: &Database,
    principal: &User,
    name: &str,
) -> Result<Group, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Enter a group name."));
    }

    let mut tx = database.start_transaction().await?;
    let group = Group::create(name, principal.id, &mut tx).await?;
    tx.commit()
        .await
        .map_err(|e| log_and_wrap_custom_internal!(e))?;

    tracing::info!(group_id = group.id, creator_id = principal.id, "group created");
    Ok(group)
}

pub async fn list_groups_for(database: &Database, principal: &User) -> Result<Vec<Group>, AppError> {
    Group::list_for_user(principal.id, &**database).await
}

async fn find_group(database: &Database, group_id: i64) -> Result<Group, AppError> {
    Group::find(group_id, &**database)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))
}

/// The group and its members, visible to members only.
pub async fn load_group(
    database: &Database,
    principal: &User,
    group_id: i64,
) -> Result<(Group, Vec<Member>), AppError> {
    let group = find_group(database, group_id).await?;
    ensure_can_modify_group(database, principal.id, group.id).await?;
    let members = Group::list_members(group.id, &**database).await?;
    Ok((group, members))
}

pub async fn add_member(
    database: &Database,
    principal: &User,
    group_id: i64,
    user_id: Option<i64>,
) -> Result<User, AppError> {
    let group_id = find_group(database, group_id).await?.id;
    ensure_can_modify_group(database, principal.id, group_id).await?;

    let user = match user_id {
        Some(user_id) => User::find(user_id, &**database).await?,
        None => None,
    }
    .ok_or_else(|| AppError::validation("User not found."))?;

    Group::add_member(group_id, user.id, &**database).await?;
    tracing::info!(group_id, user_id = user.id, added_by = principal.id, "member added");
    Ok(user)
}

pub async fn remove_member(
    database: &Database,
    principal: &User,
    group_id: i64,
    user_id: Option<i64>,
) -> Result<Removal, AppError> {
    let group_id = find_group(database, group_id).await?.id;
    ensure_can_modify_group(database, principal.id, group_id).await?;

    let Some(user_id) = user_id else {
        return Ok(Removal::AlreadyGone);
    };
    if user_id == principal.id {
        return Err(AppError::validation(
            "You cannot remove yourself from the group.",
        ));
    }

    if Group::remove_member(group_id, user_id, &**database).await? {
        tracing::info!(group_id, user_id, removed_by = principal.id, "member removed");
        Ok(Removal::Removed)
    } else {
        Ok(Removal::AlreadyGone)
    }
}

/// Registered users that are not yet members, for the "add member" picker.
pub async fn candidates(database: &Database, members: &[Member]) -> Result<Vec<User>, AppError> {
    let users = User::list_all(&**database).await?;
    Ok(users
        .into_iter()
        .filter(|user| !members.iter().any(|member| member.id == user.id))
        .collect())
}
