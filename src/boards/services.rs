use chrono::Utc;
use serde::Deserialize;

use crate::{
    access::{ensure_can_modify_group, ensure_can_view_board, is_board_owner},
    database::Database,
    deadline,
    errors::AppError,
    models::{Board, Card, CardStatus, Group, NewCard, User},
};

#[derive(Debug, Default, Deserialize)]
pub struct CardForm {
    #[serde(default)]
    pub name: String,
    pub status: Option<String>,
    pub task_creator: Option<String>,
    pub task_assignee: Option<String>,
    pub task_description: Option<String>,
    /// Older form field name for the description.
    pub description: Option<String>,
}

impl CardForm {
    /// Validates every field before anything is written.
    pub fn into_new_card(self, principal: &User) -> Result<NewCard, AppError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(AppError::validation("Task name cannot be empty."));
        }

        let status = match self.status.as_deref() {
            None => CardStatus::default(),
            Some(status) => status
                .parse()
                .map_err(|_| AppError::validation("Invalid task status."))?,
        };

        let task_creator = self
            .task_creator
            .as_deref()
            .map(str::trim)
            .filter(|creator| !creator.is_empty())
            .unwrap_or(principal.display_name())
            .to_owned();

        let task_description = self
            .task_description
            .or(self.description)
            .unwrap_or_default()
            .trim()
            .to_owned();

        Ok(NewCard {
            name,
            task_creator,
            task_assignee: self.task_assignee.unwrap_or_default().trim().to_owned(),
            task_description,
            status,
        })
    }
}

pub async fn create_board(
    database: &Database,
    principal: &User,
    name: &str,
) -> Result<Board, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Enter a board name."));
    }
    let board = Board::create(name, principal.id, &**database).await?;
    tracing::info!(board_id = board.id, owner_id = principal.id, "board created");
    Ok(board)
}

/// Own boards first, newest first, then the ones shared through groups.
pub async fn list_boards_for(database: &Database, principal: &User) -> Result<Vec<Board>, AppError> {
    let mut boards = Board::list_owned_by(principal.id, &**database).await?;
    for board in Board::list_shared_with(principal.id, &**database).await? {
        if !boards.iter().any(|b| b.id == board.id) {
            boards.push(board);
        }
    }
    Ok(boards)
}

pub async fn load_board(
    database: &Database,
    principal: &User,
    board_id: i64,
) -> Result<Board, AppError> {
    let board = Board::find(board_id, &**database)
        .await?
        .ok_or_else(|| AppError::not_found("Board not found"))?;
    ensure_can_view_board(
        database,
        principal.id,
        &board,
        "You do not have access to this board.",
    )
    .await?;
    Ok(board)
}

pub async fn delete_board(
    database: &Database,
    principal: &User,
    board_id: i64,
) -> Result<(), AppError> {
    let board = load_board(database, principal, board_id).await?;
    if !is_board_owner(principal.id, &board) {
        return Err(AppError::permission_denied(
            "Only the board owner can delete it.",
        ));
    }
    board.delete(&**database).await?;
    tracing::info!(board_id, owner_id = principal.id, "board deleted");
    Ok(())
}

pub async fn attach_group(
    database: &Database,
    principal: &User,
    board_id: i64,
    group_id: i64,
) -> Result<Board, AppError> {
    let mut board = Board::find(board_id, &**database)
        .await?
        .ok_or_else(|| AppError::not_found("Board not found"))?;
    let group = Group::find(group_id, &**database)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;

    ensure_can_modify_group(database, principal.id, group.id).await?;
    if !is_board_owner(principal.id, &board) {
        return Err(AppError::permission_denied(
            "Only the board owner can change its group.",
        ));
    }

    board.set_group(Some(group.id), &**database).await?;
    tracing::info!(board_id, group_id, "board attached to group");
    Ok(board)
}

pub async fn detach_group(
    database: &Database,
    principal: &User,
    board_id: i64,
) -> Result<Board, AppError> {
    let mut board = Board::find(board_id, &**database)
        .await?
        .ok_or_else(|| AppError::not_found("Board not found"))?;

    if board.owner_group_id.is_none() {
        return Err(AppError::validation("The board is not attached to a group."));
    }
    if !is_board_owner(principal.id, &board) {
        return Err(AppError::permission_denied(
            "Only the board owner can change its group.",
        ));
    }

    board.set_group(None, &**database).await?;
    tracing::info!(board_id, "board detached from its group");
    Ok(board)
}

pub async fn create_card(
    database: &Database,
    principal: &User,
    board: &Board,
    form: CardForm,
) -> Result<Card, AppError> {
    ensure_can_view_board(
        database,
        principal.id,
        board,
        "You do not have access to this board.",
    )
    .await?;
    let new_card = form.into_new_card(principal)?;
    let card = Card::create(board.id, new_card, Utc::now(), &**database).await?;
    tracing::info!(card_id = card.id, board_id = board.id, status = %card.status, "card created");
    Ok(card)
}

pub async fn list_cards_for(database: &Database, board: &Board) -> Result<Vec<Card>, AppError> {
    Card::list_for_board(board.id, &**database).await
}

pub async fn load_card(
    database: &Database,
    principal: &User,
    board_id: i64,
    card_id: i64,
) -> Result<(Board, Card), AppError> {
    let board = load_board(database, principal, board_id).await?;
    let card = Card::find_on_board(board.id, card_id, &**database)
        .await?
        .ok_or_else(|| AppError::not_found("Card not found"))?;
    Ok((board, card))
}

/// On a malformed deadline nothing is written.
pub async fn update_card_detail(
    database: &Database,
    card: &mut Card,
    description: &str,
    deadline_text: &str,
) -> Result<(), AppError> {
    let deadline = deadline::parse_input(deadline_text)?;
    card.set_detail(description.trim().to_owned(), deadline, &**database)
        .await?;
    tracing::info!(card_id = card.id, "card detail updated");
    Ok(())
}

pub async fn move_card(
    database: &Database,
    principal: &User,
    card_id: i64,
    new_status: &str,
) -> Result<Card, AppError> {
    let mut card = Card::find(card_id, &**database)
        .await?
        .ok_or_else(|| AppError::not_found("Card not found"))?;
    let board = Board::find(card.board_id, &**database)
        .await?
        .ok_or_else(|| AppError::not_found("Board not found"))?;
    ensure_can_view_board(database, principal.id, &board, "Permission denied").await?;

    let status: CardStatus = new_status.parse()?;
    card.set_status(status, &**database).await?;
    tracing::info!(card_id, board_id = board.id, status = %status, "card moved");
    Ok(card)
}

pub struct Column {
    pub status: CardStatus,
    pub cards: Vec<Card>,
}

/// Splits cards into the four columns keeping their relative order.
pub fn group_by_status(cards: Vec<Card>) -> Vec<Column> {
    let mut columns: Vec<Column> = CardStatus::ALL
        .iter()
        .map(|status| Column {
            status: *status,
            cards: Vec::new(),
        })
        .collect();
    for card in cards {
        if let Some(column) = columns.iter_mut().find(|c| c.status == card.status) {
            column.cards.push(card);
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::TestDatabase;

    async fn user(database: &Database, username: &str) -> User {
        User::create(username, "hash", &**database).await.unwrap()
    }

    async fn group_with(database: &Database, members: &[&User]) -> Group {
        let mut tx = database.start_transaction().await.unwrap();
        let group = Group::create("Team", members[0].id, &mut tx).await.unwrap();
        tx.commit().await.unwrap();
        for member in &members[1..] {
            Group::add_member(group.id, member.id, &**database)
                .await
                .unwrap();
        }
        group
    }

    fn card_form(name: &str, status: Option<&str>) -> CardForm {
        CardForm {
            name: name.into(),
            status: status.map(str::to_owned),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_board_name_is_required() {
        let database = TestDatabase::setup().await;
        let alice = user(&database, "alice").await;
        assert!(matches!(
            create_board(&database, &alice, "   ").await,
            Err(AppError::Validation(_))
        ));
        let board = create_board(&database, &alice, "  Sprint 1 ").await.unwrap();
        assert_eq!(board.name, "Sprint 1");
    }

    #[tokio::test]
    async fn test_board_listing_order_and_deduplication() {
        let database = TestDatabase::setup().await;
        let alice = user(&database, "alice").await;
        let bob = user(&database, "bob").await;
        let group = group_with(&database, &[&alice, &bob]).await;

        let first = create_board(&database, &alice, "First").await.unwrap();
        let second = create_board(&database, &alice, "Second").await.unwrap();
        let shared = create_board(&database, &bob, "Shared").await.unwrap();
        attach_group(&database, &bob, shared.id, group.id).await.unwrap();
        // Alice's own board attached to her group must not show up twice.
        attach_group(&database, &alice, first.id, group.id).await.unwrap();

        let ids: Vec<i64> = list_boards_for(&database, &alice)
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id, shared.id]);
    }

    #[tokio::test]
    async fn test_card_defaults() {
        let database = TestDatabase::setup().await;
        let alice = user(&database, "alice").await;
        let board = create_board(&database, &alice, "Sprint 1").await.unwrap();

        let card = create_card(&database, &alice, &board, card_form(" Draft roadmap ", None))
            .await
            .unwrap();
        assert_eq!(card.name, "Draft roadmap");
        assert_eq!(card.status, CardStatus::Ideas);
        assert_eq!(card.task_creator, "alice");
        assert!(card.deadline.is_none());
    }

    #[tokio::test]
    async fn test_invalid_card_is_never_written() {
        let database = TestDatabase::setup().await;
        let alice = user(&database, "alice").await;
        let board = create_board(&database, &alice, "Sprint 1").await.unwrap();

        assert!(create_card(&database, &alice, &board, card_form("Task", Some("archived")))
            .await
            .is_err());
        assert!(create_card(&database, &alice, &board, card_form("  ", Some("todo")))
            .await
            .is_err());
        assert!(list_cards_for(&database, &board).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cards_are_listed_newest_first() {
        let database = TestDatabase::setup().await;
        let alice = user(&database, "alice").await;
        let board = create_board(&database, &alice, "Sprint 1").await.unwrap();
        let older = create_card(&database, &alice, &board, card_form("Older", None))
            .await
            .unwrap();
        let newer = create_card(&database, &alice, &board, card_form("Newer", Some("done")))
            .await
            .unwrap();

        let ids: Vec<i64> = list_cards_for(&database, &board)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_move_card_rules() {
        let database = TestDatabase::setup().await;
        let bob = user(&database, "bob").await;
        let carol = user(&database, "carol").await;
        let board = create_board(&database, &bob, "Bob's").await.unwrap();
        let card = create_card(&database, &bob, &board, card_form("Task", None))
            .await
            .unwrap();

        let moved = move_card(&database, &bob, card.id, "wip").await.unwrap();
        assert_eq!(moved.status, CardStatus::Wip);

        assert!(matches!(
            move_card(&database, &carol, card.id, "done").await,
            Err(AppError::PermissionDenied(message)) if message == "Permission denied"
        ));
        assert!(matches!(
            move_card(&database, &bob, card.id, "archived").await,
            Err(AppError::Validation(message)) if message == "Invalid status"
        ));
        assert!(matches!(
            move_card(&database, &bob, card.id + 100, "done").await,
            Err(AppError::NotFound(message)) if message == "Card not found"
        ));

        let stored = Card::find(card.id, &**database.database())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, CardStatus::Wip);
    }

    #[tokio::test]
    async fn test_group_members_can_move_cards_of_attached_boards() {
        let database = TestDatabase::setup().await;
        let bob = user(&database, "bob").await;
        let dave = user(&database, "dave").await;
        let group = group_with(&database, &[&bob, &dave]).await;
        let board = create_board(&database, &bob, "Shared").await.unwrap();
        let card = create_card(&database, &bob, &board, card_form("Task", None))
            .await
            .unwrap();

        assert!(move_card(&database, &dave, card.id, "todo").await.is_err());
        attach_group(&database, &bob, board.id, group.id).await.unwrap();
        assert!(move_card(&database, &dave, card.id, "todo").await.is_ok());
        detach_group(&database, &bob, board.id).await.unwrap();
        assert!(move_card(&database, &dave, card.id, "done").await.is_err());
    }

    #[tokio::test]
    async fn test_group_attachment_rules() {
        let database = TestDatabase::setup().await;
        let bob = user(&database, "bob").await;
        let dave = user(&database, "dave").await;
        let erin = user(&database, "erin").await;
        let group = group_with(&database, &[&bob, &dave]).await;
        let board = create_board(&database, &bob, "Bob's").await.unwrap();

        // Not a member of the group.
        assert!(matches!(
            attach_group(&database, &erin, board.id, group.id).await,
            Err(AppError::PermissionDenied(_))
        ));
        // A member, but not the owner.
        assert!(matches!(
            attach_group(&database, &dave, board.id, group.id).await,
            Err(AppError::PermissionDenied(_))
        ));
        assert!(matches!(
            detach_group(&database, &bob, board.id).await,
            Err(AppError::Validation(_))
        ));

        attach_group(&database, &bob, board.id, group.id).await.unwrap();
        assert!(matches!(
            detach_group(&database, &dave, board.id).await,
            Err(AppError::PermissionDenied(_))
        ));
        let board = detach_group(&database, &bob, board.id).await.unwrap();
        assert!(board.owner_group_id.is_none());
    }

    #[tokio::test]
    async fn test_deleting_a_board_deletes_its_cards() {
        let database = TestDatabase::setup().await;
        let alice = user(&database, "alice").await;
        let carol = user(&database, "carol").await;
        let board = create_board(&database, &alice, "Sprint 1").await.unwrap();
        let card = create_card(&database, &alice, &board, card_form("Task", None))
            .await
            .unwrap();

        assert!(delete_board(&database, &carol, board.id).await.is_err());
        delete_board(&database, &alice, board.id).await.unwrap();

        assert!(Card::find(card.id, &**database.database())
            .await
            .unwrap()
            .is_none());
        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cards WHERE board_id NOT IN (SELECT id FROM boards);",
        )
        .fetch_one(&**database.database())
        .await
        .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_malformed_deadline_leaves_the_card_untouched() {
        let database = TestDatabase::setup().await;
        let alice = user(&database, "alice").await;
        let board = create_board(&database, &alice, "Sprint 1").await.unwrap();
        let mut card = create_card(&database, &alice, &board, card_form("Task", None))
            .await
            .unwrap();

        update_card_detail(&database, &mut card, " notes ", "25.12.2025 18:30")
            .await
            .unwrap();
        assert!(update_card_detail(&database, &mut card, "changed", "25/12/2025")
            .await
            .is_err());

        let stored = Card::find(card.id, &**database.database())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.task_description, "notes");
        assert_eq!(stored.deadline_input(), "25.12.2025 18:30");
    }

    #[test]
    fn test_cards_are_grouped_into_the_four_columns() {
        let card = |id, status| Card {
            id,
            board_id: 1,
            name: format!("card {id}"),
            task_creator: String::new(),
            task_assignee: String::new(),
            task_description: String::new(),
            deadline: None,
            created_at: Utc::now(),
            status,
        };
        let columns = group_by_status(vec![
            card(3, CardStatus::Done),
            card(2, CardStatus::Ideas),
            card(1, CardStatus::Ideas),
        ]);
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0].status, CardStatus::Ideas);
        assert_eq!(
            columns[0].cards.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert!(columns[1].cards.is_empty());
        assert_eq!(columns[3].cards[0].id, 3);
    }
}
