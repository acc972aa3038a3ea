//! In-process [`BoardStore`]
//!
//! Every operation takes the single store lock, so each call is atomic and
//! position assignment cannot race. Used by the test suites and by
//! `STORE_BACKEND=memory` for running the server without a database.
//!
//! Timestamps come from a monotonic clock: each write gets a `created_at`
//! strictly later than the previous one, so `(position, created_at, id)`
//! ties fall back to insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BoardStore, StoreError, StoreResult};
use crate::models::board::{Board, CreateBoard};
use crate::models::card::{Card, CreateCard, UpdateCard};
use crate::models::column::{Column, CreateColumn, UpdateColumn};
use crate::models::membership::{BoardMember, BoardRole, CreateMembership, MemberView};
use crate::models::user::{CreateUser, User};
use crate::ordering::{next_position_after, sort_siblings, PositionScope, Positioned};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    boards: HashMap<Uuid, Board>,
    members: HashMap<(Uuid, Uuid), BoardMember>,
    columns: HashMap<Uuid, Column>,
    cards: HashMap<Uuid, Card>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Tables {
    fn now(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn column_position(&self, board_id: Uuid) -> i32 {
        next_position_after(
            self.columns
                .values()
                .filter(|c| c.board_id == board_id)
                .map(|c| c.position),
        )
    }

    fn card_position(&self, column_id: Uuid) -> i32 {
        next_position_after(
            self.cards
                .values()
                .filter(|c| c.column_id == column_id)
                .map(|c| c.position),
        )
    }

    fn remove_column(&mut self, column_id: Uuid) -> bool {
        let removed = self.columns.remove(&column_id).is_some();
        if removed {
            self.cards.retain(|_, card| card.column_id != column_id);
        }
        removed
    }
}

/// Store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryBoardStore {
    tables: RwLock<Tables>,
}

impl MemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoardStore for MemoryBoardStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        let taken = tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email));
        if taken {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            display_name: data.display_name,
            password_hash: data.password_hash,
            created_at: tables.now(),
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_board(&self, data: CreateBoard) -> StoreResult<(Board, BoardMember)> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&data.owner_id) {
            return Err(StoreError::MissingParent {
                entity: "user",
                id: data.owner_id,
            });
        }

        let now = tables.now();
        let board = Board {
            id: Uuid::new_v4(),
            title: data.title,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
        };
        let owner = BoardMember {
            board_id: board.id,
            user_id: data.owner_id,
            role: BoardRole::Owner,
            invited_at: now,
        };

        tables.boards.insert(board.id, board.clone());
        tables
            .members
            .insert((board.id, owner.user_id), owner.clone());

        Ok((board, owner))
    }

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        Ok(self.tables.read().await.boards.get(&id).cloned())
    }

    async fn list_boards_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Board>> {
        let tables = self.tables.read().await;

        let mut boards: Vec<Board> = tables
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.boards.get(&m.board_id).cloned())
            .collect();
        boards.sort_by_key(|b| (b.created_at, b.id));

        Ok(boards)
    }

    async fn update_board_title(&self, id: Uuid, title: &str) -> StoreResult<Option<Board>> {
        let mut tables = self.tables.write().await;
        let now = tables.now();

        Ok(tables.boards.get_mut(&id).map(|board| {
            board.title = title.to_string();
            board.updated_at = now;
            board.clone()
        }))
    }

    async fn delete_board(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.boards.remove(&id).is_none() {
            return Ok(false);
        }

        tables.members.retain(|(board_id, _), _| *board_id != id);
        let column_ids: Vec<Uuid> = tables
            .columns
            .values()
            .filter(|c| c.board_id == id)
            .map(|c| c.id)
            .collect();
        for column_id in column_ids {
            tables.remove_column(column_id);
        }

        Ok(true)
    }

    async fn find_membership(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BoardMember>> {
        let tables = self.tables.read().await;
        Ok(tables.members.get(&(board_id, user_id)).cloned())
    }

    async fn add_member(&self, data: CreateMembership) -> StoreResult<BoardMember> {
        let mut tables = self.tables.write().await;
        let key = (data.board_id, data.user_id);

        if tables.members.contains_key(&key) {
            return Err(StoreError::Conflict(
                "user is already a member of this board".to_string(),
            ));
        }
        if !tables.boards.contains_key(&data.board_id) {
            return Err(StoreError::MissingParent {
                entity: "board",
                id: data.board_id,
            });
        }
        if !tables.users.contains_key(&data.user_id) {
            return Err(StoreError::MissingParent {
                entity: "user",
                id: data.user_id,
            });
        }

        let member = BoardMember {
            board_id: data.board_id,
            user_id: data.user_id,
            role: data.role,
            invited_at: tables.now(),
        };
        tables.members.insert(key, member.clone());

        Ok(member)
    }

    async fn list_members(&self, board_id: Uuid) -> StoreResult<Vec<MemberView>> {
        let tables = self.tables.read().await;

        let mut members: Vec<&BoardMember> = tables
            .members
            .values()
            .filter(|m| m.board_id == board_id)
            .collect();
        members.sort_by_key(|m| (m.invited_at, m.user_id));

        Ok(members
            .into_iter()
            .filter_map(|m| {
                tables.users.get(&m.user_id).map(|u| MemberView {
                    user_id: m.user_id,
                    role: m.role,
                    display_name: u.display_name.clone(),
                })
            })
            .collect())
    }

    async fn count_members(&self, board_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .members
            .keys()
            .filter(|(b, _)| *b == board_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn create_column(&self, data: CreateColumn) -> StoreResult<Column> {
        let mut tables = self.tables.write().await;

        if !tables.boards.contains_key(&data.board_id) {
            return Err(StoreError::MissingParent {
                entity: "board",
                id: data.board_id,
            });
        }

        let column = Column {
            id: Uuid::new_v4(),
            board_id: data.board_id,
            title: data.title,
            position: tables.column_position(data.board_id),
            created_at: tables.now(),
        };
        tables.columns.insert(column.id, column.clone());

        Ok(column)
    }

    async fn find_column(&self, id: Uuid) -> StoreResult<Option<Column>> {
        Ok(self.tables.read().await.columns.get(&id).cloned())
    }

    async fn list_columns(&self, board_id: Uuid) -> StoreResult<Vec<Column>> {
        let tables = self.tables.read().await;

        let mut columns: Vec<Column> = tables
            .columns
            .values()
            .filter(|c| c.board_id == board_id)
            .cloned()
            .collect();
        sort_siblings(&mut columns);

        Ok(columns)
    }

    async fn update_column(&self, id: Uuid, data: UpdateColumn) -> StoreResult<Option<Column>> {
        let mut tables = self.tables.write().await;

        Ok(tables.columns.get_mut(&id).map(|column| {
            if let Some(title) = data.title {
                column.title = title;
            }
            if let Some(position) = data.position {
                column.position = position;
            }
            column.clone()
        }))
    }

    async fn delete_column(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.remove_column(id))
    }

    async fn create_card(&self, data: CreateCard) -> StoreResult<Card> {
        let mut tables = self.tables.write().await;

        if !tables.columns.contains_key(&data.column_id) {
            return Err(StoreError::MissingParent {
                entity: "column",
                id: data.column_id,
            });
        }

        let now = tables.now();
        let card = Card {
            id: Uuid::new_v4(),
            column_id: data.column_id,
            title: data.title,
            description: data.description,
            position: tables.card_position(data.column_id),
            assigned_to: None,
            created_by: Some(data.created_by),
            created_at: now,
            updated_at: now,
        };
        tables.cards.insert(card.id, card.clone());

        Ok(card)
    }

    async fn find_card(&self, id: Uuid) -> StoreResult<Option<Card>> {
        Ok(self.tables.read().await.cards.get(&id).cloned())
    }

    async fn list_cards(&self, board_id: Uuid) -> StoreResult<Vec<Card>> {
        let tables = self.tables.read().await;

        let mut cards: Vec<Card> = tables
            .cards
            .values()
            .filter(|card| {
                tables
                    .columns
                    .get(&card.column_id)
                    .is_some_and(|c| c.board_id == board_id)
            })
            .cloned()
            .collect();
        cards.sort_by_key(|c| (c.column_id, c.sort_key()));

        Ok(cards)
    }

    async fn update_card(&self, id: Uuid, data: UpdateCard) -> StoreResult<Option<Card>> {
        let mut tables = self.tables.write().await;
        let now = tables.now();

        Ok(tables.cards.get_mut(&id).map(|card| {
            if let Some(title) = data.title {
                card.title = title;
            }
            if let Some(description) = data.description {
                card.description = Some(description);
            }
            if let Some(assignee) = data.assigned_to {
                card.assigned_to = Some(assignee);
            }
            card.updated_at = now;
            card.clone()
        }))
    }

    async fn move_card(
        &self,
        id: Uuid,
        column_id: Uuid,
        position: i32,
    ) -> StoreResult<Option<Card>> {
        let mut tables = self.tables.write().await;

        if !tables.columns.contains_key(&column_id) {
            return Err(StoreError::MissingParent {
                entity: "column",
                id: column_id,
            });
        }

        let now = tables.now();
        Ok(tables.cards.get_mut(&id).map(|card| {
            card.column_id = column_id;
            card.position = position;
            card.updated_at = now;
            card.clone()
        }))
    }

    async fn delete_card(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.cards.remove(&id).is_some())
    }

    async fn next_position(&self, scope: PositionScope) -> StoreResult<i32> {
        let tables = self.tables.read().await;

        Ok(match scope {
            PositionScope::Board(board_id) => tables.column_position(board_id),
            PositionScope::Column(column_id) => tables.card_position(column_id),
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
