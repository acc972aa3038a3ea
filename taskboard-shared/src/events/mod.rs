//! Board change events
//!
//! One [`BoardEvent`] is emitted per committed mutation and fanned out to
//! the board's live connections. On the wire each event is a tagged JSON
//! object:
//!
//! ```text
//! {"type": "card_moved", "data": {"card_id": "…", "from_column": "…", "to_column": "…", "position": 0}}
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::card::Card;
use crate::models::column::Column;

/// Column fields carried by column events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
}

impl From<&Column> for ColumnSummary {
    fn from(column: &Column) -> Self {
        Self {
            id: column.id,
            title: column.title.clone(),
            position: column.position,
        }
    }
}

/// Change notification for one board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BoardEvent {
    CardCreated(Card),

    CardUpdated(Card),

    CardMoved {
        card_id: Uuid,
        from_column: Uuid,
        to_column: Uuid,
        position: i32,
    },

    CardDeleted {
        card_id: Uuid,
    },

    ColumnCreated(ColumnSummary),

    ColumnUpdated(ColumnSummary),

    ColumnDeleted {
        column_id: Uuid,
    },
}

impl BoardEvent {
    /// Wire tag, e.g. `card_moved`
    pub fn kind(&self) -> &'static str {
        match self {
            BoardEvent::CardCreated(_) => "card_created",
            BoardEvent::CardUpdated(_) => "card_updated",
            BoardEvent::CardMoved { .. } => "card_moved",
            BoardEvent::CardDeleted { .. } => "card_deleted",
            BoardEvent::ColumnCreated(_) => "column_created",
            BoardEvent::ColumnUpdated(_) => "column_updated",
            BoardEvent::ColumnDeleted { .. } => "column_deleted",
        }
    }

    /// JSON text frame payload
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
