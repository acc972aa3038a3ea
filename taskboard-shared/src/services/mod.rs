//! Board services
//!
//! - [`boards::BoardService`]: board lifecycle, invites and the detail view
//! - [`mutations::MutationService`]: column and card changes plus their
//!   live events
//!
//! Every operation runs the same steps in order: authorize through
//! [`crate::auth::authorization::authorize`], check that referenced
//! entities belong to the board, apply the change in one store call, and
//! (for mutations) broadcast. A failure before the store call writes nothing.

use uuid::Uuid;

use crate::auth::authorization::{AuthzError, BoardAction};
use crate::models::membership::BoardRole;
use crate::store::StoreError;

pub mod boards;
pub mod mutations;

pub use boards::{BoardDetail, BoardService, ColumnWithCards};
pub use mutations::{MutationService, NewCard};

/// Longest accepted board, column or card title, in characters
pub const MAX_TITLE_LENGTH: usize = 255;

/// Error type for board services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Caller has no membership on the board
    #[error("Not a member of board {0}")]
    NotAMember(Uuid),

    /// Caller's role is not allowed for the operation
    #[error("Role {actual} may not {action}")]
    InsufficientRole {
        action: BoardAction,
        actual: BoardRole,
    },

    /// Entity missing or outside the caller's board
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate registration or membership
    #[error("{0}")]
    AlreadyExists(String),

    /// Malformed input, e.g. an unknown role
    #[error("{0}")]
    InvalidArgument(String),

    /// Store failure
    #[error(transparent)]
    Store(StoreError),
}

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(board_id) => ServiceError::NotAMember(board_id),
            AuthzError::InsufficientRole { action, actual } => {
                ServiceError::InsufficientRole { action, actual }
            }
            AuthzError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::AlreadyExists(msg),
            StoreError::MissingParent { entity, .. } => ServiceError::NotFound(parent_label(entity)),
            other => ServiceError::Store(other),
        }
    }
}

fn parent_label(entity: &'static str) -> &'static str {
    match entity {
        "board" => "Board",
        "column" => "Column",
        "user" => "User",
        _ => "Record",
    }
}

/// Trims a title and rejects blank or overlong ones
pub fn normalize_title(title: &str) -> ServiceResult<String> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(ServiceError::InvalidArgument("Title must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(ServiceError::InvalidArgument(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }

    Ok(trimmed.to_string())
}
