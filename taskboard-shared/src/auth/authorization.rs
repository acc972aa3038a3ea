/// Board-scoped authorization
///
/// Every board operation names a [`BoardAction`]. The action's allowed
/// roles come from one policy table ([`BoardAction::allowed_roles`]) and
/// [`authorize`] is the single gate the services call before touching the
/// store.
///
/// # Policy
///
/// | Action | owner | editor | viewer |
/// |---|---|---|---|
/// | view board, list members, connect live | yes | yes | yes |
/// | create/update/move/delete columns and cards | yes | yes | no |
/// | rename, delete, invite | yes | no | no |
///
/// Roles are not ranked. A role is allowed only if it is listed for the
/// action; nothing is inherited.
///
/// # Errors
///
/// A caller without a membership row gets [`AuthzError::NotMember`]; a
/// member whose role is not listed gets [`AuthzError::InsufficientRole`].
/// Both become HTTP 403 but stay distinct for logs and tests.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::authorization::{authorize, BoardAction};
/// use taskboard_shared::store::MemoryBoardStore;
/// use uuid::Uuid;
///
/// # async fn example(board_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryBoardStore::new();
/// let membership = authorize(&store, board_id, user_id, BoardAction::MoveCard).await?;
/// println!("{} may move cards", membership.role);
/// # Ok(())
/// # }
/// ```

use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::models::membership::{BoardMember, BoardRole};
use crate::store::{BoardStore, StoreError};

const ANY_MEMBER: &[BoardRole] = &[BoardRole::Owner, BoardRole::Editor, BoardRole::Viewer];
const CONTRIBUTORS: &[BoardRole] = &[BoardRole::Owner, BoardRole::Editor];
const OWNER_ONLY: &[BoardRole] = &[BoardRole::Owner];

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller has no membership on the board
    #[error("Not a member of board {0}")]
    NotMember(Uuid),

    /// Caller is a member, but their role is not allowed for the action
    #[error("Role {actual} may not {action}")]
    InsufficientRole {
        action: BoardAction,
        actual: BoardRole,
    },

    /// Membership lookup failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Operation kinds that need a board membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardAction {
    ViewBoard,
    ListMembers,
    RenameBoard,
    DeleteBoard,
    InviteMember,
    CreateColumn,
    UpdateColumn,
    DeleteColumn,
    CreateCard,
    UpdateCard,
    MoveCard,
    DeleteCard,
    /// Open a live update connection
    Connect,
}

impl BoardAction {
    /// Every action, for exhaustive policy checks
    pub const ALL: [BoardAction; 13] = [
        BoardAction::ViewBoard,
        BoardAction::ListMembers,
        BoardAction::RenameBoard,
        BoardAction::DeleteBoard,
        BoardAction::InviteMember,
        BoardAction::CreateColumn,
        BoardAction::UpdateColumn,
        BoardAction::DeleteColumn,
        BoardAction::CreateCard,
        BoardAction::UpdateCard,
        BoardAction::MoveCard,
        BoardAction::DeleteCard,
        BoardAction::Connect,
    ];

    /// The policy table
    pub fn allowed_roles(&self) -> &'static [BoardRole] {
        match self {
            BoardAction::ViewBoard | BoardAction::ListMembers | BoardAction::Connect => ANY_MEMBER,

            BoardAction::CreateColumn
            | BoardAction::UpdateColumn
            | BoardAction::DeleteColumn
            | BoardAction::CreateCard
            | BoardAction::UpdateCard
            | BoardAction::MoveCard
            | BoardAction::DeleteCard => CONTRIBUTORS,

            BoardAction::RenameBoard | BoardAction::DeleteBoard | BoardAction::InviteMember => {
                OWNER_ONLY
            }
        }
    }

    /// Whether the action changes board contents
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            BoardAction::ViewBoard | BoardAction::ListMembers | BoardAction::Connect
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoardAction::ViewBoard => "view board",
            BoardAction::ListMembers => "list members",
            BoardAction::RenameBoard => "rename board",
            BoardAction::DeleteBoard => "delete board",
            BoardAction::InviteMember => "invite members",
            BoardAction::CreateColumn => "create columns",
            BoardAction::UpdateColumn => "update columns",
            BoardAction::DeleteColumn => "delete columns",
            BoardAction::CreateCard => "create cards",
            BoardAction::UpdateCard => "update cards",
            BoardAction::MoveCard => "move cards",
            BoardAction::DeleteCard => "delete cards",
            BoardAction::Connect => "connect to live updates",
        }
    }
}

impl fmt::Display for BoardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks up the caller's membership on a board
///
/// # Errors
///
/// [`AuthzError::NotMember`] when there is no membership row.
pub async fn resolve_membership(
    store: &dyn BoardStore,
    board_id: Uuid,
    user_id: Uuid,
) -> Result<BoardMember, AuthzError> {
    store
        .find_membership(board_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember(board_id))
}

/// Checks a resolved membership against the action's allowed roles
pub fn check_role(membership: &BoardMember, action: BoardAction) -> Result<(), AuthzError> {
    if action.allowed_roles().contains(&membership.role) {
        return Ok(());
    }

    Err(AuthzError::InsufficientRole {
        action,
        actual: membership.role,
    })
}

/// Resolves the membership, then requires its role to be allowed for `action`
pub async fn require_role(
    store: &dyn BoardStore,
    board_id: Uuid,
    user_id: Uuid,
    action: BoardAction,
) -> Result<BoardMember, AuthzError> {
    let membership = resolve_membership(store, board_id, user_id).await?;
    check_role(&membership, action)?;
    Ok(membership)
}

/// The authorization gate used by every board operation
pub async fn authorize(
    store: &dyn BoardStore,
    board_id: Uuid,
    user_id: Uuid,
    action: BoardAction,
) -> Result<BoardMember, AuthzError> {
    let result = require_role(store, board_id, user_id, action).await;

    if let Err(ref denied) = result {
        debug!(
            board_id = %board_id,
            user_id = %user_id,
            action = %action,
            reason = %denied,
            "Board access denied"
        );
    }

    result
}
