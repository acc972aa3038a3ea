//! Live connection admission
//!
//! A client opens a live connection with a board id and an access token.
//! [`admit`] decides whether it may join, before anything is registered:
//!
//! 1. The token must be a valid access token, else close code **4001**.
//! 2. The user must be a member of the board (any role), else close code **4003**.
//!
//! A store failure during the membership lookup closes with **1011**
//! (internal error) so clients can tell it apart from a rejection.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::authorization::{authorize, AuthzError, BoardAction};
use crate::auth::middleware::{authenticate, AuthContext, AuthError};
use crate::models::membership::BoardMember;
use crate::store::BoardStore;

/// Close code for a missing, malformed or expired token
pub const CLOSE_INVALID_TOKEN: u16 = 4001;

/// Close code for a caller who is not a member of the board
pub const CLOSE_NOT_A_MEMBER: u16 = 4003;

/// Standard WebSocket close code for an unexpected server condition
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Why a live connection was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeRejection {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Not a member of this board")]
    NotAMember,

    #[error("Membership check failed")]
    Unavailable,
}

impl HandshakeRejection {
    /// WebSocket close code to send
    pub fn close_code(&self) -> u16 {
        match self {
            HandshakeRejection::InvalidToken(_) => CLOSE_INVALID_TOKEN,
            HandshakeRejection::NotAMember => CLOSE_NOT_A_MEMBER,
            HandshakeRejection::Unavailable => CLOSE_INTERNAL_ERROR,
        }
    }

    /// Short close reason sent to the client
    pub fn reason(&self) -> &'static str {
        match self {
            HandshakeRejection::InvalidToken(_) => "Invalid token",
            HandshakeRejection::NotAMember => "Not a member",
            HandshakeRejection::Unavailable => "Internal error",
        }
    }
}

/// Admitted caller
#[derive(Debug, Clone)]
pub struct Admission {
    pub auth: AuthContext,
    pub membership: BoardMember,
}

/// Validates the token, then the board membership
///
/// # Errors
///
/// See [`HandshakeRejection`]; nothing is registered on failure.
pub async fn admit(
    store: &dyn BoardStore,
    jwt_secret: &str,
    board_id: Uuid,
    token: Option<&str>,
) -> Result<Admission, HandshakeRejection> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| HandshakeRejection::InvalidToken("missing token".to_string()))?;

    let auth = authenticate(token, jwt_secret).map_err(|err| {
        debug!(board_id = %board_id, error = %err, "Live handshake rejected: bad token");
        let detail = match err {
            AuthError::InvalidToken(msg) | AuthError::InvalidFormat(msg) => msg,
            AuthError::MissingCredentials => "missing token".to_string(),
        };
        HandshakeRejection::InvalidToken(detail)
    })?;

    let membership = authorize(store, board_id, auth.user_id, BoardAction::Connect)
        .await
        .map_err(|err| match err {
            AuthzError::NotMember(_) | AuthzError::InsufficientRole { .. } => {
                HandshakeRejection::NotAMember
            }
            AuthzError::Store(e) => {
                warn!(board_id = %board_id, error = %e, "Live handshake membership lookup failed");
                HandshakeRejection::Unavailable
            }
        })?;

    Ok(Admission { auth, membership })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use crate::models::board::CreateBoard;
    use crate::models::user::CreateUser;
    use crate::store::MemoryBoardStore;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    async fn board_with_owner(store: &MemoryBoardStore) -> (Uuid, Uuid) {
        let owner = store
            .create_user(CreateUser {
                email: "owner@example.com".to_string(),
                display_name: "Owner".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let (board, _) = store
            .create_board(CreateBoard {
                title: "Team".to_string(),
                owner_id: owner.id,
            })
            .await
            .unwrap();
        (board.id, owner.id)
    }

    fn token_for(user_id: Uuid) -> String {
        create_token(&Claims::new(user_id, TokenType::Access), SECRET).unwrap()
    }

    #[tokio::test]
    async fn test_member_is_admitted() {
        let store = MemoryBoardStore::new();
        let (board_id, owner_id) = board_with_owner(&store).await;

        let token = token_for(owner_id);

        let admission = admit(&store, SECRET, board_id, Some(token.as_str()))
            .await
            .unwrap();
        assert_eq!(admission.auth.user_id, owner_id);
        assert_eq!(admission.membership.board_id, board_id);
    }

    #[tokio::test]
    async fn test_expired_token_gets_4001() {
        let store = MemoryBoardStore::new();
        let (board_id, owner_id) = board_with_owner(&store).await;
        let expired = Claims::with_expiration(owner_id, TokenType::Access, Duration::seconds(-5));
        let expired = create_token(&expired, SECRET).unwrap();

        let rejection = admit(&store, SECRET, board_id, Some(expired.as_str()))
            .await
            .unwrap_err();
        assert_eq!(rejection.close_code(), 4001);
    }

    #[tokio::test]
    async fn test_missing_or_garbage_token_gets_4001() {
        let store = MemoryBoardStore::new();
        let (board_id, _) = board_with_owner(&store).await;

        for token in [None, Some(""), Some("not-a-token")] {
            let rejection = admit(&store, SECRET, board_id, token).await.unwrap_err();
            assert_eq!(rejection.close_code(), CLOSE_INVALID_TOKEN, "{token:?}");
        }
    }

    #[tokio::test]
    async fn test_non_member_gets_4003() {
        let store = MemoryBoardStore::new();
        let (board_id, _) = board_with_owner(&store).await;

        let stranger = token_for(Uuid::new_v4());

        let rejection = admit(&store, SECRET, board_id, Some(stranger.as_str()))
            .await
            .unwrap_err();
        assert_eq!(rejection, HandshakeRejection::NotAMember);
        assert_eq!(rejection.close_code(), 4003);
    }
}
