/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh and the current user
/// - `boards`: Board lifecycle, invites and members
/// - `columns`: Column mutations
/// - `cards`: Card mutations including moves
/// - `live`: WebSocket live updates

pub mod auth;
pub mod boards;
pub mod cards;
pub mod columns;
pub mod health;
pub mod live;
