/// Middleware for the API server
///
/// - `security`: response hardening headers
///
/// Request authentication lives in `taskboard_shared::auth::middleware`.

pub mod security;
