/// Database plumbing for the Postgres store
///
/// - `pool`: connection pool creation and health checks
/// - `migrations`: embedded schema migrations
///
/// Model queries live in [`crate::models`]; the transactional store that
/// composes them lives in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
