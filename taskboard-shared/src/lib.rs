//! # Taskboard Shared Library
//!
//! Domain types, persistence and board logic used by the Taskboard API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `db`: connection pool and migrations
//! - `store`: the `BoardStore` record store (Postgres and in-memory)
//! - `ordering`: sibling positions for columns and cards
//! - `auth`: passwords, JWTs, request authentication and board roles
//! - `services`: board lifecycle and column/card mutations
//! - `events`: board change events
//! - `live`: per-board live connection registry and handshake

pub mod auth;
pub mod db;
pub mod events;
pub mod live;
pub mod models;
pub mod ordering;
pub mod services;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
