//! # Taskboard API Server Library
//!
//! HTTP and WebSocket front end for the Taskboard board service.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors that reject with `ApiError`
//! - `middleware`: Response hardening layers
//! - `routes`: API route handlers and the live update socket

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
