//! Library crate for memory-match-back, exposing modules for binaries and integration tests.

/// Runtime configuration loaded from `config/app.json`.
pub mod config;
/// Score store contract, entities and backends.
pub mod dao;
mod dto;
mod error;
/// HTTP routes and extractors.
pub mod routes;
/// Game, score and streaming services behind the routes.
pub mod services;
/// Shared state, game rules and session handles.
pub mod state;
