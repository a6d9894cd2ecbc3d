//! Rooms Service Library
//!
//! HTTP API for managing conference rooms: listing and searching a user's
//! rooms, creating rooms with generated identifiers and default meeting
//! options, showing and renaming them, managing presentations, deleting
//! rooms with their recordings, and public room lookups for join pages.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - JWT validation against a JWKS endpoint
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics
//! - `models` - Rows, requests and response envelopes
//! - `observability` - Prometheus metrics
//! - `repositories` - Postgres access
//! - `routes` - Axum router setup
//! - `services` - Authorization gate, identifiers, room settings

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
