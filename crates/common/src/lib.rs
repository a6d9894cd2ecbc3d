//! Common utilities and types shared across the rooms workspace.

#![warn(clippy::pedantic)]

/// Module for shared identifier types
pub mod types;

/// Module for JWT utilities (size limit, key id extraction, iat validation)
pub mod jwt;
