//! # Rooms Test Utilities
//!
//! Shared test utilities for the rooms service.
//!
//! This crate provides:
//! - Deterministic Ed25519 keys and token signing (`crypto_fixtures`)
//! - Database fixtures for users, rooms, recordings and attachments (`fixtures`)
//! - Server test harness with a mocked JWKS endpoint (`TestRoomsServer`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rooms_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> Result<()> {
//!     let server = TestRoomsServer::spawn(pool).await?;
//!     let user_id = create_test_user(server.pool(), "Alice").await?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/rooms", server.url()))
//!         .bearer_auth(server.token_for(user_id)?)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod fixtures;
pub mod server_harness;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use fixtures::*;
pub use server_harness::*;
