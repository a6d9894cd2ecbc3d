//! Bearer token authentication.
//!
//! - `jwks` - JWKS client with a TTL cache
//! - `jwt` - token validation against cached keys
//! - `claims` - claims of a validated token

pub mod claims;
pub mod jwks;
pub mod jwt;

pub use claims::Claims;
pub use jwks::JwksClient;
pub use jwt::JwtValidator;
