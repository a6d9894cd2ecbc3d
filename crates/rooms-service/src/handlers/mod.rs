//! HTTP request handlers for the rooms service.

pub mod avatars;
pub mod health;
pub mod metrics;
pub mod rooms;

pub use avatars::show_avatar;
pub use health::health_check;
pub use metrics::metrics_handler;
