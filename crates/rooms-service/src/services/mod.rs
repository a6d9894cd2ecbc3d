//! Service layer.
//!
//! - `authorization` - the gate deciding who may act on a room
//! - `identifiers` - CSPRNG-backed friendly ids, meeting ids and access codes
//! - `room_settings` - meeting option retrieval with provider overrides

pub mod authorization;
pub mod identifiers;
pub mod room_settings;

pub use authorization::{authorize_room_action, authorize_room_creation, RoomAction};
pub use room_settings::{DbRoomSettingsGetter, RoomSettingsGetter, RoomSettingsQuery};
