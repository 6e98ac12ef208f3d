//! Core domain models

mod action;
mod code;
mod list;
mod player;
mod room;

pub use action::{ActionId, ActionRecord, EventKey};
pub use code::{RoomCode, ROOM_CODE_ALPHABET, ROOM_CODE_LEN};
pub use list::{sample_lists, ListSource, TallyList};
pub use player::{Player, PlayerId, Team, AVATAR_GLYPHS};
pub use room::{FeedEntry, Room, RoomSettings, UNKNOWN_PLAYER_GLYPH, UNKNOWN_PLAYER_NAME};
