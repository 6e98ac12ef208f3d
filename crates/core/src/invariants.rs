//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible room states during
//! development. Compiled out in release builds.

use crate::models::{Room, Team};

/// Validate that a room's state is internally consistent
pub fn assert_room_invariants(room: &Room) {
    // Team mode off means nobody carries a team
    if !room.settings.team_mode_enabled {
        debug_assert!(
            room.players.values().all(|p| p.team == Team::None),
            "room {} has team assignments while team mode is disabled",
            room.code
        );
    }

    // History map keys must match the record ids they hold
    for (id, record) in &room.history {
        debug_assert!(
            id == &record.id,
            "room {} history entry keyed {} holds record {}",
            room.code,
            id,
            record.id
        );
    }

    // Players own their map slots
    for (id, player) in &room.players {
        debug_assert!(
            id == &player.id,
            "room {} player keyed {} holds player {}",
            room.code,
            id,
            player.id
        );
    }
}
