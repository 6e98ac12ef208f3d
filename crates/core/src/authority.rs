//! Host authority rules
//!
//! Exactly one player per room arbitrates privileged room-level
//! actions. The host seat is claimed by the first peer to observe it
//! unset, through the backend's atomic get-if-absent transaction;
//! doing this with a plain read-then-write would double-elect under
//! concurrent joins.

use crate::models::{PlayerId, RoomSettings};

/// Everything a peer can ask the engine to do to a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    /// Score a tap for a player
    Tap,
    /// Veto the latest unvetoed tap
    Veto,
    /// Pause or resume scoring
    TogglePause,
    /// Enable or disable team mode
    ToggleTeamMode,
    /// Freeze or unfreeze team reassignment
    ToggleRosterLock,
    /// Move one player to the other team
    SwitchTeam,
    /// Zero every player's score
    ResetScores,
}

impl RoomAction {
    /// Whether the action is reserved to the host in connected mode.
    ///
    /// Team switching is deliberately self-service: a player may move
    /// themself without holding the host seat (the engine separately
    /// requires host authority to move someone else).
    pub fn requires_host(&self) -> bool {
        matches!(
            self,
            RoomAction::Veto
                | RoomAction::TogglePause
                | RoomAction::ToggleTeamMode
                | RoomAction::ToggleRosterLock
        )
    }

    /// Whether `game_paused` blocks the action. Only scoring taps are
    /// gated; veto, lock and the pause toggle itself pass through.
    pub fn blocked_when_paused(&self) -> bool {
        matches!(self, RoomAction::Tap)
    }
}

/// Host seat checks and the election transaction seed
pub struct HostAuthority;

impl HostAuthority {
    /// Get-if-absent seed for the election transaction: an empty seat
    /// goes to the candidate, an occupied seat stays as it is.
    pub fn claim_if_unset(current: Option<PlayerId>, candidate: &PlayerId) -> PlayerId {
        current.unwrap_or_else(|| candidate.clone())
    }

    /// Checked at the mutation boundary, never only at the UI: a
    /// non-host call gets rejected even if injected directly.
    pub fn is_host(settings: &RoomSettings, player_id: &PlayerId) -> bool {
        settings.host_id.as_ref() == Some(player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_empty_seat() {
        let candidate = PlayerId::from("p1");
        assert_eq!(HostAuthority::claim_if_unset(None, &candidate), candidate);
    }

    #[test]
    fn test_claim_keeps_existing_host() {
        let existing = PlayerId::from("p1");
        let candidate = PlayerId::from("p2");
        assert_eq!(
            HostAuthority::claim_if_unset(Some(existing.clone()), &candidate),
            existing
        );
    }

    #[test]
    fn test_is_host() {
        let settings = RoomSettings {
            host_id: Some(PlayerId::from("p1")),
            ..RoomSettings::default()
        };
        assert!(HostAuthority::is_host(&settings, &PlayerId::from("p1")));
        assert!(!HostAuthority::is_host(&settings, &PlayerId::from("p2")));
    }

    #[test]
    fn test_unset_seat_has_no_host() {
        let settings = RoomSettings::default();
        assert!(!HostAuthority::is_host(&settings, &PlayerId::from("p1")));
    }

    #[test]
    fn test_privileged_actions() {
        assert!(RoomAction::Veto.requires_host());
        assert!(RoomAction::TogglePause.requires_host());
        assert!(RoomAction::ToggleTeamMode.requires_host());
        assert!(RoomAction::ToggleRosterLock.requires_host());
        assert!(!RoomAction::Tap.requires_host());
        assert!(!RoomAction::SwitchTeam.requires_host());
        assert!(!RoomAction::ResetScores.requires_host());
    }

    #[test]
    fn test_pause_gates_taps_only() {
        assert!(RoomAction::Tap.blocked_when_paused());
        assert!(!RoomAction::Veto.blocked_when_paused());
        assert!(!RoomAction::TogglePause.blocked_when_paused());
        assert!(!RoomAction::ToggleRosterLock.blocked_when_paused());
    }
}
