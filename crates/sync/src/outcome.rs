//! Action outcomes and engine notifications
//!
//! Every mutation request resolves to an [`ActionOutcome`] rather than
//! an error: a rejected tap is an ordinary answer, not a failure. The
//! only errors the engine surfaces are backend transport problems, and
//! those degrade the engine to local mode instead of bubbling up.

use tally_core::models::{ActionId, PlayerId};

/// How the engine tracks room state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Mirroring a shared backend copy; peers see our writes
    Connected,
    /// This process holds the only copy
    Local,
}

/// The answer to a requested room mutation
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Local-mode tap landed; the returned score is final
    Scored { player_id: PlayerId, new_score: i64 },
    /// Connected-mode tap was written; the authoritative score arrives
    /// with the next snapshot
    Submitted { player_id: PlayerId },
    /// A veto landed against this record
    Vetoed {
        action_id: ActionId,
        player_id: PlayerId,
    },
    /// The change went through with nothing else to report
    Applied,
    /// The event key is still cooling down on this device
    RateLimited { retry_in_ms: i64 },
    /// Scoring is paused room-wide
    Paused,
    /// The caller does not hold the host seat
    NotHost,
    /// Team reassignment is frozen
    RosterLocked,
    /// Team mode is not enabled
    TeamsDisabled,
    /// Local mode has nobody to act as
    NoPlayers,
    /// The target player is not in the room
    UnknownPlayer,
    /// Every history record is already vetoed, or there are none
    NothingToVeto,
    /// Roster edits happen per device while connected
    LocalOnly,
}

impl ActionOutcome {
    /// Whether the request was refused rather than applied
    pub fn rejected(&self) -> bool {
        !matches!(
            self,
            ActionOutcome::Scored { .. }
                | ActionOutcome::Submitted { .. }
                | ActionOutcome::Vetoed { .. }
                | ActionOutcome::Applied
        )
    }

    /// A one-line explanation suitable for a toast; `None` for outcomes
    /// that applied cleanly
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            ActionOutcome::RateLimited { .. } => {
                Some("Locked for a moment so nobody can spam it.")
            }
            ActionOutcome::Paused => Some("Scoring is paused."),
            ActionOutcome::NotHost => Some("Only the host can do that."),
            ActionOutcome::RosterLocked => Some("Teams are locked."),
            ActionOutcome::TeamsDisabled => Some("Turn on team mode first."),
            ActionOutcome::NoPlayers => Some("Add at least one player first."),
            ActionOutcome::UnknownPlayer => Some("That player is no longer in the room."),
            ActionOutcome::NothingToVeto => Some("No tap to veto."),
            ActionOutcome::LocalOnly => {
                Some("Manage players from each device while connected.")
            }
            _ => None,
        }
    }
}

/// Fired to observers after the engine's room state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    PlayersChanged,
    ScoresChanged,
    HistoryChanged,
    SettingsChanged,
    ModeChanged(SyncMode),
}
