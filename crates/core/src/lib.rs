//! Tally Core Library
//!
//! Domain models, scoring rules, team balancing, host authority, and
//! local storage for the Tally watch-party scorekeeper.

pub mod authority;
pub mod error;
pub mod invariants;
pub mod models;
pub mod ratelimit;
pub mod scoring;
pub mod storage;
pub mod teams;

pub use authority::{HostAuthority, RoomAction};
pub use error::{Error, Result};
pub use models::*;
pub use ratelimit::{RateLimiter, COOLDOWN_MS};
pub use scoring::{bump, latest_unvetoed, seed_zero, ScoreDelta, ScoreLedger};
pub use storage::{
    Database, DeviceProfile, DeviceProfileRepository, DeviceProfileStore, ListRepository,
    ListStore, SessionRepository, SessionStore, SessionSummary, Storage,
    MAX_RECOVERABLE_SESSIONS,
};
pub use teams::{TeamBalancer, TeamCounts};
