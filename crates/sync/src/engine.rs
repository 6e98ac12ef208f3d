//! The room synchronization engine
//!
//! [`RoomSync`] owns one device's view of a room and runs in one of two
//! modes, chosen at construction and never upgraded back: connected,
//! where every sub-map of the room is a read-through cache of the
//! backend's copy, or local, where this process holds the only copy
//! and acts as a hotseat for several players on one screen.
//!
//! Snapshot callbacks never touch the engine directly. Each decoded
//! patch goes through a channel and is folded in when the owner calls
//! [`RoomSync::pump`], so backend delivery can never re-enter a
//! mutation in progress.
//!
//! Backend failures are soft: a failed write logs, drops the engine to
//! local mode on the last folded snapshot, and applies the change
//! there. Callers never see a transport error.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use tally_core::authority::{HostAuthority, RoomAction};
use tally_core::invariants::assert_room_invariants;
use tally_core::models::{ActionRecord, EventKey, Player, PlayerId, Room, RoomCode};
use tally_core::ratelimit::RateLimiter;
use tally_core::scoring::{self, ScoreDelta};
use tally_core::storage::DeviceProfile;
use tally_core::teams::{TeamBalancer, TeamCounts};

use crate::backend::{paths, Backend, SubscriptionId};
use crate::error::Result;
use crate::outcome::{ActionOutcome, RoomEvent, SyncMode};
use crate::patch::{self, RoomPatch, RoomSection};

/// Current wall clock in epoch milliseconds, the timebase for action
/// records and cooldowns
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

type Observer = Box<dyn Fn(&RoomEvent)>;

/// One device's live session in a room
pub struct RoomSync {
    room: Room,
    mode: SyncMode,
    profile: DeviceProfile,
    backend: Option<Arc<dyn Backend>>,
    subscriptions: Vec<SubscriptionId>,
    patch_tx: Sender<RoomPatch>,
    patch_rx: Receiver<RoomPatch>,
    limiter: RateLimiter,
    /// Local-mode hotseat: who the next tap scores for
    active_player: Option<PlayerId>,
    observers: Vec<Observer>,
}

impl RoomSync {
    fn bare(code: RoomCode, profile: DeviceProfile) -> Self {
        let (patch_tx, patch_rx) = mpsc::channel();
        Self {
            room: Room::new(code),
            mode: SyncMode::Local,
            profile,
            backend: None,
            subscriptions: Vec::new(),
            patch_tx,
            patch_rx,
            limiter: RateLimiter::new(),
            active_player: None,
            observers: Vec::new(),
        }
    }

    /// Start a local-only session with this device's identity as the
    /// first player
    pub fn local(code: RoomCode, profile: DeviceProfile, now_ms: i64) -> Self {
        let mut engine = Self::bare(code, profile);
        let player = engine.profile.as_player(now_ms);
        engine.active_player = Some(player.id.clone());
        engine.room.scores.ensure(&player.id);
        engine.room.players.insert(player.id.clone(), player);
        engine
    }

    /// Resume a previously saved local session
    pub fn resume_local(room: Room, profile: DeviceProfile) -> Self {
        let mut engine = Self::bare(room.code.clone(), profile);
        engine.room = room;
        engine.active_player = if engine.room.players.contains_key(&engine.profile.player_id) {
            Some(engine.profile.player_id.clone())
        } else {
            engine
                .room
                .players_by_join_order()
                .first()
                .map(|p| p.id.clone())
        };
        engine
    }

    /// Join a room through a backend.
    ///
    /// Joining is idempotent: writing our player entry again and
    /// seeding an existing score are both no-ops on rejoin. The host
    /// seat is claimed atomically, so concurrent first joiners elect
    /// exactly one host. If any step fails the engine comes up in
    /// local mode instead, with this device as the only player.
    pub fn connect(
        code: RoomCode,
        profile: DeviceProfile,
        backend: Arc<dyn Backend>,
        now_ms: i64,
    ) -> Self {
        let mut engine = Self::bare(code, profile);
        match engine.try_connect(backend, now_ms) {
            Ok(()) => {
                engine.pump();
                debug!(code = %engine.room.code, "Joined room");
            }
            Err(err) => {
                warn!(%err, "Could not reach backend, starting in local mode");
                engine.teardown_backend();
                let player = engine.profile.as_player(now_ms);
                engine.active_player = Some(player.id.clone());
                engine.room.scores.ensure(&player.id);
                engine.room.players.insert(player.id.clone(), player);
            }
        }
        engine
    }

    fn try_connect(&mut self, backend: Arc<dyn Backend>, now_ms: i64) -> Result<()> {
        let code = self.room.code.clone();
        let player = self.profile.as_player(now_ms);

        backend.put(
            &paths::player(&code, &player.id),
            serde_json::to_value(&player)?,
        )?;
        backend.transact(&paths::score(&code, &player.id), &mut |current| {
            json!(scoring::seed_zero(current.and_then(|v| v.as_i64())))
        })?;
        let candidate = player.id.clone();
        backend.transact(&paths::settings_host(&code), &mut |current| {
            let seated = current.and_then(|v| v.as_str().map(PlayerId::from));
            json!(HostAuthority::claim_if_unset(seated, &candidate).as_str())
        })?;

        self.backend = Some(backend.clone());
        self.mode = SyncMode::Connected;
        self.subscribe_sections(&backend)?;
        Ok(())
    }

    fn subscribe_sections(&mut self, backend: &Arc<dyn Backend>) -> Result<()> {
        let code = &self.room.code;
        let sections: [(String, fn(Value) -> RoomPatch); 4] = [
            (paths::players(code), RoomPatch::players_from_value),
            (paths::scores(code), RoomPatch::scores_from_value),
            (paths::history(code), RoomPatch::history_from_value),
            (paths::settings(code), RoomPatch::settings_from_value),
        ];
        for (path, decode) in sections {
            let tx = Mutex::new(self.patch_tx.clone());
            let id = backend.subscribe(
                &path,
                Box::new(move |value| {
                    if let Ok(tx) = tx.lock() {
                        let _ = tx.send(decode(value));
                    }
                }),
            )?;
            self.subscriptions.push(id);
        }
        Ok(())
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Local-mode hotseat: who the next tap scores for
    pub fn active_player(&self) -> Option<&PlayerId> {
        self.active_player.as_ref()
    }

    /// Whether this device may take privileged actions. Local mode has
    /// no other devices to arbitrate against, so it always may.
    pub fn is_host(&self) -> bool {
        match self.mode {
            SyncMode::Connected => {
                HostAuthority::is_host(&self.room.settings, &self.profile.player_id)
            }
            SyncMode::Local => true,
        }
    }

    /// Register a state-change observer
    pub fn on_event(&mut self, observer: impl Fn(&RoomEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&self, event: RoomEvent) {
        for observer in &self.observers {
            observer(&event);
        }
    }

    /// Fold every pending remote snapshot into the room. Returns how
    /// many patches were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(patch) = self.patch_rx.try_recv() {
            self.apply_patch(patch);
            applied += 1;
        }
        applied
    }

    fn apply_patch(&mut self, patch: RoomPatch) {
        let section = patch.section();
        match patch {
            RoomPatch::Players(players) => {
                self.room.players = players;
                self.rebalance_if_hosting();
            }
            RoomPatch::Scores(scores) => self.room.scores.replace_all(scores),
            RoomPatch::History(history) => self.room.history = history,
            RoomPatch::Settings(settings) => self.room.settings = settings,
        }
        self.emit(match section {
            RoomSection::Players => RoomEvent::PlayersChanged,
            RoomSection::Scores => RoomEvent::ScoresChanged,
            RoomSection::History => RoomEvent::HistoryChanged,
            RoomSection::Settings => RoomEvent::SettingsChanged,
        });
    }

    /// After a players snapshot, the host assigns teams to anyone the
    /// balancer has not placed yet. Only the host writes assignments,
    /// so two devices never race to place the same player.
    fn rebalance_if_hosting(&mut self) {
        if self.mode != SyncMode::Connected
            || !self.is_host()
            || !self.room.settings.team_mode_enabled
            || self.room.settings.roster_locked
        {
            return;
        }
        let mut players = self.room.players.clone();
        let assigned = TeamBalancer::assign_unassigned(&mut players);
        if !assigned.is_empty() {
            self.push_players(&players, &assigned);
        }
    }

    /// Write the listed players back to the backend one by one. Whole
    /// roster puts would clobber concurrent joins. Returns false if the
    /// engine degraded to local mode part way.
    fn push_players(
        &mut self,
        players: &std::collections::BTreeMap<PlayerId, Player>,
        ids: &[PlayerId],
    ) -> bool {
        let code = self.room.code.clone();
        for id in ids {
            let Some(player) = players.get(id) else {
                continue;
            };
            let value = match serde_json::to_value(player) {
                Ok(value) => value,
                Err(err) => {
                    warn!(%err, player = %id, "Could not encode player");
                    continue;
                }
            };
            if !self.backend_put(&paths::player(&code, id), value) {
                return false;
            }
        }
        true
    }

    fn backend_put(&mut self, path: &str, value: Value) -> bool {
        let Some(backend) = self.backend.clone() else {
            return false;
        };
        match backend.put(path, value) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, path, "Backend write failed, dropping to local mode");
                self.degrade_to_local();
                false
            }
        }
    }

    fn backend_transact(
        &mut self,
        path: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Value,
    ) -> Option<Value> {
        let backend = self.backend.clone()?;
        match backend.transact(path, apply) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%err, path, "Backend transaction failed, dropping to local mode");
                self.degrade_to_local();
                None
            }
        }
    }

    fn teardown_backend(&mut self) {
        if let Some(backend) = self.backend.take() {
            for id in self.subscriptions.drain(..) {
                backend.unsubscribe(id);
            }
        }
        self.mode = SyncMode::Local;
    }

    /// Drop to local mode, keeping the last folded snapshot as the
    /// authoritative copy. Pending patches are folded first so the copy
    /// reflects everything the backend delivered before the failure.
    fn degrade_to_local(&mut self) {
        self.teardown_backend();
        while let Ok(patch) = self.patch_rx.try_recv() {
            self.apply_patch(patch);
        }
        if self.active_player.is_none() {
            self.active_player = Some(self.profile.player_id.clone());
        }
        self.emit(RoomEvent::ModeChanged(SyncMode::Local));
    }

    /// Leave the room. The engine keeps working on its local copy.
    pub fn disconnect(&mut self) {
        if self.mode == SyncMode::Connected {
            debug!(code = %self.room.code, "Leaving room");
            self.degrade_to_local();
        }
    }

    fn actor(&self) -> Option<PlayerId> {
        match self.mode {
            SyncMode::Connected => Some(self.profile.player_id.clone()),
            SyncMode::Local => self.active_player.clone(),
        }
    }

    /// Score a tap against an event.
    ///
    /// The pause gate is checked before the rate limiter so a tap
    /// rejected while paused does not burn the cooldown window.
    #[instrument(level = "debug", skip(self, label))]
    pub fn tap(&mut self, event_key: &EventKey, label: &str, now_ms: i64) -> ActionOutcome {
        let Some(actor) = self.actor() else {
            return ActionOutcome::NoPlayers;
        };
        if self.room.settings.game_paused {
            return ActionOutcome::Paused;
        }
        if !self.limiter.try_fire(event_key, now_ms) {
            let retry_in_ms = self.limiter.retry_in(event_key, now_ms).unwrap_or(0);
            return ActionOutcome::RateLimited { retry_in_ms };
        }

        let record = ActionRecord::new(actor, event_key.clone(), label, now_ms);
        if self.mode == SyncMode::Connected {
            let value = match serde_json::to_value(&record) {
                Ok(value) => value,
                Err(err) => {
                    warn!(%err, "Could not encode action record");
                    return self.tap_local(record);
                }
            };
            let code = self.room.code.clone();
            if !self.backend_put(&paths::action(&code, &record.id), value) {
                return self.tap_local(record);
            }
            let delta = ScoreDelta::Award.value();
            let score_path = paths::score(&code, &record.player_id);
            if self
                .backend_transact(&score_path, &mut |current| {
                    json!(scoring::bump(current.and_then(|v| v.as_i64()), delta))
                })
                .is_none()
            {
                // The record landed but the increment did not; the
                // engine is local now, so score it there.
                return self.tap_local(record);
            }
            return ActionOutcome::Submitted {
                player_id: record.player_id,
            };
        }
        self.tap_local(record)
    }

    fn tap_local(&mut self, record: ActionRecord) -> ActionOutcome {
        let player_id = record.player_id.clone();
        self.room.history.insert(record.id.clone(), record);
        let new_score = self.room.scores.apply(&player_id, ScoreDelta::Award);
        self.emit(RoomEvent::HistoryChanged);
        self.emit(RoomEvent::ScoresChanged);
        ActionOutcome::Scored {
            player_id,
            new_score,
        }
    }

    /// Veto the chronologically latest unvetoed tap and revoke its
    /// point. Host only while connected. The target is picked from a
    /// fresh history read, not the cached copy, so the host vetoes what
    /// the room saw last, not what this device saw last.
    #[instrument(level = "debug", skip(self))]
    pub fn veto_latest(&mut self) -> ActionOutcome {
        if !self.is_host() {
            return ActionOutcome::NotHost;
        }
        if self.mode == SyncMode::Connected {
            let Some(backend) = self.backend.clone() else {
                return self.veto_latest_local();
            };
            let code = self.room.code.clone();
            let snapshot = match backend.read_once(&paths::history(&code)) {
                Ok(value) => value.unwrap_or(Value::Null),
                Err(err) => {
                    warn!(%err, "History read failed, dropping to local mode");
                    self.degrade_to_local();
                    return self.veto_latest_local();
                }
            };
            let history = patch::decode_history(snapshot);
            let Some(target) = scoring::latest_unvetoed(&history).cloned() else {
                return ActionOutcome::NothingToVeto;
            };

            if !self.backend_put(&paths::action_vetoed(&code, &target.id), json!(true)) {
                return self.finish_veto_local(target);
            }
            let delta = ScoreDelta::Revoke.value();
            let score_path = paths::score(&code, &target.player_id);
            if self
                .backend_transact(&score_path, &mut |current| {
                    json!(scoring::bump(current.and_then(|v| v.as_i64()), delta))
                })
                .is_none()
            {
                return self.finish_veto_local(target);
            }
            return ActionOutcome::Vetoed {
                action_id: target.id,
                player_id: target.player_id,
            };
        }
        self.veto_latest_local()
    }

    fn veto_latest_local(&mut self) -> ActionOutcome {
        let Some(target) = scoring::latest_unvetoed(&self.room.history).cloned() else {
            return ActionOutcome::NothingToVeto;
        };
        self.finish_veto_local(target)
    }

    fn finish_veto_local(&mut self, target: ActionRecord) -> ActionOutcome {
        if let Some(record) = self.room.history.get_mut(&target.id) {
            record.vetoed = true;
        }
        self.room.scores.apply(&target.player_id, ScoreDelta::Revoke);
        self.emit(RoomEvent::HistoryChanged);
        self.emit(RoomEvent::ScoresChanged);
        ActionOutcome::Vetoed {
            action_id: target.id,
            player_id: target.player_id,
        }
    }

    /// Pause or resume scoring. The pause gate blocks taps only; vetoes
    /// and settings changes pass through, including unpausing itself.
    pub fn toggle_pause(&mut self) -> ActionOutcome {
        debug_assert!(RoomAction::TogglePause.requires_host());
        if !self.is_host() {
            return ActionOutcome::NotHost;
        }
        let next = !self.room.settings.game_paused;
        if self.mode == SyncMode::Connected {
            let path = paths::settings_flag(&self.room.code, "game_paused");
            if self.backend_put(&path, json!(next)) {
                return ActionOutcome::Applied;
            }
        }
        self.room.settings.game_paused = next;
        self.emit(RoomEvent::SettingsChanged);
        ActionOutcome::Applied
    }

    /// Enable or disable team play. Enabling assigns every teamless
    /// player by the balance rule; disabling clears every assignment
    /// and the roster lock with it.
    pub fn toggle_team_mode(&mut self) -> ActionOutcome {
        debug_assert!(RoomAction::ToggleTeamMode.requires_host());
        if !self.is_host() {
            return ActionOutcome::NotHost;
        }
        let enable = !self.room.settings.team_mode_enabled;
        if self.mode == SyncMode::Connected {
            let path = paths::settings_flag(&self.room.code, "team_mode_enabled");
            let lock_path = paths::settings_flag(&self.room.code, "roster_locked");
            if self.backend_put(&path, json!(enable))
                && (enable || self.backend_put(&lock_path, json!(false)))
            {
                let mut players = self.room.players.clone();
                let changed = if enable {
                    TeamBalancer::assign_unassigned(&mut players)
                } else {
                    let assigned: Vec<PlayerId> = players
                        .values()
                        .filter(|p| p.team.is_assigned())
                        .map(|p| p.id.clone())
                        .collect();
                    TeamBalancer::clear_teams(&mut players);
                    assigned
                };
                if self.push_players(&players, &changed) {
                    return ActionOutcome::Applied;
                }
            }
        }
        // Local mode, or the engine just degraded to it
        self.room.settings.team_mode_enabled = enable;
        if enable {
            TeamBalancer::assign_unassigned(&mut self.room.players);
        } else {
            TeamBalancer::clear_teams(&mut self.room.players);
            self.room.settings.roster_locked = false;
        }
        assert_room_invariants(&self.room);
        self.emit(RoomEvent::SettingsChanged);
        self.emit(RoomEvent::PlayersChanged);
        ActionOutcome::Applied
    }

    /// Freeze or unfreeze team reassignment
    pub fn toggle_roster_lock(&mut self) -> ActionOutcome {
        debug_assert!(RoomAction::ToggleRosterLock.requires_host());
        if !self.is_host() {
            return ActionOutcome::NotHost;
        }
        let next = !self.room.settings.roster_locked;
        if self.mode == SyncMode::Connected {
            let path = paths::settings_flag(&self.room.code, "roster_locked");
            if self.backend_put(&path, json!(next)) {
                return ActionOutcome::Applied;
            }
        }
        self.room.settings.roster_locked = next;
        self.emit(RoomEvent::SettingsChanged);
        ActionOutcome::Applied
    }

    /// Move a player to the other team. Players move themselves freely;
    /// moving someone else takes the host seat.
    pub fn switch_team(&mut self, target: &PlayerId) -> ActionOutcome {
        debug_assert!(!RoomAction::SwitchTeam.requires_host());
        if !self.room.settings.team_mode_enabled {
            return ActionOutcome::TeamsDisabled;
        }
        if self.room.settings.roster_locked {
            return ActionOutcome::RosterLocked;
        }
        if target != &self.profile.player_id && !self.is_host() {
            return ActionOutcome::NotHost;
        }
        let Some(player) = self.room.players.get(target) else {
            return ActionOutcome::UnknownPlayer;
        };
        let counts = TeamCounts::of(&self.room.players);
        let next = TeamBalancer::switched_team(player.team, counts);

        if self.mode == SyncMode::Connected {
            let mut updated = player.clone();
            updated.team = next;
            let value = match serde_json::to_value(&updated) {
                Ok(value) => value,
                Err(err) => {
                    warn!(%err, player = %target, "Could not encode player");
                    return ActionOutcome::UnknownPlayer;
                }
            };
            let path = paths::player(&self.room.code.clone(), target);
            if self.backend_put(&path, value) {
                return ActionOutcome::Applied;
            }
        }
        if let Some(player) = self.room.players.get_mut(target) {
            player.team = next;
        }
        self.emit(RoomEvent::PlayersChanged);
        ActionOutcome::Applied
    }

    /// Zero every player's score. Any player may call this; history is
    /// untouched, so the feed still tells the story.
    pub fn reset_scores(&mut self) -> ActionOutcome {
        debug_assert!(!RoomAction::ResetScores.requires_host());
        if self.room.players.is_empty() {
            return ActionOutcome::NoPlayers;
        }
        if self.mode == SyncMode::Connected {
            let zeroed: Map<String, Value> = self
                .room
                .players
                .keys()
                .map(|id| (id.to_string(), json!(0)))
                .collect();
            let path = paths::scores(&self.room.code);
            if self.backend_put(&path, Value::Object(zeroed)) {
                return ActionOutcome::Applied;
            }
        }
        let ids: Vec<PlayerId> = self.room.players.keys().cloned().collect();
        self.room.scores.reset(ids.iter());
        self.emit(RoomEvent::ScoresChanged);
        ActionOutcome::Applied
    }

    /// Add a hotseat player. Connected rooms grow by each device
    /// joining itself, so this is local mode only.
    pub fn add_player(&mut self, display_name: &str, now_ms: i64) -> ActionOutcome {
        if self.mode == SyncMode::Connected {
            return ActionOutcome::LocalOnly;
        }
        let mut rng = rand::thread_rng();
        let id = PlayerId::generate(now_ms, &mut rng);
        let mut player = Player::new(
            id.clone(),
            display_name,
            Player::random_glyph(&mut rng),
            now_ms,
        );
        if self.room.settings.team_mode_enabled && !self.room.settings.roster_locked {
            player.team = TeamBalancer::next_team(TeamCounts::of(&self.room.players));
        }
        self.room.players.insert(id.clone(), player);
        self.room.scores.ensure(&id);
        if self.active_player.is_none() {
            self.active_player = Some(id);
        }
        self.emit(RoomEvent::PlayersChanged);
        ActionOutcome::Applied
    }

    /// Remove a hotseat player. Their history records stay and render
    /// with the unknown-player fallback.
    pub fn remove_player(&mut self, id: &PlayerId) -> ActionOutcome {
        if self.mode == SyncMode::Connected {
            return ActionOutcome::LocalOnly;
        }
        if self.room.players.remove(id).is_none() {
            return ActionOutcome::UnknownPlayer;
        }
        self.room.scores.remove(id);
        if self.active_player.as_ref() == Some(id) {
            self.active_player = self
                .room
                .players_by_join_order()
                .first()
                .map(|p| p.id.clone());
        }
        self.emit(RoomEvent::PlayersChanged);
        self.emit(RoomEvent::ScoresChanged);
        ActionOutcome::Applied
    }

    /// Pick which hotseat player the next tap scores for
    pub fn set_active_player(&mut self, id: &PlayerId) -> ActionOutcome {
        if self.mode == SyncMode::Connected {
            return ActionOutcome::LocalOnly;
        }
        if !self.room.players.contains_key(id) {
            return ActionOutcome::UnknownPlayer;
        }
        self.active_player = Some(id.clone());
        ActionOutcome::Applied
    }

    /// Forget all tap cooldowns, e.g. when switching lists
    pub fn reset_cooldowns(&mut self) {
        self.limiter.reset();
    }
}

impl Drop for RoomSync {
    fn drop(&mut self) {
        self.teardown_backend();
    }
}
