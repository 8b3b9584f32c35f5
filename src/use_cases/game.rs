// Game sessions and the process-wide session registry.

use crate::domain::board::{PALETTE, ReleaseOutcome, TileBoard, tiles_to_win};
use crate::interface_adapters::net::Connection;
use crate::interface_adapters::protocol::RequestError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

const MIN_SESSION_PLAYERS: usize = 2;

/// Result of a successful tile release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRelease {
    pub won: bool,
}

/// One running game session. Shared as `Arc<Mutex<GameSession>>`; every
/// critical section is short and no lock is held across a network send.
pub struct GameSession {
    pub session_uuid: String,
    pub player_ids: Vec<String>,
    pub player_names: HashMap<String, String>,
    pub num_tiles: u32,
    pub tiles_to_win: u32,
    available_colours: VecDeque<&'static str>,
    pub player_colours: HashMap<String, &'static str>,
    colours_requested: HashSet<String>,
    pub player_connections: HashMap<String, Arc<Connection>>,
    last_colour_request: HashMap<String, Instant>,
    pub board: TileBoard,
    pub game_started: bool,
    pub game_ended: bool,
    pub winner: Option<String>,
    colour_selection_timeout: Duration,
}

impl GameSession {
    pub fn new(
        session_uuid: String,
        player_ids: Vec<String>,
        player_names: HashMap<String, String>,
        num_tiles: u32,
        colour_selection_timeout: Duration,
    ) -> Self {
        let created_at = Instant::now();
        let last_colour_request = player_ids
            .iter()
            .map(|player_id| (player_id.clone(), created_at))
            .collect();

        Self {
            session_uuid,
            tiles_to_win: tiles_to_win(num_tiles, player_ids.len()),
            player_names,
            num_tiles,
            available_colours: PALETTE.into(),
            player_colours: HashMap::new(),
            colours_requested: HashSet::new(),
            player_connections: HashMap::new(),
            last_colour_request,
            board: TileBoard::new(),
            game_started: false,
            game_ended: false,
            winner: None,
            colour_selection_timeout,
            player_ids,
        }
    }

    pub fn contains_player(&self, player_id: &str) -> bool {
        self.player_ids.iter().any(|id| id == player_id)
    }

    /// Clients may reconnect mid-session; every request re-binds the handle.
    pub fn bind_connection(&mut self, player_id: &str, conn: Arc<Connection>) {
        self.player_connections.insert(player_id.to_string(), conn);
    }

    /// Hand out the next colour from the palette. Idempotent: a player who
    /// already holds a colour gets the same one back.
    pub fn assign_colour(&mut self, player_id: &str) -> Result<&'static str, RequestError> {
        if let Some(colour) = self.player_colours.get(player_id).copied() {
            return Ok(colour);
        }
        let colour = self
            .available_colours
            .pop_front()
            .ok_or(RequestError::NoColoursAvailable)?;
        self.player_colours.insert(player_id.to_string(), colour);
        self.colours_requested.insert(player_id.to_string());
        self.last_colour_request
            .insert(player_id.to_string(), Instant::now());
        Ok(colour)
    }

    pub fn all_colours_assigned(&self) -> bool {
        self.colours_requested.len() == self.player_ids.len()
    }

    pub fn lock_tile(&mut self, index: u32, player_id: &str) -> Result<(), RequestError> {
        if !self.board.lock(index, player_id) {
            return Err(RequestError::TileAlreadyLocked);
        }
        Ok(())
    }

    /// Release a lock, claiming when asked; a claim that reaches the quota
    /// ends the game on the spot.
    pub fn release_tile(
        &mut self,
        index: u32,
        player_id: &str,
        claim: bool,
    ) -> Result<TileRelease, RequestError> {
        let outcome = self
            .board
            .release(index, player_id, claim)
            .ok_or(RequestError::TileNotLockedByPlayer)?;

        let won = matches!(outcome, ReleaseOutcome::Claimed { owned_count } if owned_count >= self.tiles_to_win);
        if won {
            self.game_ended = true;
            self.winner = Some(player_id.to_string());
            info!(
                session_uuid = %self.session_uuid,
                winner = %player_id,
                "game won"
            );
        }
        Ok(TileRelease { won })
    }

    /// Participants who never picked a colour within the timeout. Started
    /// sessions have no inactive players by definition.
    pub fn inactive_players(&self, now: Instant) -> Vec<String> {
        if self.game_started {
            return Vec::new();
        }
        self.player_ids
            .iter()
            .filter(|player_id| !self.colours_requested.contains(*player_id))
            .filter(|player_id| {
                self.last_colour_request
                    .get(*player_id)
                    .is_some_and(|last| now.saturating_duration_since(*last) > self.colour_selection_timeout)
            })
            .cloned()
            .collect()
    }

    /// Drop a player from the session. Their locks are released, never
    /// claimed; owned tiles and the win quota stay as they are.
    pub fn remove_player(&mut self, player_id: &str) {
        self.player_ids.retain(|id| id != player_id);
        self.player_names.remove(player_id);
        self.player_colours.remove(player_id);
        self.colours_requested.remove(player_id);
        self.player_connections.remove(player_id);
        self.last_colour_request.remove(player_id);
        self.board.release_all_locks(player_id);
    }

    pub fn has_enough_players(&self) -> bool {
        self.player_ids.len() >= MIN_SESSION_PLAYERS
    }

    /// Connections of every current participant except `exclude`.
    pub fn peer_connections(&self, exclude: Option<&str>) -> Vec<Arc<Connection>> {
        self.player_connections
            .iter()
            .filter(|(player_id, _)| exclude != Some(player_id.as_str()))
            .map(|(_, conn)| conn.clone())
            .collect()
    }
}

/// Process-wide map from session uuid to live session. Entries are created by
/// the queue watchdog and destroyed by the session watchdog.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Mutex<GameSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_session(
        &self,
        session_uuid: String,
        player_ids: Vec<String>,
        player_names: HashMap<String, String>,
        num_tiles: u32,
        colour_selection_timeout: Duration,
    ) {
        let session = GameSession::new(
            session_uuid.clone(),
            player_ids,
            player_names,
            num_tiles,
            colour_selection_timeout,
        );
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session_uuid, Arc::new(Mutex::new(session)));
    }

    pub async fn get(&self, session_uuid: &str) -> Option<Arc<Mutex<GameSession>>> {
        let sessions = self.sessions.lock().await;
        sessions.get(session_uuid).cloned()
    }

    pub async fn remove(&self, session_uuid: &str) {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(session_uuid);
    }

    /// Snapshot for the watchdog sweep; the registry lock is released before
    /// any per-session work happens.
    pub async fn snapshot(&self) -> Vec<(String, Arc<Mutex<GameSession>>)> {
        let sessions = self.sessions.lock().await;
        sessions
            .iter()
            .map(|(uuid, session)| (uuid.clone(), session.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_session() -> GameSession {
        let names = HashMap::from([
            ("a".to_string(), "alice".to_string()),
            ("b".to_string(), "bob".to_string()),
        ]);
        GameSession::new(
            "session-1".into(),
            vec!["a".into(), "b".into()],
            names,
            4,
            Duration::from_secs(60),
        )
    }

    #[test]
    fn win_quota_is_fixed_at_creation() {
        let mut session = two_player_session();
        assert_eq!(session.tiles_to_win, 3);
        session.remove_player("b");
        assert_eq!(session.tiles_to_win, 3);
    }

    #[test]
    fn colours_are_handed_out_in_palette_order_and_idempotently() {
        let mut session = two_player_session();
        assert_eq!(session.assign_colour("a"), Ok("red"));
        assert_eq!(session.assign_colour("b"), Ok("blue"));
        // Repeats return the same colour without consuming the palette.
        assert_eq!(session.assign_colour("a"), Ok("red"));
        assert!(session.all_colours_assigned());
    }

    #[test]
    fn ninth_player_exhausts_the_palette() {
        let ids: Vec<String> = (0..9).map(|i| format!("p{i}")).collect();
        let names = ids
            .iter()
            .map(|id| (id.clone(), id.clone()))
            .collect();
        let mut session =
            GameSession::new("big".into(), ids.clone(), names, 64, Duration::from_secs(60));

        for id in &ids[..8] {
            assert!(session.assign_colour(id).is_ok());
        }
        assert_eq!(
            session.assign_colour("p8"),
            Err(RequestError::NoColoursAvailable)
        );
        // The already-assigned players keep their colours.
        assert_eq!(session.assign_colour("p0"), Ok("red"));
    }

    #[test]
    fn win_triggers_exactly_on_the_quota() {
        let mut session = two_player_session();

        for index in 0..2 {
            session.lock_tile(index, "a").unwrap();
            let release = session.release_tile(index, "a", true).unwrap();
            assert!(!release.won);
            assert!(!session.game_ended);
        }

        session.lock_tile(2, "a").unwrap();
        let release = session.release_tile(2, "a", true).unwrap();
        assert!(release.won);
        assert!(session.game_ended);
        assert_eq!(session.winner.as_deref(), Some("a"));
    }

    #[test]
    fn releasing_without_claim_leaves_no_trace() {
        let mut session = two_player_session();
        session.lock_tile(0, "a").unwrap();
        let release = session.release_tile(0, "a", false).unwrap();
        assert!(!release.won);
        assert!(session.lock_tile(0, "b").is_ok());
    }

    #[test]
    fn removing_a_player_frees_their_locks_only() {
        let mut session = two_player_session();
        session.lock_tile(0, "a").unwrap();
        session.release_tile(0, "a", true).unwrap();
        session.lock_tile(1, "a").unwrap();

        session.remove_player("a");

        assert!(!session.contains_player("a"));
        assert!(session.board.is_owned(0));
        assert!(session.lock_tile(1, "b").is_ok());
    }

    #[test]
    fn inactive_players_honour_the_strict_timeout() {
        let mut session = two_player_session();
        let created_at = session.last_colour_request["a"];
        let timeout = Duration::from_secs(60);

        session.assign_colour("a").unwrap();
        assert!(session.inactive_players(created_at + timeout).is_empty());

        let past = created_at + timeout + Duration::from_millis(1);
        assert_eq!(session.inactive_players(past), vec!["b".to_string()]);
    }

    #[test]
    fn started_sessions_report_no_inactive_players() {
        let mut session = two_player_session();
        session.game_started = true;
        let far_future = Instant::now() + Duration::from_secs(3600);
        assert!(session.inactive_players(far_future).is_empty());
    }
}
