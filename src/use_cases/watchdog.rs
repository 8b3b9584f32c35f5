// Background sweeps: queue liveness and lobby promotion, session liveness
// and teardown. Both loops tick once per second, forever.

use crate::interface_adapters::net::Connection;
use crate::interface_adapters::protocol::ServerEvent;
use crate::use_cases::game::SessionRegistry;
use crate::use_cases::matchmaker::MatchQueue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

// Scan the matchmaking queue: evict silent players, then form lobbies while
// enough players are waiting.
pub async fn queue_watchdog(
    matchmaker: Arc<Mutex<MatchQueue>>,
    sessions: Arc<SessionRegistry>,
    lobby_size: usize,
    heartbeat_timeout: Duration,
    num_tiles: u32,
    colour_selection_timeout: Duration,
) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        evict_stale_players(&matchmaker, heartbeat_timeout).await;
        promote_lobbies(
            &matchmaker,
            &sessions,
            lobby_size,
            num_tiles,
            colour_selection_timeout,
        )
        .await;
    }
}

async fn evict_stale_players(matchmaker: &Mutex<MatchQueue>, heartbeat_timeout: Duration) {
    // Collect under the lock, notify outside it.
    let stale = {
        let queue = matchmaker.lock().await;
        queue.stale_players(Instant::now(), heartbeat_timeout)
    };

    for (player_id, conn) in stale {
        warn!(player_id = %player_id, "heartbeat timeout; evicting from queue");
        let _ = conn.send_json(&ServerEvent::HeartbeatTimeout).await;
        conn.close().await;
        matchmaker.lock().await.remove(&player_id);
    }
}

async fn promote_lobbies(
    matchmaker: &Mutex<MatchQueue>,
    sessions: &SessionRegistry,
    lobby_size: usize,
    num_tiles: u32,
    colour_selection_timeout: Duration,
) {
    loop {
        let session_uuid = Uuid::new_v4().to_string();

        // One lock hold dequeues the whole lobby, so no player can be in the
        // queue and in a session at the same time.
        let promoted = {
            let mut queue = matchmaker.lock().await;
            queue.dequeue_lobby(lobby_size)
        };
        let Some(promoted) = promoted else {
            break;
        };
        if promoted.len() != lobby_size {
            warn!(
                dequeued = promoted.len(),
                lobby_size, "short lobby dequeue; aborting promotion"
            );
            continue;
        }

        let player_ids: Vec<String> = promoted
            .iter()
            .map(|player| player.player_id.clone())
            .collect();
        let player_names: HashMap<String, String> = promoted
            .iter()
            .map(|player| (player.player_id.clone(), player.name.clone()))
            .collect();

        info!(
            session_uuid = %session_uuid,
            players = ?player_ids,
            "lobby formed; creating game session"
        );
        sessions
            .create_session(
                session_uuid.clone(),
                player_ids,
                player_names,
                num_tiles,
                colour_selection_timeout,
            )
            .await;

        // The matchmaker connection ends here; the client reconnects to the
        // game port with the session uuid it just learned.
        let start = ServerEvent::GameStart {
            game_session_uuid: session_uuid.clone(),
            lobby_size,
            board_size: num_tiles,
            colour_selection_timeout: colour_selection_timeout.as_secs(),
        };
        for player in promoted {
            if player.connection.send_json(&start).await.is_err() {
                debug!(player_id = %player.player_id, "game start notice failed");
            }
            player.connection.close().await;
        }
    }
}

// Scan unstarted game sessions: evict players who never picked a colour,
// then tear down sessions that fell below the minimum.
pub async fn session_watchdog(sessions: Arc<SessionRegistry>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        sweep_sessions(&sessions).await;
    }
}

async fn sweep_sessions(sessions: &SessionRegistry) {
    for (session_uuid, session) in sessions.snapshot().await {
        let mut evicted: Vec<(String, Option<Arc<Connection>>)> = Vec::new();
        let mut teardown: Option<Vec<Arc<Connection>>> = None;

        {
            let mut session = session.lock().await;
            if session.game_started {
                continue;
            }
            let now = Instant::now();
            for player_id in session.inactive_players(now) {
                let conn = session.player_connections.get(&player_id).cloned();
                session.remove_player(&player_id);
                evicted.push((player_id, conn));
            }
            if !session.has_enough_players() {
                session.game_ended = true;
                teardown = Some(session.peer_connections(None));
            }
        }

        for (player_id, conn) in evicted {
            info!(
                session_uuid = %session_uuid,
                player_id = %player_id,
                "colour selection timed out; removing player"
            );
            if let Some(conn) = conn {
                let _ = conn.send_json(&ServerEvent::InactivePlayer).await;
                conn.close().await;
            }
        }

        if let Some(remaining) = teardown {
            info!(session_uuid = %session_uuid, "not enough players; tearing down session");
            for conn in remaining {
                let _ = conn.send_json(&ServerEvent::NotEnoughPlayers).await;
                conn.close().await;
            }
            sessions.remove(&session_uuid).await;
        }
    }
}
