// In-memory matchmaking queue: FIFO ordering with heartbeat liveness.

use crate::domain::QueuedPlayer;
use crate::interface_adapters::net::Connection;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

// A player handed to the game server by lobby promotion.
#[derive(Clone)]
pub struct PromotedPlayer {
    pub player_id: String,
    pub name: String,
    pub connection: Arc<Connection>,
}

// Queue order plus per-player records and connection handles. Membership is
// identical across all three structures; every mutation keeps them in step.
// Callers hold the single matchmaker mutex around each method and never
// across a send.
#[derive(Default)]
pub struct MatchQueue {
    order: VecDeque<String>,
    players: HashMap<String, QueuedPlayer>,
    connections: HashMap<String, Arc<Connection>>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // Append a player; the caller has already rejected duplicates.
    pub fn enqueue(&mut self, player_id: String, name: String, conn: Arc<Connection>) {
        self.order.push_back(player_id.clone());
        self.players
            .insert(player_id.clone(), QueuedPlayer::new(player_id.clone(), name));
        self.connections.insert(player_id, conn);
    }

    // Refresh a queued player's heartbeat. Unknown ids are ignored; queue
    // order is untouched.
    pub fn heartbeat(&mut self, player_id: &str) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.heartbeat();
        }
    }

    // Remove one player from the queue and both side maps.
    pub fn remove(&mut self, player_id: &str) {
        self.order.retain(|queued| queued != player_id);
        self.players.remove(player_id);
        self.connections.remove(player_id);
    }

    // Players whose heartbeat lapsed, with their connections; nothing is
    // removed here so the caller can notify outside the lock first.
    pub fn stale_players(&self, now: Instant, timeout: Duration) -> Vec<(String, Arc<Connection>)> {
        self.order
            .iter()
            .filter_map(|player_id| {
                let player = self.players.get(player_id)?;
                if !player.is_stale(now, timeout) {
                    return None;
                }
                let conn = self.connections.get(player_id)?.clone();
                Some((player_id.clone(), conn))
            })
            .collect()
    }

    // Dequeue the `lobby_size` oldest players in one step, or nobody at all.
    // Holding the lock across the whole call makes promotion atomic with
    // respect to concurrent enqueues.
    pub fn dequeue_lobby(&mut self, lobby_size: usize) -> Option<Vec<PromotedPlayer>> {
        if self.order.len() < lobby_size {
            return None;
        }

        let mut promoted = Vec::with_capacity(lobby_size);
        for _ in 0..lobby_size {
            let player_id = self.order.pop_front()?;
            let player = self.players.remove(&player_id)?;
            let connection = self.connections.remove(&player_id)?;
            promoted.push(PromotedPlayer {
                player_id,
                name: player.name,
                connection,
            });
        }
        Some(promoted)
    }
}
