use std::time::{Duration, Instant};

// A player waiting in the matchmaking queue.
#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub player_id: String,
    pub name: String,
    pub last_heartbeat: Instant,
}

impl QueuedPlayer {
    // Create a new queue record with a fresh heartbeat timestamp.
    pub fn new(player_id: String, name: String) -> Self {
        Self {
            player_id,
            name,
            last_heartbeat: Instant::now(),
        }
    }

    // Refresh the heartbeat timestamp.
    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    // A player is stale only strictly past the timeout; reaching it exactly
    // is still alive.
    pub fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_heartbeat) > timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_at_exact_timeout_is_not_stale() {
        let player = QueuedPlayer::new("p1".into(), "alice".into());
        let timeout = Duration::from_secs(30);

        let at_limit = player.last_heartbeat + timeout;
        assert!(!player.is_stale(at_limit, timeout));

        let past_limit = at_limit + Duration::from_millis(1);
        assert!(player.is_stale(past_limit, timeout));
    }

    #[test]
    fn heartbeat_refresh_resets_staleness() {
        let mut player = QueuedPlayer::new("p1".into(), "alice".into());
        let timeout = Duration::from_secs(1);
        let later = player.last_heartbeat + Duration::from_secs(5);
        assert!(player.is_stale(later, timeout));

        player.heartbeat();
        assert!(!player.is_stale(Instant::now(), timeout));
    }
}
