// Matchmaker request handler: enqueue, heartbeat, and explicit removal.

use crate::interface_adapters::net::{Connection, RequestHandler};
use crate::interface_adapters::protocol::{
    ErrorReply, MatchmakerCommand, QueueReply, RawRequest, RequestError, StatusReply,
};
use crate::interface_adapters::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

pub struct MatchmakerHandler {
    state: Arc<AppState>,
}

impl MatchmakerHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    async fn apply(&self, conn: &Arc<Connection>, text: &str) -> Result<(), RequestError> {
        let request = RawRequest::parse(text)?;
        let player_id = request.uuid.ok_or(RequestError::MissingPlayerUuid)?;
        let command = request.command.ok_or(RequestError::MissingCommand)?;

        match MatchmakerCommand::parse(&command)? {
            MatchmakerCommand::Enqueue => {
                // Mutate under the lock, reply after releasing it.
                let queue_length = {
                    let mut queue = self.state.matchmaker.lock().await;
                    if queue.contains(&player_id) {
                        return Err(RequestError::PlayerAlreadyInQueue);
                    }
                    let name = request
                        .name
                        .filter(|name| !name.is_empty())
                        .ok_or(RequestError::MissingPlayerName)?;
                    queue.enqueue(player_id.clone(), name, conn.clone());
                    queue.len()
                };
                info!(player_id = %player_id, queue_length, "player enqueued");
                let _ = conn.send_json(&QueueReply::success(queue_length)).await;
            }
            MatchmakerCommand::QueueHeartbeat => {
                let queue_length = {
                    let mut queue = self.state.matchmaker.lock().await;
                    if !queue.contains(&player_id) {
                        return Err(RequestError::PlayerNotInQueue);
                    }
                    queue.heartbeat(&player_id);
                    queue.len()
                };
                let _ = conn.send_json(&QueueReply::success(queue_length)).await;
            }
            MatchmakerCommand::RemoveFromQueue => {
                {
                    let queue = self.state.matchmaker.lock().await;
                    if !queue.contains(&player_id) {
                        return Err(RequestError::PlayerNotInQueue);
                    }
                }
                // Reply first, then remove: the client may drop the
                // connection as soon as it reads the acknowledgement.
                let _ = conn.send_json(&StatusReply::success()).await;
                self.state.matchmaker.lock().await.remove(&player_id);
                info!(player_id = %player_id, "player left the queue");
            }
        }
        Ok(())
    }
}

impl RequestHandler for MatchmakerHandler {
    async fn handle(&self, conn: &Arc<Connection>, peer_addr: SocketAddr, text: &str) {
        if let Err(err) = self.apply(conn, text).await {
            debug!(peer_addr = %peer_addr, error = %err, "matchmaker request rejected");
            let _ = conn.send_json(&ErrorReply::from(err)).await;
        }
    }
}
