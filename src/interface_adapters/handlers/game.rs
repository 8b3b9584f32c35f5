// Game request handler: colour selection, tile locking, and claims.

use crate::interface_adapters::net::{Connection, RequestHandler};
use crate::interface_adapters::protocol::{
    ErrorReply, GameCommand, PlayerInfo, RawRequest, RequestError, ServerEvent, StatusReply,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::game::GameSession;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

// A reply or broadcast produced under the session lock and sent after it is
// released.
#[derive(Serialize)]
#[serde(untagged)]
enum OutboundMessage {
    Status(StatusReply),
    Event(ServerEvent),
}

struct Outbound {
    conn: Arc<Connection>,
    message: OutboundMessage,
}

impl Outbound {
    fn status(conn: &Arc<Connection>, reply: StatusReply) -> Self {
        Self {
            conn: conn.clone(),
            message: OutboundMessage::Status(reply),
        }
    }

    fn event(conn: &Arc<Connection>, event: ServerEvent) -> Self {
        Self {
            conn: conn.clone(),
            message: OutboundMessage::Event(event),
        }
    }
}

pub struct GameHandler {
    state: Arc<AppState>,
}

impl GameHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    async fn apply(&self, conn: &Arc<Connection>, text: &str) -> Result<(), RequestError> {
        let request = RawRequest::parse(text)?;
        let session_uuid = request
            .game_session_uuid
            .ok_or(RequestError::MissingGameSessionUuid)?;
        let player_id = request.uuid.ok_or(RequestError::MissingPlayerUuid)?;
        let command = request.command.ok_or(RequestError::MissingCommand)?;

        let session = self
            .state
            .sessions
            .get(&session_uuid)
            .await
            .ok_or(RequestError::GameSessionNotFound)?;

        // Apply the command under the session lock, collecting every message
        // to send; all sends happen after the lock is released.
        let outbound = {
            let mut session = session.lock().await;
            if !session.contains_player(&player_id) {
                return Err(RequestError::PlayerNotInSession);
            }
            // Re-bind before anything else so replies and broadcasts reach
            // the connection the player is actually on.
            session.bind_connection(&player_id, conn.clone());
            if session.game_ended {
                return Err(RequestError::GameAlreadyEnded);
            }

            let command = GameCommand::parse(&command, request.index)?;
            apply_command(&mut session, &player_id, conn, command)?
        };

        for Outbound { conn, message } in outbound {
            // Peer send failures are noticed by that peer's own receive loop.
            let _ = conn.send_json(&message).await;
        }
        Ok(())
    }
}

fn apply_command(
    session: &mut GameSession,
    player_id: &str,
    conn: &Arc<Connection>,
    command: GameCommand,
) -> Result<Vec<Outbound>, RequestError> {
    let mut outbound = Vec::new();

    match command {
        GameCommand::PenColourRequest => {
            let colour = session.assign_colour(player_id)?;
            outbound.push(Outbound::event(
                conn,
                ServerEvent::PenColourResponse {
                    status: "success",
                    colour: colour.to_string(),
                },
            ));

            if session.all_colours_assigned() && !session.game_started {
                let players: HashMap<String, PlayerInfo> = session
                    .player_ids
                    .iter()
                    .map(|id| {
                        let info = PlayerInfo {
                            colour: player_colour(session, id),
                            name: session.player_names.get(id).cloned().unwrap_or_default(),
                        };
                        (id.clone(), info)
                    })
                    .collect();
                for peer in session.peer_connections(None) {
                    outbound.push(Outbound::event(
                        &peer,
                        ServerEvent::CurrentPlayers {
                            players: players.clone(),
                        },
                    ));
                }
                session.game_started = true;
            }
        }
        GameCommand::PenDown { index } => {
            session.lock_tile(index, player_id)?;
            outbound.push(Outbound::status(conn, StatusReply::success()));

            for peer in session.peer_connections(Some(player_id)) {
                outbound.push(Outbound::event(
                    &peer,
                    ServerEvent::PenDownBroadcast {
                        index,
                        colour: player_colour(session, player_id),
                    },
                ));
            }
        }
        GameCommand::PenUpTileClaimed { index } | GameCommand::PenUpTileNotClaimed { index } => {
            let claim = matches!(command, GameCommand::PenUpTileClaimed { .. });
            let release = session.release_tile(index, player_id, claim)?;
            outbound.push(Outbound::status(conn, StatusReply::success()));

            let status = if claim {
                "pen_up_tile_claimed"
            } else {
                "pen_up_tile_not_claimed"
            };
            for peer in session.peer_connections(Some(player_id)) {
                outbound.push(Outbound::event(
                    &peer,
                    ServerEvent::PenUpBroadcast {
                        index,
                        colour: player_colour(session, player_id),
                        status: status.to_string(),
                    },
                ));
            }

            if release.won {
                let win = ServerEvent::GameWin {
                    winner_uuid: player_id.to_string(),
                    winner_name: session
                        .player_names
                        .get(player_id)
                        .cloned()
                        .unwrap_or_default(),
                    winner_colour: player_colour(session, player_id),
                };
                for peer in session.peer_connections(None) {
                    outbound.push(Outbound::event(&peer, win.clone()));
                }
            }
        }
    }

    Ok(outbound)
}

fn player_colour(session: &GameSession, player_id: &str) -> String {
    session
        .player_colours
        .get(player_id)
        .copied()
        .unwrap_or_default()
        .to_string()
}

impl RequestHandler for GameHandler {
    async fn handle(&self, conn: &Arc<Connection>, peer_addr: SocketAddr, text: &str) {
        if let Err(err) = self.apply(conn, text).await {
            debug!(peer_addr = %peer_addr, error = %err, "game request rejected");
            let _ = conn.send_json(&ErrorReply::from(err)).await;
        }
    }
}
