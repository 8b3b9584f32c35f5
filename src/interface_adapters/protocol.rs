// Wire protocol DTOs and request validation for both servers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// Everything a client request may carry; presence is validated per command
// so that each missing field reports its own reason.
#[derive(Debug, Deserialize)]
pub struct RawRequest {
    pub uuid: Option<String>,
    pub command: Option<String>,
    pub game_session_uuid: Option<String>,
    pub name: Option<String>,
    pub index: Option<u32>,
}

impl RawRequest {
    pub fn parse(text: &str) -> Result<Self, RequestError> {
        serde_json::from_str(text).map_err(|_| RequestError::InvalidJson)
    }
}

// The closed set of reasons a request can be rejected. `Display` yields the
// exact wire string placed in the reply's `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    InvalidJson,
    MissingPlayerUuid,
    MissingGameSessionUuid,
    MissingCommand,
    MissingPlayerName,
    MissingTileIndex,
    UnknownCommand,
    PlayerNotInSession,
    PlayerNotInQueue,
    PlayerAlreadyInQueue,
    GameSessionNotFound,
    GameAlreadyEnded,
    TileAlreadyLocked,
    TileNotLockedByPlayer,
    NoColoursAvailable,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RequestError::InvalidJson => "Invalid JSON format",
            RequestError::MissingPlayerUuid => "Missing player UUID",
            RequestError::MissingGameSessionUuid => "Missing game session UUID",
            RequestError::MissingCommand => "Missing command",
            RequestError::MissingPlayerName => "Missing player name",
            RequestError::MissingTileIndex => "Missing tile index",
            RequestError::UnknownCommand => "Unknown command",
            RequestError::PlayerNotInSession => "Player not in game session",
            RequestError::PlayerNotInQueue => "Player not in queue",
            RequestError::PlayerAlreadyInQueue => "Player already in queue",
            RequestError::GameSessionNotFound => "Game session not found",
            RequestError::GameAlreadyEnded => "Game has already ended",
            RequestError::TileAlreadyLocked => "Tile already locked",
            RequestError::TileNotLockedByPlayer => "Tile not locked by this player",
            RequestError::NoColoursAvailable => "No colours available",
        };
        f.write_str(reason)
    }
}

// Matchmaker commands, dispatched by the `command` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchmakerCommand {
    Enqueue,
    QueueHeartbeat,
    RemoveFromQueue,
}

impl MatchmakerCommand {
    pub fn parse(command: &str) -> Result<Self, RequestError> {
        match command {
            "enqueue" => Ok(MatchmakerCommand::Enqueue),
            "queue_heartbeat" => Ok(MatchmakerCommand::QueueHeartbeat),
            "remove_from_queue" => Ok(MatchmakerCommand::RemoveFromQueue),
            _ => Err(RequestError::UnknownCommand),
        }
    }
}

// Game commands, dispatched by the `command` tag. Pen commands carry the
// tile index, validated here so the reason stays precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    PenColourRequest,
    PenDown { index: u32 },
    PenUpTileClaimed { index: u32 },
    PenUpTileNotClaimed { index: u32 },
}

impl GameCommand {
    pub fn parse(command: &str, index: Option<u32>) -> Result<Self, RequestError> {
        match command {
            "pen_colour_request" => Ok(GameCommand::PenColourRequest),
            "pen_down" => {
                let index = index.ok_or(RequestError::MissingTileIndex)?;
                Ok(GameCommand::PenDown { index })
            }
            "pen_up_tile_claimed" => {
                let index = index.ok_or(RequestError::MissingTileIndex)?;
                Ok(GameCommand::PenUpTileClaimed { index })
            }
            "pen_up_tile_not_claimed" => {
                let index = index.ok_or(RequestError::MissingTileIndex)?;
                Ok(GameCommand::PenUpTileNotClaimed { index })
            }
            _ => Err(RequestError::UnknownCommand),
        }
    }
}

// Plain acknowledgement: `{"status":"success"}`.
#[derive(Debug, Serialize)]
pub struct StatusReply {
    pub status: &'static str,
}

impl StatusReply {
    pub fn success() -> Self {
        Self { status: "success" }
    }
}

// Matchmaker acknowledgement carrying the current queue length.
#[derive(Debug, Serialize)]
pub struct QueueReply {
    pub status: &'static str,
    pub queue_length: usize,
}

impl QueueReply {
    pub fn success(queue_length: usize) -> Self {
        Self {
            status: "success",
            queue_length,
        }
    }
}

// Error envelope: `{"status":"error","error":"<reason>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorReply {
    pub status: &'static str,
    pub error: String,
}

impl From<RequestError> for ErrorReply {
    fn from(err: RequestError) -> Self {
        Self {
            status: "error",
            error: err.to_string(),
        }
    }
}

// Per-player entry inside `current_players`.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerInfo {
    pub colour: String,
    pub name: String,
}

// Server-initiated messages, tagged by `command` on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ServerEvent {
    HeartbeatTimeout,
    GameStart {
        game_session_uuid: String,
        lobby_size: usize,
        board_size: u32,
        colour_selection_timeout: u64,
    },
    PenColourResponse {
        status: &'static str,
        colour: String,
    },
    CurrentPlayers {
        players: HashMap<String, PlayerInfo>,
    },
    PenDownBroadcast {
        index: u32,
        colour: String,
    },
    PenUpBroadcast {
        index: u32,
        colour: String,
        status: String,
    },
    GameWin {
        winner_uuid: String,
        winner_name: String,
        winner_colour: String,
    },
    InactivePlayer,
    NotEnoughPlayers,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_malformed_json_with_the_wire_reason() {
        let err = RawRequest::parse("{not json").unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON format");
    }

    #[test]
    fn pen_commands_require_a_tile_index() {
        assert_eq!(
            GameCommand::parse("pen_down", None),
            Err(RequestError::MissingTileIndex)
        );
        assert_eq!(
            GameCommand::parse("pen_up_tile_claimed", None),
            Err(RequestError::MissingTileIndex)
        );
        assert_eq!(
            GameCommand::parse("pen_down", Some(4)),
            Ok(GameCommand::PenDown { index: 4 })
        );
    }

    #[test]
    fn unknown_commands_are_rejected_on_both_servers() {
        assert_eq!(
            MatchmakerCommand::parse("join"),
            Err(RequestError::UnknownCommand)
        );
        assert_eq!(
            GameCommand::parse("erase", Some(1)),
            Err(RequestError::UnknownCommand)
        );
    }

    #[test]
    fn server_events_serialize_with_the_command_tag() {
        let event = ServerEvent::GameStart {
            game_session_uuid: "abc".into(),
            lobby_size: 3,
            board_size: 64,
            colour_selection_timeout: 60,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "command": "game_start",
                "game_session_uuid": "abc",
                "lobby_size": 3,
                "board_size": 64,
                "colour_selection_timeout": 60,
            })
        );

        assert_eq!(
            serde_json::to_value(ServerEvent::HeartbeatTimeout).unwrap(),
            json!({"command": "heartbeat_timeout"})
        );
    }

    #[test]
    fn error_reply_carries_the_exact_reason() {
        let reply = ErrorReply::from(RequestError::TileAlreadyLocked);
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"status": "error", "error": "Tile already locked"})
        );
    }
}
