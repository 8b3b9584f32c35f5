// Request handlers for the two servers, split by listening socket.

pub mod game;
pub mod matchmaker;

pub use game::GameHandler;
pub use matchmaker::MatchmakerHandler;
