// Use cases layer: matchmaking, game sessions, and the watchdog sweeps.

pub mod game;
pub mod matchmaker;
pub mod watchdog;

pub use game::{GameSession, SessionRegistry};
pub use matchmaker::{MatchQueue, PromotedPlayer};
