// Domain layer: queue records and board rules.

pub mod board;
pub mod queue;

pub use board::{PALETTE, TileBoard, tiles_to_win};
pub use queue::QueuedPlayer;
