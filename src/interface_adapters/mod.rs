// Interface adapters: wire protocol, request handlers, and socket plumbing.

pub mod handlers;
pub mod net;
pub mod protocol;
pub mod state;

pub use state::AppState;
