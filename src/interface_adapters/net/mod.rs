// Socket plumbing: RFC 6455 framing, upgrade handshake, and the accept loop.

pub mod connection;
pub mod frame;
pub mod handshake;
pub mod listener;

pub use connection::Connection;
pub use listener::{RequestHandler, bind, serve};
