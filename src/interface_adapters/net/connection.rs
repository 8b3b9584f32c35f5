// Shared handle to the write side of one client socket.

use crate::interface_adapters::net::frame::{CLOSE_FRAME, encode_text_frame};
use serde::Serialize;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

// The read half stays with the connection worker; everything else (handlers,
// watchdogs, session broadcasts) sends through this handle. The writer mutex
// keeps concurrently produced frames from interleaving.
pub struct Connection {
    peer_addr: SocketAddr,
    writer: Mutex<OwnedWriteHalf>,
}

impl Connection {
    pub fn new(writer: OwnedWriteHalf, peer_addr: SocketAddr) -> Arc<Self> {
        Arc::new(Self {
            peer_addr,
            writer: Mutex::new(writer),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    // Send one text frame.
    pub async fn send_text(&self, payload: &str) -> io::Result<()> {
        let frame = encode_text_frame(payload);
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await
    }

    // Serialize and send one JSON message.
    pub async fn send_json<T: Serialize>(&self, message: &T) -> io::Result<()> {
        let payload = serde_json::to_string(message).map_err(io::Error::other)?;
        self.send_text(&payload).await
    }

    // Send a close frame and shut the socket down. Infallible from the
    // caller's perspective; a broken socket is already closed.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.write_all(&CLOSE_FRAME).await;
        let _ = writer.shutdown().await;
    }
}
