// TCP accept loop and per-connection dispatch.

use crate::interface_adapters::net::connection::Connection;
use crate::interface_adapters::net::frame::read_message;
use crate::interface_adapters::net::handshake::accept_websocket;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, warn};

const LISTEN_BACKLOG: u32 = 128;

// A request handler transforms shared state per decoded text message. It
// never owns the connection: closing is the watchdogs' or the client's call.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(
        &self,
        conn: &Arc<Connection>,
        peer_addr: SocketAddr,
        text: &str,
    ) -> impl Future<Output = ()> + Send;
}

// Bind a listener with SO_REUSEADDR and the fixed backlog.
pub fn bind(host: &str, port: u16) -> io::Result<TcpListener> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(io::Error::other)?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

// Accept connections forever, one worker task per socket.
pub async fn serve<H: RequestHandler>(listener: TcpListener, handler: Arc<H>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let handler = handler.clone();
                tokio::spawn(handle_connection(stream, peer_addr, handler));
            }
            Err(e) => {
                // Transient accept failures (e.g. EMFILE) must not kill the loop.
                warn!(error = %e, "accept failed");
            }
        }
    }
}

async fn handle_connection<H: RequestHandler>(
    stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    match accept_websocket(&mut reader, &mut write_half).await {
        Ok(true) => {}
        Ok(false) | Err(_) => {
            let _ = write_half.shutdown().await;
            return;
        }
    }

    let conn = Connection::new(write_half, peer_addr);
    debug!(peer_addr = %peer_addr, "websocket established");

    while let Some(text) = read_message(&mut reader).await {
        handler.handle(&conn, peer_addr, &text).await;
    }

    // End-of-stream, whatever the cause: close unconditionally.
    conn.close().await;
    debug!(peer_addr = %peer_addr, "connection closed");
}
