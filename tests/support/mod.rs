// Shared primitives for integration tests: an in-process server bootstrap
// and a minimal client-side WebSocket speaking the same RFC 6455 subset.

use quickdraw_server::ServerSettings;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// Start the full server (both listeners plus watchdogs) on ephemeral ports.
pub async fn spawn_server(settings: ServerSettings) -> (SocketAddr, SocketAddr) {
    let matchmaker_listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral matchmaker port");
    let game_listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral game port");
    let matchmaker_addr = matchmaker_listener.local_addr().expect("matchmaker addr");
    let game_addr = game_listener.local_addr().expect("game addr");

    // The server runs until the test runtime is dropped.
    tokio::spawn(quickdraw_server::run(
        matchmaker_listener,
        game_listener,
        settings,
    ));

    (matchmaker_addr, game_addr)
}

// Client half of the websocket conversation. Outgoing frames are masked as
// RFC 6455 requires of clients; incoming server frames are unmasked.
pub struct WsClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

const MASK: [u8; 4] = [0x1c, 0x9e, 0x42, 0x77];

impl WsClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to server");
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let request = format!(
            "GET / HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n"
        );
        writer
            .write_all(request.as_bytes())
            .await
            .expect("send upgrade request");

        let mut status_line = String::new();
        reader
            .read_line(&mut status_line)
            .await
            .expect("read handshake status");
        assert!(
            status_line.contains("101"),
            "unexpected handshake response: {status_line}"
        );
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await.expect("read header");
            if line == "\r\n" || line.is_empty() {
                break;
            }
        }

        Self { reader, writer }
    }

    pub async fn send_json(&mut self, message: &Value) {
        self.send_text(&message.to_string()).await;
    }

    pub async fn send_text(&mut self, payload: &str) {
        let bytes = payload.as_bytes();

        let mut frame = vec![0x81u8];
        match bytes.len() {
            len if len < 126 => frame.push(0x80 | len as u8),
            len if len <= u16::MAX as usize => {
                frame.push(0x80 | 126);
                frame.extend_from_slice(&(len as u16).to_be_bytes());
            }
            len => {
                frame.push(0x80 | 127);
                frame.extend_from_slice(&(len as u64).to_be_bytes());
            }
        }
        frame.extend_from_slice(&MASK);
        frame.extend(bytes.iter().enumerate().map(|(i, b)| b ^ MASK[i % 4]));

        self.writer.write_all(&frame).await.expect("send frame");
    }

    // Next JSON message, or `None` once the server closed the connection.
    pub async fn recv_json(&mut self) -> Option<Value> {
        timeout(RECV_TIMEOUT, self.recv_inner())
            .await
            .expect("timed out waiting for a server message")
    }

    async fn recv_inner(&mut self) -> Option<Value> {
        loop {
            let mut header = [0u8; 2];
            self.reader.read_exact(&mut header).await.ok()?;
            let opcode = header[0] & 0x0f;
            let mut len = u64::from(header[1] & 0x7f);
            if len == 126 {
                let mut ext = [0u8; 2];
                self.reader.read_exact(&mut ext).await.ok()?;
                len = u64::from(u16::from_be_bytes(ext));
            } else if len == 127 {
                let mut ext = [0u8; 8];
                self.reader.read_exact(&mut ext).await.ok()?;
                len = u64::from_be_bytes(ext);
            }
            let mut payload = vec![0u8; len as usize];
            self.reader.read_exact(&mut payload).await.ok()?;

            match opcode {
                0x8 => return None,
                0x1 => {
                    let text = String::from_utf8(payload).expect("utf-8 payload");
                    return Some(serde_json::from_str(&text).expect("json payload"));
                }
                _ => continue,
            }
        }
    }

    // Skip messages until one tagged with the given command arrives.
    pub async fn recv_until_command(&mut self, command: &str) -> Value {
        loop {
            let message = self
                .recv_json()
                .await
                .unwrap_or_else(|| panic!("connection closed while waiting for {command}"));
            if message.get("command").and_then(Value::as_str) == Some(command) {
                return message;
            }
        }
    }

    // Skip messages until a bare status reply (success or error) arrives.
    pub async fn recv_until_status(&mut self) -> Value {
        loop {
            let message = self
                .recv_json()
                .await
                .expect("connection closed while waiting for a status reply");
            if message.get("command").is_none() && message.get("status").is_some() {
                return message;
            }
        }
    }
}
