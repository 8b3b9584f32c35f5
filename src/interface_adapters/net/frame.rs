// WebSocket frame codec: server-side subset of RFC 6455, text frames only,
// no extensions, no fragmentation.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

const OPCODE_TEXT: u8 = 0x1;
const OPCODE_CLOSE: u8 = 0x8;

// Upper bound on a single frame payload; commands are small JSON objects.
const MAX_PAYLOAD_LEN: u64 = 1 << 20;

// Unfragmented close frame with no payload.
pub const CLOSE_FRAME: [u8; 2] = [0x88, 0x00];

struct Frame {
    opcode: u8,
    payload: Vec<u8>,
}

// Read frames until a text frame or end-of-stream. Close frames, EOF, and
// every I/O or protocol error all collapse to `None`: the connection is gone.
pub async fn read_message<R>(reader: &mut R) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = read_frame(reader).await.ok()?;
        match frame.opcode {
            OPCODE_CLOSE => return None,
            OPCODE_TEXT => return String::from_utf8(frame.payload).ok(),
            // Control and binary frames are not part of the protocol.
            _ => continue,
        }
    }
}

async fn read_frame<R>(reader: &mut R) -> io::Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    reader.read_exact(&mut header).await?;

    let opcode = header[0] & 0x0f;
    let masked = header[1] & 0x80 != 0;
    let mut payload_len = u64::from(header[1] & 0x7f);

    if payload_len == 126 {
        let mut ext = [0u8; 2];
        reader.read_exact(&mut ext).await?;
        payload_len = u64::from(u16::from_be_bytes(ext));
    } else if payload_len == 127 {
        let mut ext = [0u8; 8];
        reader.read_exact(&mut ext).await?;
        payload_len = u64::from_be_bytes(ext);
    }

    if payload_len > MAX_PAYLOAD_LEN {
        return Err(io::Error::other("frame payload too large"));
    }

    let mut mask = [0u8; 4];
    if masked {
        reader.read_exact(&mut mask).await?;
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload).await?;
    if masked {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= mask[i % 4];
        }
    }

    Ok(Frame { opcode, payload })
}

// Encode one unfragmented, unmasked text frame (server to client).
pub fn encode_text_frame(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut frame = Vec::with_capacity(bytes.len() + 10);
    frame.push(0x80 | OPCODE_TEXT);

    match bytes.len() {
        len if len < 126 => frame.push(len as u8),
        len if len <= u16::MAX as usize => {
            frame.push(126);
            frame.extend_from_slice(&(len as u16).to_be_bytes());
        }
        len => {
            frame.push(127);
            frame.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }

    frame.extend_from_slice(bytes);
    frame
}
