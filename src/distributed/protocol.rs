//! Worker protocol
//!
//! This module defines the messages exchanged between the coordinator and its
//! workers. The same messages are used in two places:
//!
//! - over TCP between the RPC dispatcher and a remote [`WordCountService`]
//! - over stdin/stdout between a local dispatcher and its child processes
//!
//! # Serialization Format
//!
//! Messages are serialized with MessagePack (rmp-serde). Count tables are
//! plain string → integer maps, which MessagePack encodes compactly.
//!
//! # Message Flow
//!
//! ```text
//! Dispatcher                       Worker
//!     |                              |
//!     |---- HEALTH(version) -------->|
//!     |<--- HEALTH_OK(node_id) ------|
//!     |                              |
//!     |---- MAP_CHUNK(text) -------->|
//!     |<--- MAP_RESULT(counts) ------|
//!     |            ...               |
//! ```
//!
//! Any request may be answered with ERROR instead.
//!
//! A local child counts a whole block with one reply. The block is streamed
//! as a `MAP_BLOCK(units)` header followed by `units` `MAP_CHUNK` frames, so no
//! single frame grows with the block:
//!
//! ```text
//! Dispatcher                       Child
//!     |---- MAP_BLOCK(n) ----------->|
//!     |---- MAP_CHUNK(text) x n ---->|
//!     |<--- MAP_RESULT(counts) ------|
//! ```
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```
//!
//! [`WordCountService`]: crate::distributed::WordCountService

use crate::count::CountMapping;
use crate::error::WordFreqError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Increment this when making breaking changes to the protocol.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 1024 * 1024 * 1024;

/// Status string returned by a healthy worker
pub const HEALTH_OK: &str = "ok";

/// Protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Liveness probe (Dispatcher → Worker)
    Health { protocol_version: u32 },

    /// Liveness reply (Worker → Dispatcher)
    HealthOk { node_id: String, status: String },

    /// Count the words of one chunk (Dispatcher → Worker)
    MapChunk { text: String },

    /// Start of a block of `units` chunks to count on the worker's thread
    /// pool (Dispatcher → Worker)
    ///
    /// Followed by exactly `units` `MapChunk` frames. Only local child
    /// processes accept this.
    MapBlock { units: u64 },

    /// Partial count table (Worker → Dispatcher)
    MapResult { counts: CountMapping },

    /// Request failed (Worker → Dispatcher)
    Error { node_id: String, error: String },
}

impl Message {
    /// Short name used in logs and protocol errors
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Health { .. } => "HEALTH",
            Message::HealthOk { .. } => "HEALTH_OK",
            Message::MapChunk { .. } => "MAP_CHUNK",
            Message::MapBlock { .. } => "MAP_BLOCK",
            Message::MapResult { .. } => "MAP_RESULT",
            Message::Error { .. } => "ERROR",
        }
    }
}

/// Serialize a message to a length-prefixed frame
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    encode_frame(msg, MAX_FRAME_LEN)
}

pub(crate) fn encode_frame(msg: &Message, max_len: usize) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg).context("Failed to serialize message")?;

    if msg_bytes.len() > max_len {
        anyhow::bail!("Message too large: {} bytes (max {})", msg_bytes.len(), max_len);
    }

    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

fn check_frame_len(len_buf: [u8; 4], max_len: usize) -> Result<usize> {
    let msg_len = u32::from_le_bytes(len_buf) as usize;
    if msg_len > max_len {
        anyhow::bail!("Message too large: {} bytes (max {})", msg_len, max_len);
    }
    Ok(msg_len)
}

fn truncated_header(filled: usize) -> anyhow::Error {
    WordFreqError::Protocol(format!(
        "stream closed inside a frame header ({} of 4 bytes)",
        filled
    ))
    .into()
}

fn decode_body(msg_buf: &[u8], msg_len: usize) -> Result<Message> {
    if msg_buf.len() < msg_len {
        return Err(WordFreqError::Protocol(format!(
            "stream closed inside a frame body ({} of {} bytes)",
            msg_buf.len(),
            msg_len
        ))
        .into());
    }
    rmp_serde::from_slice(msg_buf).context("Failed to deserialize message")
}

/// Read the next message from an async stream
///
/// Returns `Ok(None)` only if the peer closed the stream before the first
/// byte of a frame. A close anywhere inside a frame is an error.
pub async fn read_message<R>(stream: &mut R) -> Result<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match stream.read(&mut len_buf[filled..]).await {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(truncated_header(filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e).context("Failed to read message length"),
        }
    }

    // The body buffer grows with the bytes actually received.
    let msg_len = check_frame_len(len_buf, MAX_FRAME_LEN)?;
    let mut msg_buf = Vec::new();
    (&mut *stream)
        .take(msg_len as u64)
        .read_to_end(&mut msg_buf)
        .await
        .context("Failed to read message body")?;

    decode_body(&msg_buf, msg_len).map(Some)
}

/// Write a message to an async stream and flush it
pub async fn write_message<W>(stream: &mut W, msg: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;

    stream.write_all(&framed).await.context("Failed to write message")?;
    stream.flush().await.context("Failed to flush stream")?;

    Ok(())
}

/// Blocking counterpart of [`read_message`] for pipes
pub fn read_message_blocking<R: Read>(reader: &mut R) -> Result<Option<Message>> {
    read_frame_blocking(reader, MAX_FRAME_LEN)
}

pub(crate) fn read_frame_blocking<R: Read>(reader: &mut R, max_len: usize) -> Result<Option<Message>> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(truncated_header(filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e).context("Failed to read message length"),
        }
    }

    let msg_len = check_frame_len(len_buf, max_len)?;
    let mut msg_buf = Vec::new();
    Read::take(&mut *reader, msg_len as u64)
        .read_to_end(&mut msg_buf)
        .context("Failed to read message body")?;

    decode_body(&msg_buf, msg_len).map(Some)
}

/// Blocking counterpart of [`write_message`] for pipes
pub fn write_message_blocking<W: Write>(writer: &mut W, msg: &Message) -> Result<()> {
    write_frame_blocking(writer, msg, MAX_FRAME_LEN)
}

pub(crate) fn write_frame_blocking<W: Write>(writer: &mut W, msg: &Message, max_len: usize) -> Result<()> {
    let framed = encode_frame(msg, max_len)?;
    writer.write_all(&framed).context("Failed to write message")?;
    writer.flush().context("Failed to flush stream")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_map_result_survives_framing() {
        let mut counts = CountMapping::new();
        counts.insert("the".to_string(), 42);
        counts.insert("fox".to_string(), 1);
        let msg = Message::MapResult { counts: counts.clone() };

        let bytes = serialize_message(&msg).unwrap();
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(len + 4, bytes.len());

        let mut reader = Cursor::new(bytes);
        assert_eq!(
            read_message_blocking(&mut reader).unwrap(),
            Some(Message::MapResult { counts })
        );
    }

    #[test]
    fn test_blocking_stream_of_messages() {
        let mut buf = Vec::new();
        write_message_blocking(&mut buf, &Message::MapChunk { text: "a b".into() }).unwrap();
        write_message_blocking(
            &mut buf,
            &Message::Error {
                node_id: "n1".into(),
                error: "boom".into(),
            },
        )
        .unwrap();

        let mut reader = Cursor::new(buf);
        assert_eq!(
            read_message_blocking(&mut reader).unwrap(),
            Some(Message::MapChunk { text: "a b".into() })
        );
        assert!(matches!(
            read_message_blocking(&mut reader).unwrap(),
            Some(Message::Error { .. })
        ));
        assert_eq!(read_message_blocking(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut buf = (u32::MAX).to_le_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 8]);
        assert!(read_message_blocking(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn test_frame_limit_applies_to_both_sides() {
        let msg = Message::MapChunk { text: "x".repeat(100) };
        assert!(encode_frame(&msg, 64).is_err());
        assert!(write_frame_blocking(&mut Vec::new(), &msg, 64).is_err());

        let bytes = serialize_message(&msg).unwrap();
        assert!(read_frame_blocking(&mut Cursor::new(bytes.clone()), 64).is_err());
        assert_eq!(read_frame_blocking(&mut Cursor::new(bytes), 1024).unwrap(), Some(msg));
    }

    #[test]
    fn test_close_inside_header_is_an_error() {
        let bytes = serialize_message(&Message::Health { protocol_version: 1 }).unwrap();
        for cut in 1..4 {
            let err = read_message_blocking(&mut Cursor::new(bytes[..cut].to_vec())).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<WordFreqError>(),
                Some(WordFreqError::Protocol(_))
            ));
        }
        assert_eq!(read_message_blocking(&mut Cursor::new(Vec::new())).unwrap(), None);
    }

    #[test]
    fn test_close_inside_body_is_an_error() {
        let bytes = serialize_message(&Message::MapChunk { text: "hello".into() }).unwrap();
        let truncated = bytes[..bytes.len() - 1].to_vec();
        assert!(read_message_blocking(&mut Cursor::new(truncated)).is_err());
    }

    #[test]
    fn test_short_body_after_large_length() {
        let mut buf = ((MAX_FRAME_LEN - 1) as u32).to_le_bytes().to_vec();
        buf.extend_from_slice(b"abc");
        let err = read_message_blocking(&mut Cursor::new(buf)).unwrap_err();
        assert!(err.to_string().contains("3 of"));
    }

    #[tokio::test]
    async fn test_async_stream_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);
        let header = Message::MapBlock { units: 2 };
        let chunk = Message::MapChunk { text: "two two".into() };
        write_message(&mut client, &header).await.unwrap();
        write_message(&mut client, &chunk).await.unwrap();
        drop(client);

        assert_eq!(read_message(&mut server).await.unwrap(), Some(header));
        assert_eq!(read_message(&mut server).await.unwrap(), Some(chunk));
        assert_eq!(read_message(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_async_close_inside_header_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[7u8, 0]).await.unwrap();
        drop(client);
        assert!(read_message(&mut server).await.is_err());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Message::Health { protocol_version: 1 }.kind(), "HEALTH");
        assert_eq!(Message::MapBlock { units: 3 }.kind(), "MAP_BLOCK");
        assert_eq!(Message::MapResult { counts: CountMapping::new() }.kind(), "MAP_RESULT");
    }
}
