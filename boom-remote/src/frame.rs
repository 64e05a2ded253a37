//! Length-prefixed framing used on the remote control socket.
//!
//! Wire format (both directions, after the plain-text handshake line):
//! ```text
//! [tag:4][body_len:4][body:body_len]
//! ```
//! Both header words are little-endian u32. Outbound requests always carry
//! [`REQUEST_TAG`] as the tag; the tag on inbound frames is opaque and never
//! validated. Inbound bodies are plain text for the handshake ack and JSON
//! afterwards.
//!
//! The socket gives no message boundaries, so frames are assembled from the
//! byte stream with [`read_exact_within`], which reads in small chunks and
//! gives up (with a short result) once its deadline passes.

use std::time::Duration;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use boom_shared::protocol::{HEADER_LEN, REQUEST_TAG};
use crate::error::{BoomError, Result};

/// Upper bound on a single read call, keeps us from consuming bytes that
/// belong to the next frame.
pub const READ_CHUNK: usize = 2;

/// Most we reserve up front for a read; the length comes from the peer.
const MAX_PREALLOC: usize = 64 * 1024;

/// One complete inbound frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// First header word, meaning unknown
    pub tag: u32,
    pub body: Vec<u8>,
}

/// Outcome of reading one frame off the stream
#[derive(Debug, Clone, PartialEq)]
pub enum FrameRead {
    Complete(Frame),
    /// The deadline passed (or the peer hung up) before the header or the
    /// body was complete. `body` holds whatever body bytes did arrive and is
    /// empty when the header itself was short.
    Short {
        expected: usize,
        received: usize,
        body: Vec<u8>,
    },
}

impl FrameRead {
    /// Body bytes received, complete or not
    pub fn body(&self) -> &[u8] {
        match self {
            FrameRead::Complete(frame) => &frame.body,
            FrameRead::Short { body, .. } => body,
        }
    }

    /// Body bytes decoded as UTF-8 text (invalid sequences replaced)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, FrameRead::Complete(_))
    }

    /// Treat a short frame as an error
    pub fn into_frame(self) -> Result<Frame> {
        match self {
            FrameRead::Complete(frame) => Ok(frame),
            FrameRead::Short { expected, received, .. } => {
                Err(BoomError::ShortRead { expected, received })
            }
        }
    }
}

/// Serialize `payload` as compact JSON and wrap it in a request frame.
pub fn encode_request<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(payload).map_err(BoomError::Encoding)?;
    let body_len = body_len_field(body.len())?;

    let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
    buf.extend_from_slice(&REQUEST_TAG.to_le_bytes());
    buf.extend_from_slice(&body_len.to_le_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Length header word for a body of `len` bytes
fn body_len_field(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| BoomError::FrameTooLarge(len))
}

/// Body length declared by a frame header. The first four bytes are ignored.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> u32 {
    u32::from_le_bytes([header[4], header[5], header[6], header[7]])
}

fn header_tag(header: &[u8; HEADER_LEN]) -> u32 {
    u32::from_le_bytes([header[0], header[1], header[2], header[3]])
}

/// Read until `min_bytes` have arrived or `max_wait` has elapsed.
///
/// Never returns more than `min_bytes`. A shorter result means the deadline
/// passed or the peer closed the stream; it is logged, not treated as an
/// error, and the caller must check the length.
pub async fn read_exact_within<R>(
    source: &mut R,
    min_bytes: usize,
    max_wait: Duration,
) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let deadline = Instant::now() + max_wait;
    let mut data = Vec::with_capacity(min_bytes.min(MAX_PREALLOC));
    let mut chunk = [0u8; READ_CHUNK];

    while data.len() < min_bytes {
        let want = READ_CHUNK.min(min_bytes - data.len());
        match tokio::time::timeout_at(deadline, source.read(&mut chunk[..want])).await {
            Ok(Ok(0)) => {
                tracing::warn!(
                    "Only {} of {} bytes received, connection closed by peer",
                    data.len(),
                    min_bytes
                );
                break;
            }
            Ok(Ok(n)) => data.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                tracing::warn!(
                    "Only {} of {} bytes received, {:?} max wait reached",
                    data.len(),
                    min_bytes,
                    max_wait
                );
                break;
            }
        }
    }

    Ok(data)
}

/// Read one frame: the 8-byte header, then exactly the declared body length.
/// Each part gets its own `max_wait`.
pub async fn read_frame<R>(source: &mut R, max_wait: Duration) -> std::io::Result<FrameRead>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let header = read_exact_within(source, HEADER_LEN, max_wait).await?;
    let header: [u8; HEADER_LEN] = match header.as_slice().try_into() {
        Ok(h) => h,
        Err(_) => {
            return Ok(FrameRead::Short {
                expected: HEADER_LEN,
                received: header.len(),
                body: Vec::new(),
            })
        }
    };

    let body_len = decode_header(&header) as usize;
    let body = read_exact_within(source, body_len, max_wait).await?;
    if body.len() < body_len {
        return Ok(FrameRead::Short {
            expected: body_len,
            received: body.len(),
            body,
        });
    }

    Ok(FrameRead::Complete(Frame {
        tag: header_tag(&header),
        body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::AsyncWriteExt;

    fn server_frame(tag: u32, body: &[u8]) -> Vec<u8> {
        let mut buf = tag.to_le_bytes().to_vec();
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(body);
        buf
    }

    #[test]
    fn test_encode_request_layout() {
        let bytes = encode_request(&json!({"RemoteRequestType": 23})).unwrap();
        let body = br#"{"RemoteRequestType":23}"#;

        assert_eq!(&bytes[..4], &[0x11, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[4..8], &(body.len() as u32).to_le_bytes());
        assert_eq!(&bytes[8..], body);
    }

    #[test]
    fn test_header_length_matches_body() {
        let payloads = [
            json!({}),
            json!({"ActivePreset": {"PresetDisplayName": "Späti Bass"}}),
            json!([1, 2, 3]),
            json!("x".repeat(70_000)),
        ];
        for payload in payloads {
            let bytes = encode_request(&payload).unwrap();
            let header: [u8; HEADER_LEN] = bytes[..HEADER_LEN].try_into().unwrap();
            assert_eq!(decode_header(&header) as usize, bytes.len() - HEADER_LEN);
        }
    }

    #[test]
    fn test_body_length_must_fit_header() {
        assert_eq!(body_len_field(u32::MAX as usize).unwrap(), u32::MAX);
        if let Some(too_big) = (u32::MAX as usize).checked_add(1) {
            assert!(matches!(body_len_field(too_big), Err(BoomError::FrameTooLarge(n)) if n == too_big));
        }
    }

    #[test]
    fn test_decode_header_ignores_tag() {
        let a = [0xde, 0xad, 0xbe, 0xef, 5, 0, 0, 0];
        let b = [0, 0, 0, 0, 5, 0, 0, 0];
        assert_eq!(decode_header(&a), 5);
        assert_eq!(decode_header(&b), 5);
        assert_eq!(decode_header(&[0, 0, 0, 0, 0x00, 0x01, 0x00, 0x00]), 256);
    }

    #[test]
    fn test_encode_rejects_unserializable_payload() {
        use std::collections::HashMap;
        // JSON object keys must be strings
        let payload: HashMap<Vec<u8>, u8> = HashMap::from([(vec![1], 1)]);
        assert!(matches!(encode_request(&payload), Err(BoomError::Encoding(_))));
    }

    #[tokio::test]
    async fn test_read_never_exceeds_min_bytes() {
        let (mut reader, mut writer) = tokio::io::duplex(64);
        writer.write_all(b"abcdefgh").await.unwrap();

        let first = read_exact_within(&mut reader, 3, Duration::from_secs(1)).await.unwrap();
        assert_eq!(first, b"abc");

        // The rest of the stream is untouched
        let rest = read_exact_within(&mut reader, 5, Duration::from_secs(1)).await.unwrap();
        assert_eq!(rest, b"defgh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_read_only_after_deadline() {
        let (mut reader, mut writer) = tokio::io::duplex(64);
        writer.write_all(b"abc").await.unwrap();

        let start = Instant::now();
        let data = read_exact_within(&mut reader, 8, Duration::from_secs(10)).await.unwrap();

        assert_eq!(data, b"abc");
        assert!(start.elapsed() >= Duration::from_secs(10));
        drop(writer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_completes_before_deadline() {
        let (mut reader, mut writer) = tokio::io::duplex(64);
        let feeder = tokio::spawn(async move {
            for byte in b"slow" {
                tokio::time::sleep(Duration::from_millis(500)).await;
                writer.write_all(&[*byte]).await.unwrap();
            }
            writer
        });

        let data = read_exact_within(&mut reader, 4, Duration::from_secs(10)).await.unwrap();
        assert_eq!(data, b"slow");
        drop(feeder.await.unwrap());
    }

    #[tokio::test]
    async fn test_read_frame_complete() {
        let (mut reader, mut writer) = tokio::io::duplex(64);
        writer.write_all(&server_frame(42, b"Accepted")).await.unwrap();

        let read = read_frame(&mut reader, Duration::from_secs(1)).await.unwrap();
        assert_eq!(read.text(), "Accepted");
        let frame = read.into_frame().unwrap();
        assert_eq!(frame.tag, 42);
    }

    #[tokio::test]
    async fn test_read_frame_empty_body() {
        let (mut reader, mut writer) = tokio::io::duplex(64);
        writer.write_all(&server_frame(0, b"")).await.unwrap();

        let read = read_frame(&mut reader, Duration::from_secs(1)).await.unwrap();
        assert!(read.is_complete());
        assert!(read.body().is_empty());
    }

    #[tokio::test]
    async fn test_read_frame_truncated_body() {
        let (mut reader, mut writer) = tokio::io::duplex(64);
        let mut bytes = server_frame(0, b"{\"Remote");
        bytes.truncate(HEADER_LEN + 4);
        writer.write_all(&bytes).await.unwrap();
        drop(writer);

        let read = read_frame(&mut reader, Duration::from_secs(1)).await.unwrap();
        assert_eq!(read.body(), b"{\"Re");
        assert!(matches!(
            read.into_frame(),
            Err(BoomError::ShortRead { expected: 8, received: 4 })
        ));
    }

    #[tokio::test]
    async fn test_huge_declared_length_from_closing_peer() {
        let (mut reader, mut writer) = tokio::io::duplex(64);
        writer.write_all(&[0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]).await.unwrap();
        writer.write_all(b"xy").await.unwrap();
        drop(writer);

        let read = read_frame(&mut reader, Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            read,
            FrameRead::Short { expected: u32::MAX as usize, received: 2, body: b"xy".to_vec() }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_frame_silent_peer() {
        let (mut reader, _writer) = tokio::io::duplex(64);

        let read = read_frame(&mut reader, Duration::from_secs(10)).await.unwrap();
        assert_eq!(
            read,
            FrameRead::Short { expected: HEADER_LEN, received: 0, body: Vec::new() }
        );
    }
}
