//! Frame codec for command connections.
//!
//! Frames on the TCP stream are bare JSON objects with no delimiter. The
//! decoder parses one value at a time and waits for more bytes when the
//! buffer ends mid-value.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::types::RemoteMessage;
use crate::error::RemoteError;

/// Default limit on a buffered, incomplete frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Encodes and decodes [`RemoteMessage`] frames.
#[derive(Debug, Clone)]
pub struct JsonMessageCodec {
    max_frame_bytes: usize,
}

impl JsonMessageCodec {
    /// Create a codec with the default frame limit.
    pub fn new() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }

    /// Create a codec with a custom frame limit.
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self { max_frame_bytes }
    }
}

impl Default for JsonMessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for JsonMessageCodec {
    type Item = RemoteMessage;
    type Error = RemoteError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let leading = src
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        src.advance(leading);
        if src.is_empty() {
            return Ok(None);
        }

        let (next, consumed) = {
            let mut stream =
                serde_json::Deserializer::from_slice(&src[..]).into_iter::<RemoteMessage>();
            let next = stream.next();
            (next, stream.byte_offset())
        };
        match next {
            Some(Ok(message)) => {
                src.advance(consumed);
                Ok(Some(message))
            }
            Some(Err(e)) if e.is_eof() => {
                if src.len() > self.max_frame_bytes {
                    return Err(RemoteError::FrameTooLarge {
                        limit: self.max_frame_bytes,
                    });
                }
                Ok(None)
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

impl Encoder<RemoteMessage> for JsonMessageCodec {
    type Error = RemoteError;

    fn encode(&mut self, item: RemoteMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = serde_json::to_vec(&item)?;
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::MessageKind;

    fn encoded(messages: &[RemoteMessage]) -> BytesMut {
        let mut codec = JsonMessageCodec::new();
        let mut buf = BytesMut::new();
        for m in messages {
            codec.encode(m.clone(), &mut buf).expect("encode");
        }
        buf
    }

    #[test]
    fn test_decodes_back_to_back_frames() {
        let mut buf = encoded(&[
            RemoteMessage::ping("a"),
            RemoteMessage::close_connection("a", "b"),
        ]);
        let mut codec = JsonMessageCodec::new();

        let first = codec.decode(&mut buf).expect("decode").expect("frame");
        assert_eq!(first.kind, MessageKind::Ping);
        let second = codec.decode(&mut buf).expect("decode").expect("frame");
        assert_eq!(second.kind, MessageKind::CloseConnection);
        assert!(codec.decode(&mut buf).expect("decode").is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_waits_for_partial_frame() {
        let full = encoded(&[RemoteMessage::ping("a")]);
        let split = full.len() / 2;
        let mut codec = JsonMessageCodec::new();

        let mut buf = BytesMut::from(&full[..split]);
        assert!(codec.decode(&mut buf).expect("decode").is_none());
        assert_eq!(buf.len(), split);

        buf.extend_from_slice(&full[split..]);
        let message = codec.decode(&mut buf).expect("decode").expect("frame");
        assert_eq!(message.source, "a");
    }

    #[test]
    fn test_skips_whitespace_between_frames() {
        let mut buf = BytesMut::from(&b"\r\n  "[..]);
        buf.extend_from_slice(&encoded(&[RemoteMessage::ping("a")]));
        buf.extend_from_slice(b"\n");
        let mut codec = JsonMessageCodec::new();

        assert!(codec.decode(&mut buf).expect("decode").is_some());
        assert!(codec.decode(&mut buf).expect("decode").is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_rejects_garbage() {
        let mut buf = BytesMut::from(&b"not json"[..]);
        let mut codec = JsonMessageCodec::new();
        assert!(matches!(codec.decode(&mut buf), Err(RemoteError::Json(_))));
    }

    #[test]
    fn test_rejects_oversized_partial_frame() {
        let mut buf = BytesMut::from(&b"{\"version\": 1, \"magic\": \"ue_py\", \"source\": \""[..]);
        let mut codec = JsonMessageCodec::with_max_frame_bytes(16);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(RemoteError::FrameTooLarge { .. })
        ));
    }
}
