use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;

use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::protocol::packet::CodecContext;

/// A finished payload and the sequence id its first packet carries.
#[derive(Debug, Clone)]
pub struct OutboundPacket {
    pub sequence_id: u8,
    pub payload: Bytes,
}

impl OutboundPacket {
    pub fn new(sequence_id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            sequence_id,
            payload: payload.into(),
        }
    }
}

/// Frames payloads for a `FramedWrite` sink.
///
/// Owns its own [`CodecContext`], so one encoder belongs to one connection task.
#[derive(Debug, Default)]
pub struct PacketEncoder {
    ctx: CodecContext,
}

impl PacketEncoder {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            ctx: CodecContext::new(config),
        }
    }
}

impl Encoder<OutboundPacket> for PacketEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: OutboundPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let framed = self.ctx.assemble(item.sequence_id, &item.payload)?;
        dst.extend_from_slice(&framed);
        Ok(())
    }
}

/// Passes already framed buffers through untouched.
impl Encoder<Bytes> for PacketEncoder {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_frames_payload() {
        let mut encoder = PacketEncoder::default();
        let mut dst = BytesMut::new();
        encoder
            .encode(OutboundPacket::new(2, &b"\x0e"[..]), &mut dst)
            .unwrap();
        encoder.encode(Bytes::from_static(b"raw"), &mut dst).unwrap();
        assert_eq!(&dst[..], b"\x01\x00\x00\x02\x0eraw");
    }

    #[test]
    fn test_encoder_respects_max_allowed_packet() {
        let config = CodecConfig {
            max_allowed_packet: Some(2),
            ..CodecConfig::default()
        };
        let mut encoder = PacketEncoder::new(&config);
        let mut dst = BytesMut::new();
        assert!(encoder
            .encode(OutboundPacket::new(0, &b"abc"[..]), &mut dst)
            .is_err());
        assert!(dst.is_empty());
    }
}
