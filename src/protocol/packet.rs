//! Physical packet framing.
//!
//! Turns a logical payload into `3-byte length | sequence id | chunk` packets.

use bytes::{BufMut, Bytes};
use tracing::{debug, warn};

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::metrics;
use crate::protocol::splitter::{whole_packet_size, PacketSplitter, PACKET_HEADER_SIZE};

/// MySQL packet header
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, chunk length)
/// - sequence_id: 1 byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub length: u32,
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn new(length: usize, sequence_id: u8) -> Self {
        debug_assert!(length <= 0xff_ff_ff);
        Self {
            length: length as u32,
            sequence_id,
        }
    }

    pub fn to_bytes(self) -> [u8; PACKET_HEADER_SIZE] {
        let len = self.length.to_le_bytes();
        [len[0], len[1], len[2], self.sequence_id]
    }

    pub fn write_to<B: BufMut>(self, dst: &mut B) {
        dst.put_slice(&self.to_bytes());
    }
}

/// Per-connection encoding state.
///
/// Holds the reusable splitter, so every framing call borrows it mutably and a context
/// never frames two payloads at once.
#[derive(Debug)]
pub struct CodecContext {
    splitter: PacketSplitter,
    max_allowed_packet: Option<usize>,
}

impl Default for CodecContext {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

impl CodecContext {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            splitter: PacketSplitter::new(),
            max_allowed_packet: config.max_allowed_packet,
        }
    }

    pub fn max_allowed_packet(&self) -> Option<usize> {
        self.max_allowed_packet
    }

    /// Frame `payload` into physical packets numbered from `packet_id`.
    pub fn assemble(&mut self, packet_id: u8, payload: &[u8]) -> Result<Bytes> {
        let mut out = Vec::new();
        self.assemble_into(packet_id, payload, &mut out)?;
        Ok(Bytes::from(out))
    }

    /// Like [`CodecContext::assemble`], also returning the sequence id that follows the
    /// last packet written.
    pub fn assemble_with_next_id(&mut self, packet_id: u8, payload: &[u8]) -> Result<(Bytes, u8)> {
        let mut out = Vec::new();
        let next = self.assemble_into(packet_id, payload, &mut out)?;
        Ok((Bytes::from(out), next))
    }

    /// Append the framed packets to `out`. On error `out` is left as it was.
    pub fn assemble_into(&mut self, packet_id: u8, payload: &[u8], out: &mut Vec<u8>) -> Result<u8> {
        if let Some(limit) = self.max_allowed_packet.filter(|&limit| payload.len() > limit) {
            warn!(size = payload.len(), limit, "Refusing to frame oversized payload");
            metrics::record_encode_rejected("packet_too_large");
            return Err(CodecError::PacketTooLarge {
                size: payload.len(),
                limit,
            });
        }

        if let Err(e) = out.try_reserve_exact(whole_packet_size(payload.len())) {
            metrics::record_encode_rejected("allocation");
            return Err(e.into());
        }

        let mut packet_id = packet_id;
        let mut packets = 0usize;
        self.splitter.init(payload.len());
        for chunk in self.splitter.by_ref() {
            PacketHeader::new(chunk.len, packet_id).write_to(out);
            out.put_slice(&payload[chunk.offset..chunk.offset + chunk.len]);
            packet_id = packet_id.wrapping_add(1);
            packets += 1;
        }

        debug!(payload_len = payload.len(), packets, next_id = packet_id, "Framed payload");
        metrics::record_packets_framed(packets as u64, payload.len() as u64);
        Ok(packet_id)
    }
}
