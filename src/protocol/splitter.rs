//! Splits a logical payload into physical packet chunks.
//!
//! A payload of 2^24-1 bytes or more goes out as several packets of at most
//! [`MAX_PACKET_SIZE`] bytes. When the payload length is an exact multiple of that limit
//! (zero included) the peer cannot tell the message is over, so one empty packet follows.
//! Reference: https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_packets.html

/// MySQL packet header size: 3 bytes length + 1 byte sequence
pub const PACKET_HEADER_SIZE: usize = 4;
/// Maximum packet payload size (16MB - 1)
pub const MAX_PACKET_SIZE: usize = 0xff_ff_ff;

/// One slice of the logical payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub offset: usize,
    pub len: usize,
}

/// Number of physical packets a payload of `len` bytes is framed into.
pub fn packet_count(len: usize) -> usize {
    len / MAX_PACKET_SIZE + 1
}

/// Size of the framed output for a payload of `len` bytes, headers included.
pub fn whole_packet_size(len: usize) -> usize {
    len + packet_count(len) * PACKET_HEADER_SIZE
}

/// Restartable chunk iterator.
///
/// Call [`PacketSplitter::init`] with the payload length, then drain it as an iterator.
/// One instance serves one encode at a time; it is reused to avoid per-call setup.
#[derive(Debug, Default)]
pub struct PacketSplitter {
    remaining: usize,
    offset: usize,
    trailing_empty: bool,
    exhausted: bool,
}

impl PacketSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, total_len: usize) {
        self.remaining = total_len;
        self.offset = 0;
        self.trailing_empty = total_len % MAX_PACKET_SIZE == 0;
        self.exhausted = false;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Iterator for PacketSplitter {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.exhausted {
            return None;
        }

        if self.remaining > 0 {
            let len = self.remaining.min(MAX_PACKET_SIZE);
            let chunk = Chunk {
                offset: self.offset,
                len,
            };
            self.offset += len;
            self.remaining -= len;
            return Some(chunk);
        }

        if self.trailing_empty {
            self.trailing_empty = false;
            return Some(Chunk {
                offset: self.offset,
                len: 0,
            });
        }

        self.exhausted = true;
        None
    }
}
