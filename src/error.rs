use std::collections::TryReserveError;

use thiserror::Error;

/// Errors raised while encoding MySQL packets.
///
/// Every builder is all-or-nothing: when one of these is returned no bytes have been
/// handed back to the caller.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The caller asked for a protocol feature this codec does not implement.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(&'static str),

    #[error("buffer allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("payload of {size} bytes exceeds max_allowed_packet ({limit})")]
    PacketTooLarge { size: usize, limit: usize },

    #[error("progress {0:#x} does not fit in 24 bits")]
    ProgressOutOfRange(u32),

    #[error("invalid fixed-length integer width: {0}")]
    InvalidIntWidth(usize),

    #[error("range {offset}..{offset}+{len} out of bounds for buffer of {available} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("unknown charset: {0}")]
    UnknownCharset(String),

    #[error("character {ch:?} cannot be encoded as {charset}")]
    Unencodable { ch: char, charset: &'static str },

    /// The network sink failed to accept a framed buffer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row has {actual} fields but the result set has {expected} columns")]
    ColumnCountMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;
