//! MySQL wire-protocol packet encoding for the proxy.
//!
//! Builders in [`protocol::message`] produce payloads; [`protocol::CodecContext`] frames
//! them into physical packets of at most 16MB-1 bytes.

pub mod config;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod telemetry;

pub use error::{CodecError, Result};
