//! Codec metrics.
//!
//! Recorded through the `metrics` facade; they are no-ops until the embedding proxy
//! installs a recorder.
//! - Packets and payload bytes framed
//! - Encodes rejected (oversized payloads, allocation failures, contract errors)

use ::metrics::{counter, histogram};

/// Record one framed logical payload
pub fn record_packets_framed(packets: u64, payload_bytes: u64) {
    counter!("mysqlwire_packets_framed_total").increment(packets);
    counter!("mysqlwire_payload_bytes_total").increment(payload_bytes);
    histogram!("mysqlwire_packets_per_payload").record(packets as f64);
}

/// Record an encode that was refused before any bytes were produced
pub fn record_encode_rejected(reason: &'static str) {
    counter!("mysqlwire_encodes_rejected_total", "reason" => reason).increment(1);
}
