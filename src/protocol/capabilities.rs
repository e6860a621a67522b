//! Capability and server-status flags negotiated by the session layer.
//! Reference: https://dev.mysql.com/doc/dev/mysql-server/latest/group__group__cs__capabilities__flags.html

// Capability flags
pub const CLIENT_PROTOCOL_41: u32 = 1 << 9;
pub const CLIENT_TRANSACTIONS: u32 = 1 << 13;
pub const CLIENT_DEPRECATE_EOF: u32 = 1 << 24;

/// Capabilities assumed when no configuration says otherwise.
pub const DEFAULT_CAPABILITIES: u32 = CLIENT_PROTOCOL_41 | CLIENT_TRANSACTIONS;

// Server status flags
pub const SERVER_STATUS_AUTOCOMMIT: u16 = 1 << 1;

pub fn has(capabilities: u32, flag: u32) -> bool {
    capabilities & flag != 0
}
