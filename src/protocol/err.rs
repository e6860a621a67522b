//! ERR packet record, including the MariaDB progress-report form.
//! Reference: https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_err_packet.html

use bytes::Bytes;

use crate::error::{CodecError, Result};
use crate::protocol::capabilities::{has, CLIENT_PROTOCOL_41};
use crate::protocol::writer::PayloadWriter;

pub const ERR_HEADER: u8 = 0xff;
/// Error code that marks a progress report.
pub const PROGRESS_ERROR_CODE: u16 = 0xffff;
pub const DEFAULT_SQL_STATE: [u8; 5] = *b"HY000";
/// Largest progress value the 3-byte wire field can carry.
pub const MAX_PROGRESS: u32 = 0xff_ff_ff;

/// Progress of a long-running statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressReport {
    pub stage: u8,
    pub max_stage: u8,
    /// Progress as '% * 1000', 24 bits on the wire
    pub progress: u32,
    pub info: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: u16,
    pub sql_state: [u8; 5],
    pub message: Bytes,
    pub progress: Option<ProgressReport>,
}

impl ErrorInfo {
    pub fn new(code: u16, message: impl Into<Bytes>) -> Self {
        Self {
            code,
            sql_state: DEFAULT_SQL_STATE,
            message: message.into(),
            progress: None,
        }
    }

    pub fn with_sql_state(mut self, sql_state: [u8; 5]) -> Self {
        self.sql_state = sql_state;
        self
    }

    pub fn progress(report: ProgressReport) -> Self {
        Self {
            code: PROGRESS_ERROR_CODE,
            sql_state: DEFAULT_SQL_STATE,
            message: Bytes::new(),
            progress: Some(report),
        }
    }

    pub fn is_progress_report(&self) -> bool {
        self.progress.is_some()
    }
}

pub fn write_error_info(w: &mut PayloadWriter, e: &ErrorInfo, capabilities: u32) -> Result<()> {
    if let Some(report) = &e.progress {
        if report.progress > MAX_PROGRESS {
            return Err(CodecError::ProgressOutOfRange(report.progress));
        }
    }

    w.write_byte(ERR_HEADER)?;

    if let Some(report) = &e.progress {
        w.write_fixed_int(2, PROGRESS_ERROR_CODE as u64)?;
        w.write_byte(1)?; // number of strings
        w.write_byte(report.stage)?;
        w.write_byte(report.max_stage)?;
        w.write_fixed_int(3, report.progress as u64)?;
        return w.write_lenenc_bytes(&report.info);
    }

    w.write_fixed_int(2, e.code as u64)?;
    if has(capabilities, CLIENT_PROTOCOL_41) {
        w.write_byte(b'#')?;
        w.write_bytes(&e.sql_state)?;
    }
    w.write_rest_of_packet(&e.message)
}
