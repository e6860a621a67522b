//! Whole result sets produced by the proxy itself.
//!
//! Emits column count, column definitions, rows and the terminator as one framed buffer
//! with continuous sequence ids.
//! Reference: https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_com_query_response_text_resultset.html

use bytes::{BufMut, Bytes};
use tracing::debug;

use crate::error::{CodecError, Result};
use crate::protocol::capabilities::{has, CLIENT_DEPRECATE_EOF};
use crate::protocol::column::ColumnDefinition;
use crate::protocol::message::{
    generate_binary_row, generate_column_def, generate_eof, generate_ok, generate_result_set_count,
    generate_text_row, OkPacket, EOF_HEADER, OK_HEADER,
};
use crate::protocol::packet::CodecContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    /// COM_QUERY rows
    Text,
    /// COM_STMT_EXECUTE rows
    Binary,
}

pub type Row = Vec<Option<Bytes>>;

#[derive(Debug, Clone)]
pub struct ResultSetWriter {
    columns: Vec<ColumnDefinition>,
    rows: Vec<Row>,
    format: RowFormat,
    server_status: u16,
    warnings: u16,
}

impl ResultSetWriter {
    pub fn new(columns: Vec<ColumnDefinition>, format: RowFormat) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            format,
            server_status: 0,
            warnings: 0,
        }
    }

    pub fn with_status(mut self, server_status: u16, warnings: u16) -> Self {
        self.server_status = server_status;
        self.warnings = warnings;
        self
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Queue a row. Rows must have one field per column.
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(CodecError::ColumnCountMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Frame the whole result set starting at `sequence_id`.
    ///
    /// Returns the buffer and the sequence id following its last packet.
    pub fn encode(
        &self,
        ctx: &mut CodecContext,
        sequence_id: u8,
        capabilities: u32,
    ) -> Result<(Bytes, u8)> {
        let deprecate_eof = has(capabilities, CLIENT_DEPRECATE_EOF);
        let mut out = Vec::new();
        let mut seq = sequence_id;

        let count = generate_result_set_count(self.columns.len() as u64)?;
        seq = ctx.assemble_into(seq, &count, &mut out)?;

        for column in &self.columns {
            let def = generate_column_def(column)?;
            seq = ctx.assemble_into(seq, &def, &mut out)?;
        }

        if !deprecate_eof {
            let eof = generate_eof(self.warnings, self.server_status)?;
            seq = ctx.assemble_into(seq, &eof, &mut out)?;
        }

        for row in &self.rows {
            let payload = match self.format {
                RowFormat::Text => generate_text_row(row)?,
                RowFormat::Binary => {
                    let body = generate_binary_row(row)?;
                    let mut payload = Vec::new();
                    payload.try_reserve_exact(body.len() + 1)?;
                    payload.put_u8(OK_HEADER);
                    payload.put_slice(&body);
                    Bytes::from(payload)
                }
            };
            seq = ctx.assemble_into(seq, &payload, &mut out)?;
        }

        let terminator = if deprecate_eof {
            let ok = OkPacket {
                header: EOF_HEADER,
                server_status: self.server_status,
                warnings: self.warnings,
                ..OkPacket::default()
            };
            generate_ok(&ok, capabilities)?
        } else {
            generate_eof(self.warnings, self.server_status)?
        };
        seq = ctx.assemble_into(seq, &terminator, &mut out)?;

        debug!(
            columns = self.columns.len(),
            rows = self.rows.len(),
            format = ?self.format,
            bytes = out.len(),
            "Encoded result set"
        );
        Ok((Bytes::from(out), seq))
    }
}
