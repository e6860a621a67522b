//! Builders for server responses and proxy-issued commands.
//!
//! Response builders return the unframed payload; the caller frames it with a
//! [`CodecContext`] once the sequence id is known. The command composers frame with
//! sequence id 0 because a command always opens a new exchange.

use bytes::Bytes;
use tracing::warn;

use crate::error::{CodecError, Result};
use crate::metrics;
use crate::protocol::capabilities::{has, CLIENT_PROTOCOL_41, CLIENT_TRANSACTIONS};
use crate::protocol::charset::Charset;
use crate::protocol::column::{write_column_definition, ColumnDefinition};
use crate::protocol::err::{write_error_info, ErrorInfo, ProgressReport};
use crate::protocol::packet::CodecContext;
use crate::protocol::writer::{lenenc_bytes_len, lenenc_int_len, PayloadWriter};

pub const OK_HEADER: u8 = 0x00;
pub const EOF_HEADER: u8 = 0xfe;
/// NULL field in a text row
pub const NULL_MARK: u8 = 0xfb;
/// Zero-length field in a text row
pub const EMPTY_MARK: u8 = 0x00;
pub const COM_QUERY: u8 = 0x03;

/// Fields of an OK packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkPacket {
    /// 0x00 for OK, 0xfe when it replaces the final EOF of a result set
    pub header: u8,
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub server_status: u16,
    pub warnings: u16,
    pub info: Option<Bytes>,
    /// Session state change tracking; not supported by this codec
    pub session_state_changes: bool,
}

impl Default for OkPacket {
    fn default() -> Self {
        Self {
            header: OK_HEADER,
            affected_rows: 0,
            last_insert_id: 0,
            server_status: 0,
            warnings: 0,
            info: None,
            session_state_changes: false,
        }
    }
}

impl OkPacket {
    pub fn new(affected_rows: u64, last_insert_id: u64, server_status: u16) -> Self {
        Self {
            affected_rows,
            last_insert_id,
            server_status,
            ..Self::default()
        }
    }

    pub fn with_info(mut self, info: impl Into<Bytes>) -> Self {
        self.info = Some(info.into());
        self
    }
}

pub fn generate_ok(ok: &OkPacket, capabilities: u32) -> Result<Bytes> {
    if ok.session_state_changes {
        warn!("OK packet requested session state tracking");
        metrics::record_encode_rejected("unsupported_capability");
        return Err(CodecError::UnsupportedCapability("session state tracking"));
    }

    let info_len = ok.info.as_ref().map_or(0, |i| i.len());
    let mut w = PayloadWriter::with_capacity(
        1 + lenenc_int_len(ok.affected_rows) + lenenc_int_len(ok.last_insert_id) + 4 + info_len,
    );
    w.write_byte(ok.header)?;
    w.write_lenenc_int(ok.affected_rows)?;
    w.write_lenenc_int(ok.last_insert_id)?;
    if has(capabilities, CLIENT_PROTOCOL_41) {
        w.write_fixed_int(2, ok.server_status as u64)?;
        w.write_fixed_int(2, ok.warnings as u64)?;
    } else if has(capabilities, CLIENT_TRANSACTIONS) {
        w.write_fixed_int(2, ok.server_status as u64)?;
    }
    if let Some(info) = &ok.info {
        w.write_rest_of_packet(info)?;
    }
    Ok(w.finish())
}

pub fn generate_error(code: u16, message: &[u8], capabilities: u32) -> Result<Bytes> {
    generate_error_info(&ErrorInfo::new(code, Bytes::copy_from_slice(message)), capabilities)
}

pub fn generate_error_info(e: &ErrorInfo, capabilities: u32) -> Result<Bytes> {
    let mut w = PayloadWriter::with_capacity(64);
    write_error_info(&mut w, e, capabilities)?;
    Ok(w.finish())
}

pub fn generate_progress_info_error(
    stage: u8,
    max_stage: u8,
    progress: u32,
    progress_info: &[u8],
) -> Result<Bytes> {
    let e = ErrorInfo::progress(ProgressReport {
        stage,
        max_stage,
        progress,
        info: Bytes::copy_from_slice(progress_info),
    });
    // progress reports only exist in the 4.1 protocol
    generate_error_info(&e, CLIENT_PROTOCOL_41)
}

pub fn generate_eof(warnings: u16, status: u16) -> Result<Bytes> {
    let mut w = PayloadWriter::with_capacity(5);
    w.write_byte(EOF_HEADER)?;
    w.write_fixed_int(2, warnings as u64)?;
    w.write_fixed_int(2, status as u64)?;
    Ok(w.finish())
}

pub fn generate_result_set_count(field_count: u64) -> Result<Bytes> {
    let mut w = PayloadWriter::with_capacity(lenenc_int_len(field_count));
    w.write_lenenc_int(field_count)?;
    Ok(w.finish())
}

pub fn generate_column_def(column: &ColumnDefinition) -> Result<Bytes> {
    let mut w = PayloadWriter::with_capacity(column.payload_len());
    write_column_definition(&mut w, column)?;
    Ok(w.finish())
}

/// Column definition whose `org_name` equals its `name`, with no flags or decimals.
pub fn generate_column_def_simple(
    name: &str,
    column_type: u8,
    charset_index: u16,
    charset: Charset,
) -> Result<Bytes> {
    generate_column_def_named(name, name, column_type, 0, 0, charset_index, charset)
}

pub fn generate_column_def_named(
    name: &str,
    org_name: &str,
    column_type: u8,
    flags: u16,
    decimals: u8,
    charset_index: u16,
    charset: Charset,
) -> Result<Bytes> {
    let column = ColumnDefinition::new(name, org_name, column_type, charset_index, charset)?
        .with_flags(flags, decimals);
    generate_column_def(&column)
}

pub fn binary_null_bitmap_len(column_count: usize) -> usize {
    (column_count + 7 + 2) / 8
}

/// Binary protocol row: null bitmap, then each non-null value as lenenc bytes.
///
/// A null column `i` sets bit `i & 7` of byte `(i + 2) / 8`. The byte index carries the
/// 2-bit offset but the bit index does not; peers of this proxy depend on that layout.
pub fn generate_binary_row<B: AsRef<[u8]>>(fields: &[Option<B>]) -> Result<Bytes> {
    let mut null_map = vec![0u8; binary_null_bitmap_len(fields.len())];
    let mut values_len = 0;
    for (column_index, field) in fields.iter().enumerate() {
        match field {
            Some(v) => values_len += lenenc_bytes_len(v.as_ref().len()),
            None => null_map[(column_index + 2) / 8] |= 1 << (column_index & 7),
        }
    }

    let mut w = PayloadWriter::with_capacity(null_map.len() + values_len);
    w.write_bytes(&null_map)?;
    for v in fields.iter().flatten() {
        w.write_lenenc_bytes(v.as_ref())?;
    }
    Ok(w.finish())
}

/// Exact payload size of a text row.
pub fn calc_text_row_payload_size<B: AsRef<[u8]>>(fields: &[Option<B>]) -> usize {
    fields
        .iter()
        .map(|f| match f {
            Some(v) if !v.as_ref().is_empty() => lenenc_bytes_len(v.as_ref().len()),
            _ => 1,
        })
        .sum()
}

pub fn write_text_row<B: AsRef<[u8]>>(fields: &[Option<B>], w: &mut PayloadWriter) -> Result<()> {
    for field in fields {
        match field {
            None => w.write_byte(NULL_MARK)?,
            Some(v) if v.as_ref().is_empty() => w.write_byte(EMPTY_MARK)?,
            Some(v) => w.write_lenenc_bytes(v.as_ref())?,
        }
    }
    Ok(())
}

pub fn generate_text_row<B: AsRef<[u8]>>(fields: &[Option<B>]) -> Result<Bytes> {
    let mut w = PayloadWriter::with_capacity(calc_text_row_payload_size(fields));
    write_text_row(fields, &mut w)?;
    Ok(w.finish())
}

/// Unframed command payload: `head` followed by `data`.
pub fn generate_request(head: u8, data: &[u8]) -> Result<Bytes> {
    let mut w = PayloadWriter::with_capacity(1 + data.len());
    w.write_byte(head)?;
    w.write_bytes(data)?;
    Ok(w.finish())
}

pub fn generate_request_packet(ctx: &mut CodecContext, head: u8, data: &[u8]) -> Result<Bytes> {
    generate_mysql_command_request(ctx, 0, head, data)
}

/// COM_QUERY for `sql`, framed as the first packet of a new exchange.
pub fn generate_com_query_packet(ctx: &mut CodecContext, sql: &str) -> Result<Bytes> {
    let mut w = PayloadWriter::with_capacity(sql.len() + 1);
    w.write_byte(COM_QUERY)?;
    w.write_rest_of_packet(sql.as_bytes())?;
    generate_mysql_packet(ctx, 0, &w.finish())
}

pub fn generate_mysql_command_request(
    ctx: &mut CodecContext,
    packet_id: u8,
    head: u8,
    data: &[u8],
) -> Result<Bytes> {
    let payload = generate_request(head, data)?;
    generate_mysql_packet(ctx, packet_id, &payload)
}

pub fn generate_mysql_packet(ctx: &mut CodecContext, packet_id: u8, payload: &[u8]) -> Result<Bytes> {
    ctx.assemble(packet_id, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::capabilities::SERVER_STATUS_AUTOCOMMIT;
    use crate::protocol::column::MYSQL_TYPE_VAR_STRING;

    #[test]
    fn test_ok_protocol_41() {
        let ok = OkPacket {
            warnings: 3,
            ..OkPacket::new(1, 300, SERVER_STATUS_AUTOCOMMIT)
        }
        .with_info("done");
        let buf = generate_ok(&ok, CLIENT_PROTOCOL_41 | CLIENT_TRANSACTIONS).unwrap();

        assert_eq!(
            &buf[..],
            &[0x00, 0x01, 0xfc, 0x2c, 0x01, 0x02, 0x00, 0x03, 0x00, b'd', b'o', b'n', b'e']
        );
    }

    #[test]
    fn test_ok_transactions_only() {
        let ok = OkPacket::new(0, 0, SERVER_STATUS_AUTOCOMMIT).with_info("x");
        let buf = generate_ok(&ok, CLIENT_TRANSACTIONS).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x00, 0x00, 0x02, 0x00, b'x']);
    }

    #[test]
    fn test_ok_legacy_has_no_status() {
        let ok = OkPacket::new(5, 0, SERVER_STATUS_AUTOCOMMIT).with_info("hi");
        let buf = generate_ok(&ok, 0).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x05, 0x00, b'h', b'i']);

        let bare = generate_ok(&OkPacket::new(0, 0, 0), 0).unwrap();
        assert_eq!(&bare[..], &[0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_ok_session_tracking_is_rejected() {
        let ok = OkPacket {
            session_state_changes: true,
            ..OkPacket::default()
        };
        assert!(matches!(
            generate_ok(&ok, CLIENT_PROTOCOL_41),
            Err(CodecError::UnsupportedCapability(_))
        ));
    }

    #[test]
    fn test_eof() {
        let buf = generate_eof(1, SERVER_STATUS_AUTOCOMMIT).unwrap();
        assert_eq!(&buf[..], &[0xfe, 0x01, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn test_error_builders() {
        let buf = generate_error(1064, b"syntax", CLIENT_PROTOCOL_41).unwrap();
        assert_eq!(&buf[..9], b"\xff\x28\x04#HY000");
        assert_eq!(&buf[9..], b"syntax");

        let progress = generate_progress_info_error(2, 4, 500, b"").unwrap();
        assert_eq!(&progress[..], &[0xff, 0xff, 0xff, 1, 2, 4, 0xf4, 0x01, 0x00, 0]);

        assert!(matches!(
            generate_progress_info_error(1, 2, 0x0100_0000, b""),
            Err(CodecError::ProgressOutOfRange(_))
        ));
    }

    #[test]
    fn test_result_set_count() {
        assert_eq!(&generate_result_set_count(3).unwrap()[..], &[3]);
        assert_eq!(&generate_result_set_count(300).unwrap()[..], &[0xfc, 0x2c, 0x01]);
    }

    #[test]
    fn test_column_def_simple_uses_name_twice() {
        let buf = generate_column_def_simple("a", MYSQL_TYPE_VAR_STRING, 45, Charset::Utf8mb4).unwrap();
        assert_eq!(&buf[..10], &[3, b'd', b'e', b'f', 0, 0, 0, 1, b'a', 1]);
        assert_eq!(buf[10], b'a');
        assert_eq!(buf[11], 0x0c);
        assert_eq!(buf[18], MYSQL_TYPE_VAR_STRING);
    }

    #[test]
    fn test_binary_row_no_columns() {
        let buf = generate_binary_row::<&[u8]>(&[]).unwrap();
        assert_eq!(&buf[..], &[0]);
    }

    #[test]
    fn test_binary_row_all_null_is_bitmap_only() {
        let fields: Vec<Option<&[u8]>> = vec![None; 10];
        let buf = generate_binary_row(&fields).unwrap();
        assert_eq!(buf.len(), binary_null_bitmap_len(10));
        assert_eq!(buf.len(), 2);
    }

    /// Pins the null bitmap layout: byte `(i + 2) / 8`, bit `i & 7`.
    #[test]
    fn test_binary_row_null_bitmap_layout() {
        let mut fields: Vec<Option<&[u8]>> = vec![Some(&b"v"[..]); 9];
        fields[0] = None;
        fields[5] = None;
        fields[6] = None;
        fields[8] = None;
        let buf = generate_binary_row(&fields).unwrap();

        // i=0 -> byte 0 bit 0; i=5 -> byte 0 bit 5; i=6 -> byte 1 bit 6; i=8 -> byte 1 bit 0
        assert_eq!(buf[0], 0b0010_0001);
        assert_eq!(buf[1], 0b0100_0001);
        assert_eq!(&buf[2..], b"\x01v\x01v\x01v\x01v\x01v");
    }

    #[test]
    fn test_text_row_sentinels() {
        let fields: Vec<Option<&[u8]>> = vec![None, Some(&b""[..]), Some(&b"hello"[..])];
        let buf = generate_text_row(&fields).unwrap();
        assert_eq!(&buf[..], b"\xfb\x00\x05hello");
        assert_eq!(calc_text_row_payload_size(&fields), buf.len());
    }

    #[test]
    fn test_text_row_size_is_exact_for_long_fields() {
        let long = vec![b'x'; 300];
        let fields = vec![Some(long.as_slice()), None];
        let buf = generate_text_row(&fields).unwrap();
        assert_eq!(buf.len(), 3 + 300 + 1);
        assert_eq!(calc_text_row_payload_size(&fields), buf.len());
        assert_eq!(&buf[..3], &[0xfc, 0x2c, 0x01]);
    }

    #[test]
    fn test_com_query_packet() {
        let mut ctx = CodecContext::default();
        let buf = generate_com_query_packet(&mut ctx, "SELECT 1").unwrap();
        assert_eq!(&buf[..5], &[9, 0, 0, 0, 0x03]);
        assert_eq!(&buf[5..], b"SELECT 1");
    }

    #[test]
    fn test_command_requests() {
        let mut ctx = CodecContext::default();
        assert_eq!(&generate_request(0x0e, &[]).unwrap()[..], &[0x0e]);

        let ping = generate_request_packet(&mut ctx, 0x0e, &[]).unwrap();
        assert_eq!(&ping[..], &[1, 0, 0, 0, 0x0e]);

        let init_db = generate_mysql_command_request(&mut ctx, 4, 0x02, b"db").unwrap();
        assert_eq!(&init_db[..], &[3, 0, 0, 4, 0x02, b'd', b'b']);
    }
}
