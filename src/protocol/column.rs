//! Column definition record (Protocol::ColumnDefinition41).
//! Reference: https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_com_query_response_text_resultset_column_definition.html

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::charset::Charset;
use crate::protocol::writer::{lenenc_bytes_len, PayloadWriter};

// Column types
pub const MYSQL_TYPE_DECIMAL: u8 = 0x00;
pub const MYSQL_TYPE_TINY: u8 = 0x01;
pub const MYSQL_TYPE_SHORT: u8 = 0x02;
pub const MYSQL_TYPE_LONG: u8 = 0x03;
pub const MYSQL_TYPE_DOUBLE: u8 = 0x05;
pub const MYSQL_TYPE_NULL: u8 = 0x06;
pub const MYSQL_TYPE_LONGLONG: u8 = 0x08;
pub const MYSQL_TYPE_DATETIME: u8 = 0x0c;
pub const MYSQL_TYPE_VARCHAR: u8 = 0x0f;
pub const MYSQL_TYPE_BLOB: u8 = 0xfc;
pub const MYSQL_TYPE_VAR_STRING: u8 = 0xfd;
pub const MYSQL_TYPE_STRING: u8 = 0xfe;

// Column flags
pub const NOT_NULL_FLAG: u16 = 1;
pub const PRI_KEY_FLAG: u16 = 1 << 1;
pub const UNSIGNED_FLAG: u16 = 1 << 5;
pub const BINARY_FLAG: u16 = 1 << 7;

const CATALOG: &[u8] = b"def";
/// Length of the fixed-size tail that follows the names.
const FIXED_FIELDS_LEN: u8 = 0x0c;

/// Column metadata sent in a result set header.
///
/// Names are already encoded in the connection charset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub schema: Bytes,
    pub table: Bytes,
    pub org_table: Bytes,
    pub name: Bytes,
    pub org_name: Bytes,
    pub charset_index: u16,
    pub column_length: u32,
    pub column_type: u8,
    pub flags: u16,
    pub decimals: u8,
}

impl ColumnDefinition {
    /// Encode `name` and `org_name` with `charset`.
    pub fn new(
        name: &str,
        org_name: &str,
        column_type: u8,
        charset_index: u16,
        charset: Charset,
    ) -> Result<Self> {
        Ok(Self {
            name: Bytes::copy_from_slice(&charset.encode(name)?),
            org_name: Bytes::copy_from_slice(&charset.encode(org_name)?),
            charset_index,
            column_type,
            ..Self::default()
        })
    }

    pub fn with_flags(mut self, flags: u16, decimals: u8) -> Self {
        self.flags = flags;
        self.decimals = decimals;
        self
    }

    pub fn payload_len(&self) -> usize {
        [
            CATALOG.len(),
            self.schema.len(),
            self.table.len(),
            self.org_table.len(),
            self.name.len(),
            self.org_name.len(),
        ]
        .into_iter()
        .map(lenenc_bytes_len)
        .sum::<usize>()
            + 1
            + FIXED_FIELDS_LEN as usize
    }
}

pub fn write_column_definition(w: &mut PayloadWriter, c: &ColumnDefinition) -> Result<()> {
    w.write_lenenc_bytes(CATALOG)?;
    w.write_lenenc_bytes(&c.schema)?;
    w.write_lenenc_bytes(&c.table)?;
    w.write_lenenc_bytes(&c.org_table)?;
    w.write_lenenc_bytes(&c.name)?;
    w.write_lenenc_bytes(&c.org_name)?;
    w.write_byte(FIXED_FIELDS_LEN)?;
    w.write_fixed_int(2, c.charset_index as u64)?;
    w.write_fixed_int(4, c.column_length as u64)?;
    w.write_byte(c.column_type)?;
    w.write_fixed_int(2, c.flags as u64)?;
    w.write_byte(c.decimals)?;
    w.write_fixed_int(2, 0) // filler
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_definition_layout() {
        let col = ColumnDefinition::new("id", "user_id", MYSQL_TYPE_LONGLONG, 63, Charset::Utf8mb4)
            .unwrap()
            .with_flags(NOT_NULL_FLAG | PRI_KEY_FLAG, 0);

        let mut w = PayloadWriter::default();
        write_column_definition(&mut w, &col).unwrap();
        let buf = w.finish();

        let mut expected = vec![3, b'd', b'e', b'f', 0, 0, 0, 2, b'i', b'd', 7];
        expected.extend_from_slice(b"user_id");
        expected.extend_from_slice(&[
            0x0c, 63, 0, 0, 0, 0, 0, MYSQL_TYPE_LONGLONG, 0x03, 0x00, 0, 0, 0,
        ]);
        assert_eq!(&buf[..], &expected[..]);
        assert_eq!(col.payload_len(), buf.len());
    }

    #[test]
    fn test_names_are_charset_encoded() {
        let col = ColumnDefinition::new("prénom", "prénom", MYSQL_TYPE_VAR_STRING, 8, Charset::Latin1)
            .unwrap();
        assert_eq!(&col.name[..], &[b'p', b'r', 0xe9, b'n', b'o', b'm']);

        assert!(ColumnDefinition::new("名前", "名前", MYSQL_TYPE_VAR_STRING, 8, Charset::Latin1).is_err());
    }
}
