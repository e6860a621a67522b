//! Charset resolution for string fields written into packets.

use std::borrow::Cow;

use encoding_rs::{EncoderResult, WINDOWS_1252};

use crate::error::{CodecError, Result};

/// Character sets the codec can encode column names with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Utf8mb4,
    /// MySQL `latin1`, which is cp1252 rather than ISO-8859-1.
    Latin1,
    Ascii,
    Binary,
}

impl Charset {
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf8",
            Charset::Utf8mb4 => "utf8mb4",
            Charset::Latin1 => "latin1",
            Charset::Ascii => "ascii",
            Charset::Binary => "binary",
        }
    }

    /// Default collation index sent in column definitions.
    pub fn collation_index(self) -> u16 {
        match self {
            Charset::Utf8 => 33,
            Charset::Utf8mb4 => 45,
            Charset::Latin1 => 8,
            Charset::Ascii => 11,
            Charset::Binary => 63,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf8mb3" | "utf-8" => Some(Charset::Utf8),
            "utf8mb4" => Some(Charset::Utf8mb4),
            "latin1" | "cp1252" | "windows-1252" => Some(Charset::Latin1),
            "ascii" | "us-ascii" => Some(Charset::Ascii),
            "binary" => Some(Charset::Binary),
            _ => None,
        }
    }

    /// Map a collation index to its charset.
    pub fn from_collation_index(index: u16) -> Option<Self> {
        match index {
            33 | 83 | 192..=215 => Some(Charset::Utf8),
            45 | 46 | 224..=247 | 255 => Some(Charset::Utf8mb4),
            5 | 8 | 15 | 31 | 47 | 48 | 49 | 94 => Some(Charset::Latin1),
            11 | 65 => Some(Charset::Ascii),
            63 => Some(Charset::Binary),
            _ => None,
        }
    }

    pub fn encode(self, s: &str) -> Result<Cow<'_, [u8]>> {
        match self {
            Charset::Utf8mb4 | Charset::Binary => Ok(Cow::Borrowed(s.as_bytes())),
            Charset::Utf8 => match s.chars().find(|c| c.len_utf8() > 3) {
                Some(ch) => Err(self.unencodable(ch)),
                None => Ok(Cow::Borrowed(s.as_bytes())),
            },
            Charset::Ascii => match s.chars().find(|c| !c.is_ascii()) {
                Some(ch) => Err(self.unencodable(ch)),
                None => Ok(Cow::Borrowed(s.as_bytes())),
            },
            Charset::Latin1 => {
                if s.is_ascii() {
                    return Ok(Cow::Borrowed(s.as_bytes()));
                }
                let mut encoder = WINDOWS_1252.new_encoder();
                let mut out = Vec::new();
                out.try_reserve_exact(s.len())?;
                let mut utf8 = [0u8; 4];
                for ch in s.chars() {
                    let mut byte = [0u8; 1];
                    match encoder.encode_from_utf8_without_replacement(
                        ch.encode_utf8(&mut utf8),
                        &mut byte,
                        false,
                    ) {
                        (EncoderResult::InputEmpty, _, 1) => out.push(byte[0]),
                        _ => return Err(self.unencodable(ch)),
                    }
                }
                Ok(Cow::Owned(out))
            }
        }
    }

    fn unencodable(self, ch: char) -> CodecError {
        CodecError::Unencodable {
            ch,
            charset: self.name(),
        }
    }
}

/// Looks up the encoder for a charset identifier supplied by the session.
pub trait CharsetResolver {
    fn resolve_name(&self, name: &str) -> Result<Charset>;

    fn resolve_index(&self, index: u16) -> Result<Charset>;
}

/// Resolver backed by the charsets built into this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinCharsets;

impl CharsetResolver for BuiltinCharsets {
    fn resolve_name(&self, name: &str) -> Result<Charset> {
        Charset::from_name(name).ok_or_else(|| CodecError::UnknownCharset(name.to_string()))
    }

    fn resolve_index(&self, index: u16) -> Result<Charset> {
        Charset::from_collation_index(index)
            .ok_or_else(|| CodecError::UnknownCharset(format!("collation #{index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name_and_index() {
        let resolver = BuiltinCharsets;
        assert_eq!(resolver.resolve_name("UTF8MB4").unwrap(), Charset::Utf8mb4);
        assert_eq!(resolver.resolve_index(8).unwrap(), Charset::Latin1);
        assert_eq!(resolver.resolve_index(Charset::Utf8.collation_index()).unwrap(), Charset::Utf8);
        assert!(matches!(
            resolver.resolve_name("klingon"),
            Err(CodecError::UnknownCharset(_))
        ));
        assert!(resolver.resolve_index(9999).is_err());
    }

    #[test]
    fn test_latin1_encodes_single_bytes() {
        let encoded = Charset::Latin1.encode("café").unwrap();
        assert_eq!(&encoded[..], &[b'c', b'a', b'f', 0xe9]);
        assert!(matches!(encoded, Cow::Owned(_)));

        assert_eq!(&Charset::Latin1.encode("5€").unwrap()[..], &[b'5', 0x80]);
        assert_eq!(&Charset::Latin1.encode("“ok”").unwrap()[..], &[0x93, b'o', b'k', 0x94]);

        let err = Charset::Latin1.encode("日本").unwrap_err();
        assert!(matches!(err, CodecError::Unencodable { ch: '日', charset: "latin1" }));
    }

    #[test]
    fn test_utf8_rejects_four_byte_chars() {
        assert!(Charset::Utf8.encode("naïve").is_ok());
        assert!(Charset::Utf8.encode("🦀").is_err());
        assert_eq!(&Charset::Utf8mb4.encode("🦀").unwrap()[..], "🦀".as_bytes());
    }

    #[test]
    fn test_ascii() {
        assert_eq!(&Charset::Ascii.encode("id").unwrap()[..], b"id");
        assert!(Charset::Ascii.encode("é").is_err());
    }
}
