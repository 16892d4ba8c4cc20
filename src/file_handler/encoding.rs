//! Byte <-> character translation for text-mode handles.

use crate::error::{FileIoError, Result};
use std::fmt;
use std::str::FromStr;

/// Text encodings understood by text-mode handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    /// ISO-8859-1: every byte is the code point of the same value
    Latin1,
    Ascii,
}

/// Size of the next character at the front of a byte slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharWidth {
    /// A full character of this many bytes is available
    Complete(usize),
    /// More bytes are needed to tell
    Incomplete,
    /// The leading bytes can never start a valid character
    Invalid,
}

impl Encoding {
    /// Canonical name of the encoding
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Latin1 => "latin-1",
            Self::Ascii => "ascii",
        }
    }

    /// Width in bytes of the smallest code unit
    pub(crate) fn unit(&self) -> usize {
        match self {
            Self::Utf16Le | Self::Utf16Be => 2,
            _ => 1,
        }
    }

    /// Encode text, failing on characters this encoding cannot represent.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            Self::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            Self::Latin1 | Self::Ascii => {
                let limit = if *self == Self::Latin1 { 0xFF } else { 0x7F };
                text.chars()
                    .map(|c| {
                        let code = c as u32;
                        if code <= limit {
                            Ok(code as u8)
                        } else {
                            Err(FileIoError::encoding(
                                self.name(),
                                format!("character {:?} cannot be encoded", c),
                            ))
                        }
                    })
                    .collect()
            }
        }
    }

    /// Decode bytes, failing on invalid or truncated input.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| FileIoError::encoding(self.name(), e.to_string())),
            Self::Utf16Le | Self::Utf16Be => {
                if bytes.len() % 2 != 0 {
                    return Err(FileIoError::encoding(
                        self.name(),
                        "truncated code unit at end of input",
                    ));
                }
                let units = bytes.chunks_exact(2).map(|pair| {
                    let pair = [pair[0], pair[1]];
                    if *self == Self::Utf16Le {
                        u16::from_le_bytes(pair)
                    } else {
                        u16::from_be_bytes(pair)
                    }
                });
                char::decode_utf16(units)
                    .collect::<std::result::Result<String, _>>()
                    .map_err(|e| FileIoError::encoding(self.name(), e.to_string()))
            }
            Self::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err(FileIoError::encoding(
                    self.name(),
                    format!("byte 0x{:02x} at position {} is not ascii", bytes[pos], pos),
                )),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
        }
    }

    /// Bytes making up a line feed
    pub(crate) fn newline(&self) -> &'static [u8] {
        match self {
            Self::Utf16Le => b"\n\0",
            Self::Utf16Be => b"\0\n",
            _ => b"\n",
        }
    }

    /// Length of the next character at the start of `bytes`
    pub(crate) fn char_width(&self, bytes: &[u8]) -> CharWidth {
        let Some(&lead) = bytes.first() else {
            return CharWidth::Incomplete;
        };
        let width = match self {
            Self::Latin1 => 1,
            Self::Ascii if lead.is_ascii() => 1,
            Self::Ascii => return CharWidth::Invalid,
            Self::Utf8 => match lead {
                0x00..=0x7F => 1,
                0xC2..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF4 => 4,
                _ => return CharWidth::Invalid,
            },
            Self::Utf16Le | Self::Utf16Be => {
                if bytes.len() < 2 {
                    return CharWidth::Incomplete;
                }
                let unit = if *self == Self::Utf16Le {
                    u16::from_le_bytes([bytes[0], bytes[1]])
                } else {
                    u16::from_be_bytes([bytes[0], bytes[1]])
                };
                match unit {
                    0xD800..=0xDBFF => 4,
                    0xDC00..=0xDFFF => return CharWidth::Invalid,
                    _ => 2,
                }
            }
        };
        if bytes.len() < width {
            CharWidth::Incomplete
        } else {
            CharWidth::Complete(width)
        }
    }

    /// Find the end (exclusive) of the first line terminator in `bytes`.
    pub(crate) fn find_line_end(&self, bytes: &[u8]) -> Option<usize> {
        match self.unit() {
            1 => memchr::memchr(b'\n', bytes).map(|pos| pos + 1),
            _ => {
                let newline = self.newline();
                bytes
                    .chunks_exact(2)
                    .position(|unit| unit == newline)
                    .map(|index| index * 2 + 2)
            }
        }
    }
}

impl FromStr for Encoding {
    type Err = FileIoError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "utf-16le" | "utf-16-le" | "utf16le" => Ok(Self::Utf16Le),
            "utf-16be" | "utf-16-be" | "utf16be" => Ok(Self::Utf16Be),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Self::Latin1),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            _ => Err(FileIoError::invalid_argument(format!(
                "unknown encoding '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("utf_16_le".parse::<Encoding>().unwrap(), Encoding::Utf16Le);
        assert_eq!("ISO-8859-1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!(matches!(
            "klingon".parse::<Encoding>(),
            Err(FileIoError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_utf16_encode_decode() {
        let bytes = Encoding::Utf16Le.encode("hé\n").unwrap();
        assert_eq!(bytes, vec![b'h', 0, 0xE9, 0, b'\n', 0]);
        assert_eq!(Encoding::Utf16Le.decode(&bytes).unwrap(), "hé\n");

        let bytes = Encoding::Utf16Be.encode("🦀").unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(Encoding::Utf16Be.char_width(&bytes), CharWidth::Complete(4));
        assert_eq!(Encoding::Utf16Be.decode(&bytes).unwrap(), "🦀");
    }

    #[test]
    fn test_unencodable_characters() {
        assert!(matches!(
            Encoding::Ascii.encode("café"),
            Err(FileIoError::Encoding { encoding: "ascii", .. })
        ));
        assert_eq!(Encoding::Latin1.encode("café").unwrap(), b"caf\xe9");
        assert!(Encoding::Latin1.encode("€").is_err());
    }

    #[test]
    fn test_mismatched_decode_fails() {
        let latin1 = Encoding::Latin1.encode("café").unwrap();
        assert!(matches!(
            Encoding::Utf8.decode(&latin1),
            Err(FileIoError::Encoding { encoding: "utf-8", .. })
        ));
        assert!(Encoding::Ascii.decode(&latin1).is_err());
        assert!(Encoding::Utf16Le.decode(b"abc").is_err());
    }

    #[test]
    fn test_char_width() {
        assert_eq!(Encoding::Utf8.char_width(b"a"), CharWidth::Complete(1));
        assert_eq!(Encoding::Utf8.char_width("é".as_bytes()), CharWidth::Complete(2));
        assert_eq!(Encoding::Utf8.char_width(&[0xE2, 0x82]), CharWidth::Incomplete);
        assert_eq!(Encoding::Utf8.char_width(&[0xFF]), CharWidth::Invalid);
        assert_eq!(Encoding::Utf8.char_width(&[]), CharWidth::Incomplete);
        assert_eq!(Encoding::Utf16Le.char_width(&[0x00, 0xDC]), CharWidth::Invalid);
    }

    #[test]
    fn test_find_line_end() {
        assert_eq!(Encoding::Utf8.find_line_end(b"ab\ncd"), Some(3));
        assert_eq!(Encoding::Utf8.find_line_end(b"abcd"), None);

        let utf16 = Encoding::Utf16Le.encode("ab\ncd").unwrap();
        assert_eq!(Encoding::Utf16Le.find_line_end(&utf16), Some(6));

        // U+0A00 has a 0x0A byte but is not a newline
        let tricky = Encoding::Utf16Le.encode("\u{0A00}x").unwrap();
        assert_eq!(Encoding::Utf16Le.find_line_end(&tricky), None);
    }
}
