//! Access modes: what a handle may do with its resource.
//!
//! Modes are written the conventional way: one intent letter (`r`, `w`, `a`, `x`),
//! an optional format letter (`t` text, `b` binary) and an optional `+` for update.

use crate::error::{FileIoError, Result};
use std::fmt;
use std::str::FromStr;

/// What the caller intends to do with the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Read existing content; fails if the resource is missing
    Read,
    /// Create or truncate, then write
    Write,
    /// Create if missing; every write lands at the end
    Append,
    /// Create a new resource; fails if it already exists
    CreateNew,
}

/// Whether reads and writes deal in characters or raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Binary,
}

/// Combined access mode of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMode {
    intent: Intent,
    format: Format,
    update: bool,
}

impl AccessMode {
    pub const fn new(intent: Intent, format: Format, update: bool) -> Self {
        Self {
            intent,
            format,
            update,
        }
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// `+` was given: the handle both reads and writes
    pub fn is_update(&self) -> bool {
        self.update
    }

    pub fn is_text(&self) -> bool {
        self.format == Format::Text
    }

    pub fn readable(&self) -> bool {
        self.intent == Intent::Read || self.update
    }

    pub fn writable(&self) -> bool {
        self.intent != Intent::Read || self.update
    }

    /// Only `w` discards existing content.
    pub fn truncates(&self) -> bool {
        self.intent == Intent::Write
    }

    pub fn appends(&self) -> bool {
        self.intent == Intent::Append
    }

    /// Build the `std::fs::OpenOptions` matching this mode
    pub(crate) fn to_open_options(self) -> std::fs::OpenOptions {
        let mut options = std::fs::OpenOptions::new();
        match self.intent {
            Intent::Read => {
                options.read(true).write(self.update);
            }
            Intent::Write => {
                options
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .read(self.update);
            }
            Intent::Append => {
                options.append(true).create(true).read(self.update);
            }
            Intent::CreateNew => {
                options.write(true).create_new(true).read(self.update);
            }
        }
        options
    }
}

impl FromStr for AccessMode {
    type Err = FileIoError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FileIoError::invalid_argument(format!("invalid access mode '{}'", s));

        let mut intent = None;
        let mut format = None;
        let mut update = false;

        for c in s.chars() {
            match c {
                'r' | 'w' | 'a' | 'x' => {
                    if intent.is_some() {
                        return Err(invalid());
                    }
                    intent = Some(match c {
                        'r' => Intent::Read,
                        'w' => Intent::Write,
                        'a' => Intent::Append,
                        _ => Intent::CreateNew,
                    });
                }
                't' | 'b' => {
                    if format.is_some() {
                        return Err(invalid());
                    }
                    format = Some(if c == 't' { Format::Text } else { Format::Binary });
                }
                '+' => {
                    if update {
                        return Err(invalid());
                    }
                    update = true;
                }
                _ => return Err(invalid()),
            }
        }

        Ok(Self {
            intent: intent.ok_or_else(invalid)?,
            format: format.unwrap_or(Format::Text),
            update,
        })
    }
}

impl TryFrom<&str> for AccessMode {
    type Error = FileIoError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let intent = match self.intent {
            Intent::Read => "r",
            Intent::Write => "w",
            Intent::Append => "a",
            Intent::CreateNew => "x",
        };
        let format = match self.format {
            Format::Text => "",
            Format::Binary => "b",
        };
        let update = if self.update { "+" } else { "" };
        write!(f, "{}{}{}", intent, format, update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_modes() {
        let mode: AccessMode = "r".parse().unwrap();
        assert_eq!(mode.intent(), Intent::Read);
        assert!(mode.is_text());
        assert!(mode.readable());
        assert!(!mode.writable());

        let mode: AccessMode = "wb".parse().unwrap();
        assert_eq!(mode.format(), Format::Binary);
        assert!(mode.writable());
        assert!(!mode.readable());
        assert!(mode.truncates());

        let mode: AccessMode = "r+".parse().unwrap();
        assert!(mode.readable() && mode.writable());
        assert!(!mode.truncates());

        let mode: AccessMode = "+ab".parse().unwrap();
        assert!(mode.appends());
        assert!(mode.is_update());
        assert_eq!(mode.to_string(), "ab+");
    }

    #[test]
    fn test_only_write_intent_truncates() {
        for mode in ["r+", "a", "a+", "x", "x+", "rb+"] {
            let mode: AccessMode = mode.parse().unwrap();
            assert!(!mode.truncates(), "{} must not truncate", mode);
        }
    }

    #[test]
    fn test_reject_malformed_modes() {
        for bad in ["", "b", "rw", "rbt", "r++", "q", "tb"] {
            let result: Result<AccessMode> = bad.parse();
            assert!(
                matches!(result, Err(FileIoError::InvalidArgument { .. })),
                "mode '{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        for mode in ["r", "w+", "ab", "xb+", "r+"] {
            let parsed: AccessMode = mode.parse().unwrap();
            let again: AccessMode = parsed.to_string().parse().unwrap();
            assert_eq!(parsed, again);
        }
    }
}
