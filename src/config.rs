//! Defaults for the facade: text encoding, JSON indentation, CSV dialect and
//! compression level.
//!
//! With the `config` feature these are read from `<config_dir>/fileio/config.toml`:
//!
//! ```toml
//! encoding = "utf-8"
//! json_indent = 4          # 0 writes compact JSON
//! compression_level = 6
//!
//! [csv]
//! delimiter = ","
//! quote = '"'
//! terminator = "\r\n"      # or any single ASCII character
//! ```

use crate::error::{FileIoError, Result};
use crate::file_handler::{CompressionType, Encoding};
use crate::structured::delimited::LineTerminator;
use crate::structured::{CsvDialect, JsonOptions};
use serde::Deserialize;

/// CSV dialect as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvSettings {
    pub delimiter: char,
    pub quote: char,
    pub terminator: String,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            terminator: "\r\n".to_string(),
        }
    }
}

/// Facade-wide defaults
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FacadeConfig {
    /// Encoding for text handles opened without an explicit one
    pub encoding: String,
    /// Spaces per JSON nesting level; 0 for compact output
    pub json_indent: usize,
    /// Level passed to compressed writers
    pub compression_level: u32,
    pub csv: CsvSettings,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::default().name().to_string(),
            json_indent: 4,
            compression_level: 6,
            csv: CsvSettings::default(),
        }
    }
}

fn ascii_byte(field: &str, c: char) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(FileIoError::config(format!(
            "csv.{} must be an ASCII character, got {:?}",
            field, c
        )))
    }
}

impl FacadeConfig {
    /// Default text encoding
    pub fn encoding(&self) -> Result<Encoding> {
        self.encoding
            .parse()
            .map_err(|_| FileIoError::config(format!("unknown encoding '{}'", self.encoding)))
    }

    pub fn json_options(&self) -> JsonOptions {
        match self.json_indent {
            0 => JsonOptions::default(),
            width => JsonOptions::pretty(width),
        }
    }

    pub fn csv_dialect(&self) -> Result<CsvDialect> {
        let terminator = match self.csv.terminator.as_str() {
            "\r\n" => LineTerminator::CrLf,
            single if single.chars().count() == 1 => {
                let c = single.chars().next().unwrap_or('\n');
                LineTerminator::Byte(ascii_byte("terminator", c)?)
            }
            other => {
                return Err(FileIoError::config(format!(
                    "csv.terminator must be \"\\r\\n\" or one character, got {:?}",
                    other
                )))
            }
        };

        Ok(CsvDialect {
            delimiter: ascii_byte("delimiter", self.csv.delimiter)?,
            quote: ascii_byte("quote", self.csv.quote)?,
            terminator,
        })
    }

    /// Compression level clamped to what `compression` accepts
    pub fn compression_level(&self, compression: CompressionType) -> u32 {
        match compression {
            CompressionType::Gzip => self.compression_level.min(9),
            CompressionType::Zstd => self.compression_level.clamp(1, 22),
            CompressionType::None => 0,
        }
    }

    /// Check every value, so bad configuration fails at load time
    pub fn validate(&self) -> Result<()> {
        self.encoding()?;
        self.csv_dialect()?;
        Ok(())
    }
}

#[cfg(feature = "config")]
impl FacadeConfig {
    /// Parse and validate TOML configuration
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| FileIoError::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Location of the user configuration file
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fileio").join("config.toml"))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                log::debug!("loading configuration from {}", path.display());
                Self::from_toml_str(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(FileIoError::from_io(e, path)),
        }
    }

    /// Load the user configuration, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(not(feature = "config"))]
impl FacadeConfig {
    /// Built without the `config` feature: always the defaults
    pub fn load() -> Result<Self> {
        Ok(Self::default())
    }
}
