//! Structured payloads (JSON documents, CSV rows) read from and written to handles.
//!
//! Payloads are transient: decoded from whatever remains of a handle, or
//! encoded and written at its cursor. Both formats work on text and binary
//! handles; text handles apply their encoding on top of the UTF-8 wire form.

pub mod delimited;
pub mod json;

pub use delimited::{read_csv, write_csv, CsvDialect, Rows};
pub use json::{read_json, write_json, JsonOptions};

use crate::error::{FileIoError, Result};
use crate::file_handler::{Data, Handle};

/// Wire format of a structured payload
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredFormat {
    Json(JsonOptions),
    Csv(CsvDialect),
}

impl StructuredFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Csv(_) => "csv",
        }
    }
}

/// Decoded document
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Rows(Rows),
}

/// Decode everything remaining in `handle` as `format`.
///
/// # Errors
/// * `Format` - the content is not valid for `format`
pub fn read_structured(handle: &mut Handle, format: &StructuredFormat) -> Result<Payload> {
    match format {
        StructuredFormat::Json(_) => read_json(handle).map(Payload::Json),
        StructuredFormat::Csv(dialect) => read_csv(handle, dialect).map(Payload::Rows),
    }
}

/// Encode `payload` as `format` and write it at the cursor.
///
/// # Errors
/// * `InvalidArgument` - the payload kind does not match `format`
pub fn write_structured(
    handle: &mut Handle,
    payload: &Payload,
    format: &StructuredFormat,
) -> Result<()> {
    match (payload, format) {
        (Payload::Json(value), StructuredFormat::Json(options)) => write_json(handle, value, options),
        (Payload::Rows(rows), StructuredFormat::Csv(dialect)) => write_csv(handle, rows, dialect),
        (_, other) => {
            Err(FileIoError::invalid_argument(format!(
                "payload cannot be written as {}",
                other.name()
            )))
        }
    }
}

/// Remaining content of `handle` in its UTF-8 wire form
fn read_wire(handle: &mut Handle) -> Result<Vec<u8>> {
    handle.read(None).map(Data::into_bytes)
}

/// Write UTF-8 wire bytes, re-encoding for text handles
fn write_wire(handle: &mut Handle, wire: Vec<u8>, format: &'static str) -> Result<()> {
    if handle.mode().is_text() {
        let text = String::from_utf8(wire)
            .map_err(|e| FileIoError::format(format, format!("encoder produced invalid UTF-8: {}", e)))?;
        handle.write(text)?;
    } else {
        handle.write(wire)?;
    }
    Ok(())
}
