//! JSON documents over handles.

use super::{read_wire, write_wire};
use crate::error::{FileIoError, Result};
use crate::file_handler::Handle;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Cosmetic formatting of written JSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonOptions {
    /// Spaces per nesting level; `None` writes compact JSON
    pub indent: Option<usize>,
}

impl JsonOptions {
    pub fn pretty(indent: usize) -> Self {
        Self {
            indent: Some(indent),
        }
    }
}

/// Decode the rest of `handle` as a JSON document
pub fn read_json<T: DeserializeOwned>(handle: &mut Handle) -> Result<T> {
    let wire = read_wire(handle)?;
    serde_json::from_slice(&wire).map_err(FileIoError::from)
}

/// Encode `value` and write it at the cursor
pub fn write_json<T: Serialize + ?Sized>(
    handle: &mut Handle,
    value: &T,
    options: &JsonOptions,
) -> Result<()> {
    let wire = encode(value, options)?;
    write_wire(handle, wire, "json")
}

fn encode<T: Serialize + ?Sized>(value: &T, options: &JsonOptions) -> Result<Vec<u8>> {
    let mut wire = Vec::new();
    match options.indent {
        None => serde_json::to_writer(&mut wire, value)?,
        Some(width) => {
            let indent = vec![b' '; width];
            let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
            let mut serializer = serde_json::Serializer::with_formatter(&mut wire, formatter);
            value.serialize(&mut serializer)?;
        }
    }
    Ok(wire)
}
