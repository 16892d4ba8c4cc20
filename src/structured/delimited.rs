//! CSV rows over handles.
//!
//! Rows are plain sequences of string fields; no header handling is applied.

use super::{read_wire, write_wire};
use crate::error::{FileIoError, Result};
use crate::file_handler::Handle;

/// Decoded CSV content: one `Vec<String>` per record, in file order
pub type Rows = Vec<Vec<String>>;

/// Record terminator used when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    /// Write `\r\n`; read any of `\r`, `\n`, `\r\n`
    CrLf,
    /// A single terminator byte for both reading and writing
    Byte(u8),
}

impl LineTerminator {
    fn to_csv(self) -> csv::Terminator {
        match self {
            Self::CrLf => csv::Terminator::CRLF,
            Self::Byte(byte) => csv::Terminator::Any(byte),
        }
    }

    fn ends_record(self, byte: u8) -> bool {
        match self {
            Self::CrLf => byte == b'\r' || byte == b'\n',
            Self::Byte(terminator) => byte == terminator,
        }
    }

    fn write_to(self, wire: &mut Vec<u8>) {
        match self {
            Self::CrLf => wire.extend_from_slice(b"\r\n"),
            Self::Byte(byte) => wire.push(byte),
        }
    }
}

/// Field delimiter, quote character and record terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvDialect {
    pub delimiter: u8,
    pub quote: u8,
    pub terminator: LineTerminator,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            terminator: LineTerminator::CrLf,
        }
    }
}

impl CsvDialect {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }
}

/// Split the wire form into raw records without their terminators.
///
/// Terminators inside quoted fields do not end a record, and `\r\n` counts
/// once. A blank line yields an empty slice; nothing follows the final
/// terminator.
fn split_records<'w>(wire: &'w [u8], dialect: &CsvDialect) -> Vec<&'w [u8]> {
    let mut records = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut i = 0;

    while i < wire.len() {
        let byte = wire[i];
        let at_field_start = i == start || wire[i - 1] == dialect.delimiter;
        if byte == dialect.quote && (quoted || at_field_start) {
            quoted = !quoted;
        } else if !quoted && dialect.terminator.ends_record(byte) {
            records.push(&wire[start..i]);
            if byte == b'\r'
                && dialect.terminator == LineTerminator::CrLf
                && wire.get(i + 1) == Some(&b'\n')
            {
                i += 1;
            }
            start = i + 1;
        }
        i += 1;
    }
    if start < wire.len() {
        records.push(&wire[start..]);
    }
    records
}

/// Decode the rest of `handle` into rows. Records may differ in length, and a
/// blank line is a row with no fields.
pub fn read_csv(handle: &mut Handle, dialect: &CsvDialect) -> Result<Rows> {
    let wire = read_wire(handle)?;
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .terminator(dialect.terminator.to_csv());

    let mut rows = Rows::new();
    for raw in split_records(&wire, dialect) {
        if raw.is_empty() {
            rows.push(Vec::new());
            continue;
        }
        let row = match builder.from_reader(raw).records().next() {
            Some(record) => record?.iter().map(str::to_owned).collect(),
            None => Vec::new(),
        };
        rows.push(row);
    }
    Ok(rows)
}

/// Encode `rows` and write them at the cursor, one record per line.
///
/// A row with no fields is written as a bare terminator.
pub fn write_csv<I, R, F>(handle: &mut Handle, rows: I, dialect: &CsvDialect) -> Result<()>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .flexible(true)
        .delimiter(dialect.delimiter)
        .quote(dialect.quote)
        .terminator(dialect.terminator.to_csv());

    let mut wire = Vec::new();
    for row in rows {
        let fields: Vec<F> = row.into_iter().collect();
        if fields.is_empty() {
            dialect.terminator.write_to(&mut wire);
            continue;
        }
        let mut writer = builder.from_writer(&mut wire);
        writer.write_record(&fields)?;
        writer
            .flush()
            .map_err(|e| FileIoError::format("csv", e.to_string()))?;
    }

    write_wire(handle, wire, "csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Rows {
        data.iter()
            .map(|row| row.iter().map(|field| field.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_default_dialect_output() {
        let mut tmp = Handle::temporary("w+".parse().unwrap(), None).unwrap();
        write_csv(&mut tmp, [["Name", "Age"], ["Bob", "25"]], &CsvDialect::default()).unwrap();
        tmp.rewind().unwrap();
        assert_eq!(tmp.read_to_string().unwrap(), "Name,Age\r\nBob,25\r\n");
    }

    #[test]
    fn test_quoting_round_trip() {
        let mut tmp = Handle::temporary("w+".parse().unwrap(), None).unwrap();
        let data = rows(&[&["a,b", "say \"hi\""], &["multi\nline", ""], &["short"]]);

        write_csv(&mut tmp, &data, &CsvDialect::default()).unwrap();
        tmp.rewind().unwrap();
        assert_eq!(read_csv(&mut tmp, &CsvDialect::default()).unwrap(), data);
    }

    #[test]
    fn test_custom_dialect() {
        let dialect = CsvDialect::default()
            .with_delimiter(b';')
            .with_terminator(LineTerminator::Byte(b'\n'));
        let mut tmp = Handle::temporary("w+".parse().unwrap(), None).unwrap();

        write_csv(&mut tmp, [["x", "y"], ["1", "2"]], &dialect).unwrap();
        tmp.rewind().unwrap();
        assert_eq!(tmp.read_to_string().unwrap(), "x;y\n1;2\n");

        tmp.rewind().unwrap();
        assert_eq!(read_csv(&mut tmp, &dialect).unwrap(), rows(&[&["x", "y"], &["1", "2"]]));
    }

    #[test]
    fn test_reader_tolerates_bare_newlines() {
        let mut tmp = Handle::temporary("w+".parse().unwrap(), None).unwrap();
        tmp.write("Name,Age\nAlice,30\n").unwrap();
        tmp.rewind().unwrap();
        assert_eq!(
            read_csv(&mut tmp, &CsvDialect::default()).unwrap(),
            rows(&[&["Name", "Age"], &["Alice", "30"]])
        );
    }

    #[test]
    fn test_empty_rows_survive_round_trip() {
        let mut tmp = Handle::temporary("w+".parse().unwrap(), None).unwrap();
        let data = rows(&[&["a"], &[], &[""], &["", ""], &["b"], &[]]);

        write_csv(&mut tmp, &data, &CsvDialect::default()).unwrap();
        tmp.rewind().unwrap();
        assert_eq!(
            tmp.read_to_string().unwrap(),
            "a\r\n\r\n\"\"\r\n,\r\nb\r\n\r\n"
        );

        tmp.rewind().unwrap();
        assert_eq!(read_csv(&mut tmp, &CsvDialect::default()).unwrap(), data);
    }

    #[test]
    fn test_blank_lines_and_quoted_terminators() {
        let dialect = CsvDialect::default().with_terminator(LineTerminator::Byte(b'\n'));
        let mut tmp = Handle::temporary("w+".parse().unwrap(), None).unwrap();
        tmp.write("x\n\n\"two\nlines\",y\nlast").unwrap();
        tmp.rewind().unwrap();
        assert_eq!(
            read_csv(&mut tmp, &dialect).unwrap(),
            rows(&[&["x"], &[], &["two\nlines", "y"], &["last"]])
        );
    }

    #[test]
    fn test_invalid_utf8_is_format_error() {
        let mut tmp = Handle::temporary("w+b".parse().unwrap(), None).unwrap();
        tmp.write(b"ok,\xff\xfe\n").unwrap();
        tmp.rewind().unwrap();
        assert!(matches!(
            read_csv(&mut tmp, &CsvDialect::default()),
            Err(FileIoError::Format { format: "csv", .. })
        ));
    }
}
