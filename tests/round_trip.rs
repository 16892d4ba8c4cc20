use proptest::prelude::*;

use fileio::structured::delimited::LineTerminator;
use fileio::structured::{read_csv, read_json, write_csv, write_json, CsvDialect, JsonOptions};
use fileio::{Data, Encoding, Handle, SeekOrigin};

fn scratch(mode: &str, encoding: Option<Encoding>) -> Handle {
    Handle::temporary(mode.parse().unwrap(), encoding).unwrap()
}

fn encodings() -> impl Strategy<Value = Encoding> {
    prop_oneof![
        Just(Encoding::Utf8),
        Just(Encoding::Utf16Le),
        Just(Encoding::Utf16Be),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn binary_write_then_read_returns_same_bytes(content in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let mut handle = scratch("w+b", None);
        prop_assert_eq!(handle.write(content.clone()).unwrap(), content.len());
        prop_assert_eq!(handle.seek(0, SeekOrigin::Start).unwrap(), 0);
        prop_assert_eq!(handle.tell().unwrap(), 0);
        prop_assert_eq!(handle.read(None).unwrap(), Data::Bytes(content));
        handle.close().unwrap();
    }

    #[test]
    fn text_write_then_read_returns_same_text(text in "\\PC{0,200}", encoding in encodings()) {
        let mut handle = scratch("w+", Some(encoding));
        prop_assert_eq!(handle.write(text.as_str()).unwrap(), text.chars().count());
        handle.rewind().unwrap();
        prop_assert_eq!(handle.read_to_string().unwrap(), text);
    }

    #[test]
    fn chunked_text_reads_reassemble(text in "[a-zé€\n]{0,120}", chunk in 1usize..16) {
        let mut handle = scratch("w+", None);
        handle.write(text.as_str()).unwrap();
        handle.rewind().unwrap();

        let mut assembled = String::new();
        loop {
            let piece = handle.read(Some(chunk)).unwrap().into_text().unwrap();
            if piece.is_empty() {
                break;
            }
            prop_assert!(piece.chars().count() <= chunk);
            assembled.push_str(&piece);
        }
        prop_assert_eq!(assembled, text);
    }

    #[test]
    fn negative_seek_is_rejected(offset in i64::MIN..0) {
        let mut handle = scratch("w+b", None);
        let is_invalid = matches!(
            handle.seek(offset, SeekOrigin::Start),
            Err(fileio::FileIoError::InvalidOffset { .. })
        );
        prop_assert!(is_invalid);
        prop_assert_eq!(handle.tell().unwrap(), 0);
    }

    #[test]
    fn csv_rows_round_trip(
        rows in proptest::collection::vec(
            proptest::collection::vec("[a-zA-Z0-9 ,;\"\r\n]{0,12}", 0..5),
            0..8,
        ),
        semicolons in any::<bool>(),
    ) {
        let dialect = if semicolons {
            CsvDialect::default()
                .with_delimiter(b';')
                .with_terminator(LineTerminator::Byte(b'\n'))
        } else {
            CsvDialect::default()
        };
        let mut handle = scratch("w+", None);
        write_csv(&mut handle, &rows, &dialect).unwrap();
        handle.rewind().unwrap();
        prop_assert_eq!(read_csv(&mut handle, &dialect).unwrap(), rows);
    }

    #[test]
    fn json_values_round_trip(
        name in "\\PC{0,40}",
        age in any::<u32>(),
        tags in proptest::collection::vec("[a-z]{0,8}", 0..6),
        indent in 0usize..5,
    ) {
        let value = serde_json::json!({"name": name, "age": age, "tags": tags});
        let options = if indent == 0 { JsonOptions::default() } else { JsonOptions::pretty(indent) };

        let mut handle = scratch("w+", None);
        write_json(&mut handle, &value, &options).unwrap();
        handle.rewind().unwrap();
        let decoded: serde_json::Value = read_json(&mut handle).unwrap();
        prop_assert_eq!(decoded, value);
    }
}
