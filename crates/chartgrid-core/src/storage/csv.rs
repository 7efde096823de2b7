//! CSV/TSV import and export.

use std::path::Path;

use super::clipboard::parse_paste_buffer;
use super::import::{ExportedSheet, ImportedSheet, RawValue, Worksheet};
use crate::error::{GridError, Result};

const MAX_IMPORT_FILE_BYTES: u64 = 64 * 1_048_576; // 64 MiB

/// Tab when any line holds one, comma otherwise. Same rule as pasting.
pub fn detect_delimiter(text: &str) -> u8 {
    if text.lines().any(|line| line.contains('\t')) {
        b'\t'
    } else {
        b','
    }
}

/// Split delimited text into rows of fields.
///
/// The `csv` crate does the work (quoted fields may span lines).
pub fn parse_delimited(text: &str) -> Result<Vec<Vec<String>>> {
    parse_delimited_bytes(text.as_bytes())
}

/// Like [`parse_delimited`] for raw file contents. Input the `csv` crate
/// rejects (invalid UTF-8 in a field) goes through the line-based paste
/// parser instead, with bad bytes replaced by U+FFFD.
pub fn parse_delimited_bytes(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let text = String::from_utf8_lossy(bytes);
    if text.trim().is_empty() {
        return Err(GridError::EmptyImport);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(detect_delimiter(&text))
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => {
                log::warn!("structured CSV parse failed ({}); using line parser", e);
                return Ok(parse_paste_buffer(&text));
            }
        }
    }
    Ok(rows)
}

/// Parse delimited text into a worksheet called `name`.
pub fn read_delimited(name: &str, text: &str) -> Result<ImportedSheet> {
    read_delimited_bytes(name, text.as_bytes())
}

pub fn read_delimited_bytes(name: &str, bytes: &[u8]) -> Result<ImportedSheet> {
    let sheet = Worksheet::from_fields(name, parse_delimited_bytes(bytes)?);
    if sheet.is_empty() {
        return Err(GridError::EmptyImport);
    }
    Ok(sheet)
}

/// Read a CSV/TSV file; the worksheet is named after the file stem.
pub fn read_delimited_file(path: &Path) -> Result<ImportedSheet> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_IMPORT_FILE_BYTES {
        return Err(GridError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "{} is too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_IMPORT_FILE_BYTES
            ),
        )));
    }
    let bytes = std::fs::read(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    read_delimited_bytes(&name, &bytes)
}

/// Render one sheet as delimited text, one line per row.
pub fn write_delimited(sheet: &ExportedSheet, delimiter: u8) -> String {
    let delimiter = char::from(delimiter);
    let mut out = String::new();
    for row in &sheet.rows {
        let fields: Vec<String> = row
            .iter()
            .map(|value| match value {
                RawValue::Empty => String::new(),
                RawValue::Number(n) => chartgrid_engine::engine::format_number(*n),
                RawValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
                RawValue::Text(s) => escape_csv_field(s, delimiter),
            })
            .collect();
        out.push_str(&fields.join(&delimiter.to_string()));
        out.push('\n');
    }
    out
}

pub fn write_csv_file(path: &Path, sheet: &ExportedSheet) -> Result<()> {
    std::fs::write(path, write_delimited(sheet, b','))?;
    Ok(())
}

/// Escape a text field for delimited output.
pub fn escape_csv_field(field: &str, delimiter: char) -> String {
    // Guard against CSV formula injection in spreadsheet apps.
    let first_non_space = field.trim_start_matches([' ', '\t']).chars().next();
    let safe_field = if matches!(first_non_space, Some('=' | '+' | '-' | '@')) {
        format!("'{}", field)
    } else {
        field.to_string()
    };

    if safe_field.contains(delimiter)
        || safe_field.contains('"')
        || safe_field.contains('\n')
        || safe_field.contains('\r')
    {
        format!("\"{}\"", safe_field.replace('"', "\"\""))
    } else {
        safe_field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_parse_delimited_quoted_fields() {
        assert_eq!(
            parse_delimited("a,\"hello, world\",c\n1,\"multi\nline\",3").unwrap(),
            vec![
                vec!["a", "hello, world", "c"],
                vec!["1", "multi\nline", "3"],
            ]
        );
    }

    #[test]
    fn test_parse_delimited_detects_tabs() {
        assert_eq!(
            parse_delimited("a\tb,c\n1\t2").unwrap(),
            vec![vec!["a", "b,c"], vec!["1", "2"]]
        );
    }

    #[test]
    fn test_parse_delimited_ragged_rows() {
        assert_eq!(
            parse_delimited("a,b,c\nd").unwrap(),
            vec![vec!["a", "b", "c"], vec!["d"]]
        );
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_line_parser() {
        let rows = parse_delimited_bytes(b"name,qty\nbo\xFFlt,4\n").unwrap();
        assert_eq!(
            rows,
            vec![vec!["name", "qty"], vec!["bo\u{FFFD}lt", "4"]]
        );
    }

    #[test]
    fn test_file_with_invalid_utf8_still_imports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        std::fs::write(&path, b"caf\xE9,2\n").unwrap();

        let sheet = read_delimited_file(&path).unwrap();
        assert_eq!(
            sheet.rows[0],
            vec![RawValue::Text("caf\u{FFFD}".into()), RawValue::Number(2.0)]
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(parse_delimited(""), Err(GridError::EmptyImport)));
        assert!(matches!(parse_delimited(" \n "), Err(GridError::EmptyImport)));
        assert!(matches!(read_delimited("x", ",,\n,"), Err(GridError::EmptyImport)));
    }

    #[test]
    fn test_escape_csv_field() {
        assert_eq!(escape_csv_field("simple", ','), "simple");
        assert_eq!(escape_csv_field("with,comma", ','), "\"with,comma\"");
        assert_eq!(escape_csv_field("with,comma", '\t'), "with,comma");
        assert_eq!(escape_csv_field("with\"quote", ','), "\"with\"\"quote\"");
    }

    #[test]
    fn test_escape_csv_field_formula_injection_with_leading_whitespace() {
        assert_eq!(escape_csv_field(" =1+1", ','), "' =1+1");
        assert_eq!(escape_csv_field("\t-2+3", ','), "'\t-2+3");
        assert_eq!(escape_csv_field(" \t@cmd", ','), "' \t@cmd");
    }

    #[test]
    fn test_write_delimited_leaves_numbers_unguarded() {
        let sheet = Worksheet::new(
            "out",
            vec![
                vec![RawValue::Text("Name".into()), RawValue::Text("Delta".into())],
                vec![RawValue::Text("a, b".into()), RawValue::Number(-5.0)],
                vec![RawValue::Empty, RawValue::Bool(true)],
            ],
        );
        assert_eq!(write_delimited(&sheet, b','), "Name,Delta\n\"a, b\",-5\n,TRUE\n");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "Region,Total\nNorth,10\n").unwrap();

        let sheet = read_delimited_file(&path).unwrap();
        assert_eq!(sheet.name, "sales");
        assert_eq!(sheet.rows[1], vec![RawValue::Text("North".into()), RawValue::Number(10.0)]);

        let out = dir.path().join("out.csv");
        write_csv_file(&out, &sheet).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "Region,Total\nNorth,10\n");
    }
}
