// 🏗️ Tabular Parser
// Delimited text and spreadsheet workbooks → header-keyed import rows

use crate::aliases::AliasTable;
use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// CORE TYPES
// ============================================================================

/// One cell as it came out of the source: text, or a number when the
/// spreadsheet stored one. Empty cells never reach an `ImportRow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
        }
    }

    /// Textual form; numbers use their shortest decimal representation
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Canonical column name → non-empty cell. Absent columns are simply missing.
pub type ImportRow = BTreeMap<String, CellValue>;

/// Row-major cell grid, header row included
pub type Grid = Vec<Vec<CellValue>>;

/// SourceFormat - which reader understands the bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

impl SourceFormat {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceFormat::Delimited => "CSV",
            SourceFormat::Spreadsheet => "Spreadsheet",
        }
    }

    /// `csv`, `.XLSX`, ... → format; unknown extensions give `None`
    pub fn from_extension(extension: &str) -> Option<SourceFormat> {
        match extension.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" | "txt" => Some(SourceFormat::Delimited),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Spreadsheet),
            _ => None,
        }
    }
}

// ============================================================================
// GRID READERS
// ============================================================================

/// GridReader - turns raw bytes into a cell grid
///
/// Adding a new input format means implementing this trait and teaching
/// `detect_format` / `get_reader` about it. Header handling stays shared.
pub trait GridReader: Send + Sync {
    fn read_grid(&self, bytes: &[u8]) -> Result<Grid, ParseError>;

    fn format(&self) -> SourceFormat;
}

/// Comma-delimited UTF-8 text
pub struct DelimitedReader;

impl DelimitedReader {
    pub fn new() -> Self {
        DelimitedReader
    }
}

impl Default for DelimitedReader {
    fn default() -> Self {
        Self::new()
    }
}

impl GridReader for DelimitedReader {
    fn read_grid(&self, bytes: &[u8]) -> Result<Grid, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ParseError::Decode(e.to_string()))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        Ok(scan_delimited(text)
            .into_iter()
            .map(|record| record.into_iter().map(CellValue::Text).collect())
            .collect())
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Delimited
    }
}

/// Split delimited text into trimmed records.
///
/// - `,` separates fields unless inside double quotes
/// - `""` inside quotes is a literal quote
/// - `\n`, `\r\n` and a lone `\r` end a record unless inside quotes
/// - records whose fields are all empty are dropped
pub fn scan_delimited(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                record.push(field.trim().to_string());
                field.clear();
            }
            '\r' | '\n' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if !field.is_empty() || !record.is_empty() {
                    record.push(field.trim().to_string());
                    field.clear();
                    push_record(&mut records, std::mem::take(&mut record));
                }
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field.trim().to_string());
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    if record.iter().any(|f| !f.is_empty()) {
        records.push(record);
    }
}

/// First worksheet of an xlsx/xls/xlsb/ods workbook
#[cfg(feature = "spreadsheet")]
pub struct SpreadsheetReader;

#[cfg(feature = "spreadsheet")]
impl SpreadsheetReader {
    pub fn new() -> Self {
        SpreadsheetReader
    }

    fn convert_cell(cell: &calamine::Data) -> CellValue {
        use calamine::Data;

        match cell {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::Text(s.trim().to_string()),
            Data::Bool(b) => CellValue::Text(b.to_string()),
            Data::DateTime(dt) => CellValue::Text(excel_serial_to_date(dt.as_f64())),
            Data::DateTimeIso(s) => CellValue::Text(s.split('T').next().unwrap_or(s).to_string()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(_) | Data::Empty => CellValue::Text(String::new()),
        }
    }
}

#[cfg(feature = "spreadsheet")]
impl Default for SpreadsheetReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "spreadsheet")]
impl GridReader for SpreadsheetReader {
    fn read_grid(&self, bytes: &[u8]) -> Result<Grid, ParseError> {
        use calamine::Reader;

        let cursor = std::io::Cursor::new(bytes.to_vec());
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|e| ParseError::Decode(e.to_string()))?;

        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| ParseError::Decode(e.to_string()))?,
            None => return Err(ParseError::Empty),
        };

        Ok(range
            .rows()
            .map(|row| row.iter().map(Self::convert_cell).collect())
            .collect())
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Spreadsheet
    }
}

/// Excel serial day number → `YYYY-MM-DD` (epoch 1899-12-30, which absorbs
/// the 1900 leap-year bug)
pub fn excel_serial_to_date(serial: f64) -> String {
    chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|base| base.checked_add_signed(chrono::Duration::days(serial.floor() as i64)))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| serial.to_string())
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Detect source format from the file extension
pub fn detect_format(file_path: &Path) -> Result<SourceFormat, ParseError> {
    file_path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(SourceFormat::from_extension)
        .ok_or_else(|| {
            ParseError::UnsupportedFormat(format!("cannot detect format of {}", file_path.display()))
        })
}

/// Get the reader for a source format
pub fn get_reader(format: SourceFormat) -> Result<Box<dyn GridReader>, ParseError> {
    match format {
        SourceFormat::Delimited => Ok(Box::new(DelimitedReader::new())),
        #[cfg(feature = "spreadsheet")]
        SourceFormat::Spreadsheet => Ok(Box::new(SpreadsheetReader::new())),
        #[cfg(not(feature = "spreadsheet"))]
        SourceFormat::Spreadsheet => Err(ParseError::UnsupportedFormat(
            "spreadsheet support not compiled in (enable the `spreadsheet` feature)".to_string(),
        )),
    }
}

// ============================================================================
// GRID → ROWS
// ============================================================================

/// Row 0 is the header. Every later row becomes an `ImportRow` holding only
/// its non-empty cells; rows left with no cells are dropped.
pub fn rows_from_grid(grid: Grid, aliases: &AliasTable) -> Result<Vec<ImportRow>, ParseError> {
    let mut records = grid
        .into_iter()
        .filter(|record| record.iter().any(|cell| !cell.is_empty()));

    let header = records.next().ok_or(ParseError::Empty)?;
    let keys: Vec<String> = header
        .iter()
        .map(|cell| aliases.canonical_key(&cell.as_text()))
        .collect();
    debug!(?keys, "mapped header row");

    let rows = records
        .map(|record| {
            keys.iter()
                .zip(record)
                .filter(|(key, cell)| !key.is_empty() && !cell.is_empty())
                .map(|(key, cell)| (key.clone(), cell))
                .collect::<ImportRow>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    Ok(rows)
}

/// Parse raw bytes of a known format
pub fn parse_bytes(
    bytes: &[u8],
    format: SourceFormat,
    aliases: &AliasTable,
) -> Result<Vec<ImportRow>, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }
    let grid = get_reader(format)?.read_grid(bytes)?;
    rows_from_grid(grid, aliases)
}

/// Parse already-decoded delimited text
pub fn parse_text(text: &str, aliases: &AliasTable) -> Result<Vec<ImportRow>, ParseError> {
    parse_bytes(text.as_bytes(), SourceFormat::Delimited, aliases)
}

/// Read a file from disk, detect its format and parse it
pub fn parse_file(file_path: &Path, aliases: &AliasTable) -> Result<Vec<ImportRow>, ParseError> {
    let format = detect_format(file_path)?;
    let bytes = std::fs::read(file_path).map_err(|source| ParseError::Io {
        path: file_path.display().to_string(),
        source,
    })?;

    let rows = parse_bytes(&bytes, format, aliases)?;
    info!(
        file = %file_path.display(),
        format = format.name(),
        rows = rows.len(),
        "parsed import file"
    );
    Ok(rows)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    #[test]
    fn test_scan_simple_records() {
        let records = scan_delimited("a,b,c\n1,2,3\r\n4,5,6");
        assert_eq!(
            records,
            vec![
                vec!["a", "b", "c"],
                vec!["1", "2", "3"],
                vec!["4", "5", "6"],
            ]
        );
    }

    #[test]
    fn test_scan_quoted_delimiter_and_newline() {
        let records = scan_delimited("k,v\n\"Makan, siang\",\"baris\nkedua\"\n");
        assert_eq!(records[1], vec!["Makan, siang", "baris\nkedua"]);
    }

    #[test]
    fn test_scan_escaped_quote() {
        let records = scan_delimited("\"say \"\"hi\"\"\",x");
        assert_eq!(records, vec![vec!["say \"hi\"", "x"]]);
    }

    #[test]
    fn test_scan_drops_blank_records() {
        let records = scan_delimited("a,b\n\n,\n  ,  \n1,2\n");
        assert_eq!(records, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn test_scan_trims_fields() {
        let records = scan_delimited("  a , b  ");
        assert_eq!(records, vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_parse_text_convention_a() {
        let csv = "date,category,amount,type,note\n27/01/2026,Makan,Rp50.000,Uang Keluar,Makan siang\n";
        let rows = parse_text(csv, &AliasTable::default()).unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["tanggal"], text("27/01/2026"));
        assert_eq!(row["kategori"], text("Makan"));
        assert_eq!(row["nominal"], text("Rp50.000"));
        assert_eq!(row["tipe"], text("Uang Keluar"));
        assert_eq!(row["keterangan"], text("Makan siang"));
    }

    #[test]
    fn test_parse_text_convention_b() {
        let csv = "Tanggal,Jenis Transaksi,Kategori,Nominal\n01/02/2026,Pemasukan,Gaji,5000000\n";
        let rows = parse_text(csv, &AliasTable::default()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["tipe"], text("Pemasukan"));
        assert!(!rows[0].contains_key("keterangan"));
    }

    #[test]
    fn test_empty_cells_are_absent_not_null() {
        let csv = "tanggal,kategori,nominal,tipe,keterangan\n2026-01-01,Gaji,100,Pemasukan,\n";
        let rows = parse_text(csv, &AliasTable::default()).unwrap();
        assert_eq!(rows[0].len(), 4);
        assert!(!rows[0].contains_key("keterangan"));
    }

    #[test]
    fn test_short_rows_only_fill_present_columns() {
        let csv = "tanggal,kategori,nominal\n2026-01-01\n";
        let rows = parse_text(csv, &AliasTable::default()).unwrap();
        assert_eq!(rows[0].len(), 1);
    }

    #[test]
    fn test_header_only_yields_no_rows() {
        let rows = parse_text("tanggal,kategori\n", &AliasTable::default()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_empty_source_is_parse_error() {
        assert!(matches!(parse_text("", &AliasTable::default()), Err(ParseError::Empty)));
        assert!(matches!(parse_text("\n\n , \n", &AliasTable::default()), Err(ParseError::Empty)));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let bytes = [0x74, 0x61, 0xff, 0xfe];
        let result = parse_bytes(&bytes, SourceFormat::Delimited, &AliasTable::default());
        assert!(matches!(result, Err(ParseError::Decode(_))));
    }

    #[test]
    fn test_bom_is_ignored() {
        let csv = "\u{feff}tanggal,kategori\n2026-01-01,Gaji\n";
        let rows = parse_text(csv, &AliasTable::default()).unwrap();
        assert!(rows[0].contains_key("tanggal"));
    }

    #[test]
    fn test_rows_from_numeric_grid() {
        let grid = vec![
            vec![text("Tanggal"), text("Nominal"), text("Kategori")],
            vec![text("2026-01-05"), CellValue::Number(1500.5), text("")],
            vec![text(""), CellValue::Number(f64::NAN), text("")],
        ];
        let rows = rows_from_grid(grid, &AliasTable::default()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["nominal"], CellValue::Number(1500.5));
        assert!(!rows[0].contains_key("kategori"));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("data.CSV")).unwrap(), SourceFormat::Delimited);
        assert_eq!(detect_format(Path::new("data.xlsx")).unwrap(), SourceFormat::Spreadsheet);
        assert!(matches!(
            detect_format(Path::new("data.pdf")),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SourceFormat::from_extension(".ODS"), Some(SourceFormat::Spreadsheet));
        assert_eq!(SourceFormat::from_extension("txt"), Some(SourceFormat::Delimited));
        assert_eq!(SourceFormat::from_extension(""), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(46049.0), "2026-01-27");
        assert_eq!(excel_serial_to_date(46049.75), "2026-01-27");
    }

    #[test]
    fn test_parse_file_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "tgl,kat,jumlah,jenis transaksi").unwrap();
        writeln!(file, "\"27/01/2026\",\"Transport\",\"25000\",\"Pengeluaran\"").unwrap();

        let rows = parse_file(file.path(), &AliasTable::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["nominal"], text("25000"));
        assert_eq!(rows[0]["tipe"], text("Pengeluaran"));
    }

    #[test]
    fn test_parse_file_missing_is_io_error() {
        let result = parse_file(Path::new("/nonexistent/import.csv"), &AliasTable::default());
        assert!(matches!(result, Err(ParseError::Io { .. })));
    }
}
