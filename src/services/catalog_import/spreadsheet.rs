use std::fmt;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors raised while turning an uploaded file into a grid.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("Unsupported file type: {0}. Accepted: .csv, .xlsx, .xls")]
    UnsupportedExtension(String),

    #[error("The uploaded file is empty")]
    Empty,

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Workbook has no sheets")]
    NoSheets,
}

/// Upload formats accepted by the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Xlsx,
    Xls,
}

impl FileKind {
    /// Classifies a filename by extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Result<Self, SpreadsheetError> {
        let lower = filename.trim().to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(FileKind::Csv)
        } else if lower.ends_with(".xlsx") {
            Ok(FileKind::Xlsx)
        } else if lower.ends_with(".xls") {
            Ok(FileKind::Xls)
        } else {
            let extension = lower
                .rsplit_once('.')
                .map(|(_, ext)| format!(".{ext}"))
                .unwrap_or_else(|| "(none)".to_string());
            Err(SpreadsheetError::UnsupportedExtension(extension))
        }
    }
}

/// One raw cell, keeping the workbook's native typing where it has one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed textual form, `None` for blank cells.
    pub fn as_trimmed_text(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        Some(self.to_string().trim().to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Int(value) => write!(f, "{value}"),
            CellValue::Float(value) => write!(f, "{value}"),
            CellValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(text) => CellValue::Text(text.clone()),
            Data::Int(value) => CellValue::Int(*value),
            Data::Float(value) => CellValue::Float(*value),
            Data::Bool(value) => CellValue::Bool(*value),
            Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
            // Excel serial dates are kept numeric, the importer never interprets them.
            Data::DateTime(value) => CellValue::Float(value.as_f64()),
            Data::Error(err) => CellValue::Text(format!("{err:?}")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        if text.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(text.to_string())
        }
    }
}

/// One decoded row with its 1-based row number in the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub number: usize,
    pub cells: Vec<CellValue>,
}

/// Decoded sheet: the first row is the header row.
///
/// Row numbers come from the source, so blank lines the decoder dropped and
/// empty rows above the used range still count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadsheetGrid {
    rows: Vec<GridRow>,
}

impl SpreadsheetGrid {
    /// Builds a grid whose rows are numbered consecutively from 1.
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self::numbered(
            rows.into_iter()
                .enumerate()
                .map(|(index, cells)| GridRow {
                    number: index + 1,
                    cells,
                })
                .collect(),
        )
    }

    pub fn numbered(rows: Vec<GridRow>) -> Self {
        Self { rows }
    }

    pub fn from_strings<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(|c| CellValue::from(c.as_ref())).collect())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn header(&self) -> &[CellValue] {
        self.rows.first().map(|row| row.cells.as_slice()).unwrap_or(&[])
    }

    /// Data rows with their source row number.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[CellValue])> {
        self.rows
            .iter()
            .skip(1)
            .map(|row| (row.number, row.cells.as_slice()))
    }

    /// Flattens the data rows into one string, cells joined by commas and rows by newlines.
    pub fn content_text(&self) -> String {
        self.rows
            .iter()
            .skip(1)
            .map(|row| {
                row.cells
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Decodes an uploaded file into a grid, choosing the decoder from the filename.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn read_spreadsheet(filename: &str, bytes: &[u8]) -> Result<SpreadsheetGrid, SpreadsheetError> {
    let grid = match FileKind::from_filename(filename)? {
        FileKind::Csv => read_csv(bytes)?,
        FileKind::Xlsx | FileKind::Xls => read_workbook(bytes)?,
    };

    if grid.is_empty() {
        return Err(SpreadsheetError::Empty);
    }

    debug!(rows = grid.len(), "Decoded spreadsheet");
    Ok(grid)
}

fn read_csv(bytes: &[u8]) -> Result<SpreadsheetGrid, SpreadsheetError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    // The reader skips empty lines; each record keeps the line it started on.
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let number = record
            .position()
            .map_or(rows.len() + 1, |position| position.line() as usize);
        rows.push(GridRow {
            number,
            cells: record.iter().map(CellValue::from).collect(),
        });
    }
    Ok(SpreadsheetGrid::numbered(rows))
}

fn read_workbook(bytes: &[u8]) -> Result<SpreadsheetGrid, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SpreadsheetError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    // The range begins at the first used cell, not at A1.
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let rows = range
        .rows()
        .enumerate()
        .map(|(index, row)| GridRow {
            number: first_row + index + 1,
            cells: row.iter().map(CellValue::from).collect(),
        })
        .collect();
    Ok(SpreadsheetGrid::numbered(rows))
}


#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn classifies_extensions_case_insensitively() {
        assert_eq!(FileKind::from_filename("parts.CSV").unwrap(), FileKind::Csv);
        assert_eq!(FileKind::from_filename("Model3.XlSx").unwrap(), FileKind::Xlsx);
        assert_eq!(FileKind::from_filename("legacy.xls").unwrap(), FileKind::Xls);
        assert_matches!(
            FileKind::from_filename("notes.txt"),
            Err(SpreadsheetError::UnsupportedExtension(ext)) if ext == ".txt"
        );
        assert_matches!(
            FileKind::from_filename("no_extension"),
            Err(SpreadsheetError::UnsupportedExtension(_))
        );
    }

    #[test]
    fn reads_csv_rows_in_order() {
        let csv = "title,sku,price_1pc\nDoor Handle,DH-001,29.99\n,,\n";
        let grid = read_spreadsheet("parts.csv", csv.as_bytes()).unwrap();

        assert_eq!(grid.len(), 3);
        assert_eq!(grid.header()[0], CellValue::Text("title".into()));
        let rows: Vec<_> = grid.data_rows().collect();
        assert_eq!(rows[0].0, 2);
        assert_eq!(rows[0].1[1], CellValue::Text("DH-001".into()));
        assert!(rows[1].1.iter().all(CellValue::is_blank));
    }

    #[test]
    fn csv_byte_order_mark_is_ignored() {
        let csv = "\u{feff}title,sku\nWiper,WP-1\n";
        let grid = read_spreadsheet("bom.csv", csv.as_bytes()).unwrap();
        assert_eq!(grid.header()[0], CellValue::Text("title".into()));
    }

    #[test]
    fn empty_csv_is_rejected() {
        assert_matches!(read_spreadsheet("empty.csv", b""), Err(SpreadsheetError::Empty));
    }

    #[test]
    fn csv_row_numbers_count_blank_lines() {
        let csv = "title,sku,price\n\nDoor Handle,DH-001,29.99\n\nMirror,MR-100,N/A\n";
        let grid = read_spreadsheet("m3.csv", csv.as_bytes()).unwrap();

        assert_eq!(grid.header()[0], CellValue::Text("title".into()));
        let numbers: Vec<usize> = grid.data_rows().map(|(number, _)| number).collect();
        assert_eq!(numbers, vec![3, 5]);
    }

    #[test]
    fn csv_leading_blank_lines_shift_the_header() {
        let csv = "\n\ntitle,sku\nWiper,WP-1\n";
        let grid = read_spreadsheet("parts.csv", csv.as_bytes()).unwrap();

        assert_eq!(grid.header()[1], CellValue::Text("sku".into()));
        let rows: Vec<_> = grid.data_rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 4);
    }

    #[test]
    fn reads_first_sheet_of_a_workbook_with_native_cells() {
        let bytes = fixtures::model_y_workbook().unwrap();
        let grid = read_spreadsheet("model_y_parts.xlsx", &bytes).unwrap();

        assert_eq!(grid.header()[0], CellValue::Text("title".into()));
        assert_eq!(grid.header()[4], CellValue::Text("in_stock".into()));

        let rows: Vec<_> = grid.data_rows().collect();
        let numbers: Vec<usize> = rows.iter().map(|(number, _)| *number).collect();
        assert_eq!(numbers, vec![3, 4, 5]);

        let (_, door_handle) = rows[0];
        assert_eq!(door_handle[0], CellValue::Text("Door Handle".into()));
        assert_eq!(door_handle[2], CellValue::Float(29.99));
        assert_eq!(door_handle[4], CellValue::Bool(true));

        assert!(rows[1].1.iter().all(CellValue::is_blank));

        let (_, tail_light) = rows[2];
        assert_eq!(tail_light[2], CellValue::Float(145.0));
        assert_eq!(tail_light[4], CellValue::Bool(false));
        assert!(!grid.content_text().contains("Prices valid"));
    }

    #[test]
    fn garbage_workbook_fails_to_decode() {
        assert_matches!(
            read_spreadsheet("broken.xlsx", b"definitely not a zip archive"),
            Err(SpreadsheetError::Workbook(_))
        );
    }

    #[test]
    fn content_text_skips_header() {
        let grid = SpreadsheetGrid::from_strings(vec![
            vec!["title", "category"],
            vec!["Mirror", "Model Y - 12 - EXTERIOR"],
        ]);
        assert_eq!(grid.content_text(), "Mirror,Model Y - 12 - EXTERIOR");
    }

    #[test]
    fn native_cells_render_as_text() {
        assert_eq!(CellValue::Float(29.99).to_string(), "29.99");
        assert_eq!(CellValue::Int(12).as_trimmed_text().as_deref(), Some("12"));
        assert_eq!(CellValue::Text("  ".into()).as_trimmed_text(), None);
    }
}
