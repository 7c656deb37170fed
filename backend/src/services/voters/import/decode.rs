//! Turns an uploaded spreadsheet into header-keyed row records.
//!
//! Workbooks (xlsx, xlsm, xlsb, xls, ods) are read with `calamine`, whose format
//! is detected from the content. Files named `*.csv` go through the `csv` crate
//! instead. Only the first sheet of a workbook is read; its first row is the
//! header.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::collections::BTreeMap;
use std::io::Cursor;

/// A single non-blank cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Renders the cell the way a user would type it (`1001`, not `1001.0`).
    pub fn to_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Integer(i) => i.to_string(),
            Cell::Number(f) => f.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }

    /// Reads the cell as a whole number, accepting numeric text such as `"42"`.
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Cell::Integer(i) => Some(*i),
            Cell::Number(f) => whole_number(*f),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
            }
            Cell::Bool(_) => None,
        }
    }
}

fn whole_number(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// One data row of the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based row number in the sheet; the header is row 1.
    pub row_number: usize,
    /// Blank cells are absent.
    pub cells: BTreeMap<String, Cell>,
}

impl SheetRow {
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("not a readable spreadsheet: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("the workbook has no sheets")]
    NoSheets,
    #[error("not a readable CSV file: {0}")]
    Csv(#[from] csv::Error),
}

/// Decodes an upload, choosing the reader from the original file name.
pub fn decode(filename: Option<&str>, bytes: &[u8]) -> Result<Vec<SheetRow>, DecodeError> {
    let is_csv = filename
        .map(|f| f.to_ascii_lowercase().ends_with(".csv"))
        .unwrap_or(false);
    if is_csv {
        decode_csv(bytes)
    } else {
        decode_workbook(bytes)
    }
}

pub fn decode_workbook(bytes: &[u8]) -> Result<Vec<SheetRow>, DecodeError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(DecodeError::NoSheets)?;
    let range = workbook.worksheet_range(&first_sheet)?;
    log::debug!("Decoding sheet '{}' ({:?})", first_sheet, range.get_size());
    Ok(rows_from_range(&range))
}

fn data_to_cell(data: &Data) -> Option<Cell> {
    match data {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| Cell::Text(s.to_string()))
        }
        Data::Int(i) => Some(Cell::Integer(*i)),
        Data::Float(f) => Some(whole_number(*f).map_or(Cell::Number(*f), Cell::Integer)),
        Data::Bool(b) => Some(Cell::Bool(*b)),
        other => Some(Cell::Text(other.to_string())),
    }
}

fn rows_from_range(range: &Range<Data>) -> Vec<SheetRow> {
    // Ranges start at the first used cell, which is not always A1.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows();

    let headers: Vec<Option<String>> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| data_to_cell(cell).map(|c| c.to_text()))
            .collect(),
        None => return Vec::new(),
    };

    rows.enumerate()
        .filter_map(|(offset, row)| {
            let cells: BTreeMap<String, Cell> = headers
                .iter()
                .zip(row.iter())
                .filter_map(|(header, data)| Some((header.clone()?, data_to_cell(data)?)))
                .collect();
            (!cells.is_empty()).then(|| SheetRow {
                // +1 for the header, +1 for 1-based numbering.
                row_number: first_row + offset + 2,
                cells,
            })
        })
        .collect()
}

/// Picks the most frequent of the usual separators in the header line. Ties and
/// single-column headers resolve to a comma.
fn detect_delimiter(header_line: &str) -> u8 {
    [b'|', b'\t', b';', b',']
        .into_iter()
        .max_by_key(|&d| header_line.matches(d as char).count())
        .unwrap_or(b',')
}

pub fn decode_csv(bytes: &[u8]) -> Result<Vec<SheetRow>, DecodeError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    let header_line = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    let delimiter = detect_delimiter(&String::from_utf8_lossy(header_line));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let cells: BTreeMap<String, Cell> = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, value)| !header.is_empty() && !value.is_empty())
            .map(|(header, value)| (header.clone(), Cell::Text(value.to_string())))
            .collect();
        if cells.is_empty() {
            continue;
        }
        let row_number = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        rows.push(SheetRow { row_number, cells });
    }
    Ok(rows)
}
