/*!
 * Tabular input reader for billing exports
 *
 * Reads the first worksheet of an Excel/OpenDocument workbook (via calamine)
 * or a CSV file (via the csv crate) into a row-oriented [`RawTable`]. The first
 * row is the header row. No schema checks happen here; see
 * [`crate::schema::InputSchema`].
 */

use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::data_types::{CellValue, RawRecord};
use crate::schema::InputSchema;
use crate::{ErrorContext, Result, SmartFlowError};

/// Input file kinds understood by [`BillingReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Workbook,
    Csv,
}

impl InputKind {
    /// Detect the input kind from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(InputKind::Workbook),
            "csv" => Some(InputKind::Csv),
            _ => None,
        }
    }
}

/// Header row plus data rows, exactly as read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Validate the header row and project every data row onto a [`RawRecord`]
    pub fn records(&self) -> Result<Vec<RawRecord>> {
        let index = InputSchema::validate_headers(&self.headers)?;
        Ok(self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| index.extract(idx + 1, row))
            .collect())
    }
}

/// Reader for billing export files
#[derive(Debug, Clone)]
pub struct BillingReader {
    /// Worksheet to read; the first sheet when `None`
    sheet_name: Option<String>,
    /// Field delimiter for CSV input
    delimiter: u8,
    /// Trim whitespace around header names
    trim_headers: bool,
}

impl Default for BillingReader {
    fn default() -> Self {
        Self::new()
    }
}

impl BillingReader {
    /// Create a reader with default settings
    pub fn new() -> Self {
        Self {
            sheet_name: None,
            delimiter: b',',
            trim_headers: false,
        }
    }

    /// Read a named worksheet instead of the first one
    pub fn with_sheet<S: Into<String>>(mut self, name: S) -> Self {
        self.sheet_name = Some(name.into());
        self
    }

    /// Set the CSV delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Trim header names before matching them against the schema
    pub fn with_trimmed_headers(mut self, trim: bool) -> Self {
        self.trim_headers = trim;
        self
    }

    /// Load a billing export, choosing the parser from the file extension
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<RawTable> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SmartFlowError::file_not_found_with_suggestion(path.to_path_buf()));
        }

        let table = match InputKind::from_path(path) {
            Some(InputKind::Workbook) => self.load_workbook(path)?,
            Some(InputKind::Csv) => self.load_csv(path)?,
            None => return Err(SmartFlowError::unsupported_input(path.to_path_buf())),
        };

        info!(
            path = %path.display(),
            columns = table.headers.len(),
            rows = table.len(),
            "loaded billing export"
        );
        Ok(table)
    }

    /// Load the configured worksheet of an Excel/OpenDocument workbook
    pub fn load_workbook<P: AsRef<Path>>(&self, path: P) -> Result<RawTable> {
        let path = path.as_ref();
        let with_path = |e: calamine::Error| SmartFlowError::Workbook {
            message: e.to_string(),
            path: Some(path.to_path_buf()),
        };

        let mut workbook = open_workbook_auto(path).map_err(with_path)?;

        let range = match &self.sheet_name {
            Some(name) => workbook.worksheet_range(name).map_err(with_path)?,
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| SmartFlowError::NoWorksheet { path: path.to_path_buf() })?
                .map_err(with_path)?,
        };

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header_row) => header_row.iter().map(|c| self.header_name(&c.to_string())).collect(),
            None => Vec::new(),
        };

        let rows: Vec<Vec<CellValue>> = rows
            .map(|row| row.iter().map(cell_from_workbook).collect())
            .collect();

        debug!(sheet = ?self.sheet_name, rows = rows.len(), "read worksheet");
        Ok(RawTable::new(headers, rows))
    }

    /// Load a CSV file
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<RawTable> {
        let path = path.as_ref();
        let file = File::open(path)?;
        self.read_csv_from(file).map_err(|e| match e {
            SmartFlowError::CsvParse { message, line, .. } => SmartFlowError::CsvParse {
                message,
                line,
                context: ErrorContext {
                    file_path: Some(path.to_path_buf()),
                    line_number: line,
                },
            },
            other => other,
        })
    }

    /// Read CSV data from any reader, e.g. an uploaded in-memory buffer
    pub fn read_csv_from<R: Read>(&self, input: R) -> Result<RawTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(input);

        let headers: Vec<String> = reader.headers()?
            .iter()
            .map(|h| self.header_name(h.trim_start_matches('\u{feff}')))
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(CellValue::from_csv_field).collect());
        }

        Ok(RawTable::new(headers, rows))
    }

    fn header_name(&self, raw: &str) -> String {
        if self.trim_headers {
            raw.trim().to_string()
        } else {
            raw.to_string()
        }
    }
}

/// Convert a calamine cell into a [`CellValue`]
fn cell_from_workbook(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::from_text(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => CellValue::DateTime(naive),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
