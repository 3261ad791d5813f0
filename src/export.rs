/*!
 * Export functionality for billing reports
 *
 * Every exporter writes the same four tables in sheet order: package pivot,
 * unique-patient pivot, full line items, QLAB line items. Output is rendered
 * completely in memory before anything touches the filesystem, so a failed
 * export never leaves a partial artifact behind.
 */

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use tracing::info;

use crate::data_types::CellValue;
use crate::report::{BillingReport, SheetNames, Table};
use crate::{ExportFormat, Result, SmartFlowError};

/// Trait for implementing report exporters
pub trait ReportExporter {
    /// Export the report; returns the files written
    fn export(&self, report: &BillingReport, path: &Path) -> Result<Vec<PathBuf>>;

    /// Get the export format
    fn format(&self) -> ExportFormat;
}

/// Build the exporter for a format
pub fn exporter_for(format: ExportFormat, sheet_names: SheetNames) -> Box<dyn ReportExporter> {
    match format {
        ExportFormat::Xlsx => Box::new(XlsxExporter::new(sheet_names)),
        ExportFormat::Csv => Box::new(CsvExporter::new(sheet_names)),
        ExportFormat::Json => Box::new(JsonExporter::new(sheet_names)),
    }
}

/// Multi-sheet Excel workbook exporter
pub struct XlsxExporter {
    pub sheet_names: SheetNames,
    /// Bold header row
    pub bold_headers: bool,
    /// Freeze the header row on line-item sheets
    pub freeze_headers: bool,
}

impl Default for XlsxExporter {
    fn default() -> Self {
        Self::new(SheetNames::default())
    }
}

impl XlsxExporter {
    pub fn new(sheet_names: SheetNames) -> Self {
        Self {
            sheet_names,
            bold_headers: true,
            freeze_headers: true,
        }
    }

    pub fn with_bold_headers(mut self, bold: bool) -> Self {
        self.bold_headers = bold;
        self
    }

    pub fn with_frozen_headers(mut self, freeze: bool) -> Self {
        self.freeze_headers = freeze;
        self
    }

    /// Render the workbook into a byte buffer
    pub fn to_buffer(&self, report: &BillingReport) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header_format = if self.bold_headers {
            Format::new().set_bold()
        } else {
            Format::new()
        };
        let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

        let tables = report.tables(&self.sheet_names);
        for (idx, table) in tables.iter().enumerate() {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(table.name.as_str())?;
            write_table(worksheet, table, &header_format, &datetime_format)?;

            // sheets 3 and 4 are the line-item tables
            if self.freeze_headers && idx >= 2 {
                worksheet.set_freeze_panes(1, 0)?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

impl ReportExporter for XlsxExporter {
    fn export(&self, report: &BillingReport, path: &Path) -> Result<Vec<PathBuf>> {
        let buffer = self.to_buffer(report)?;
        std::fs::write(path, buffer)?;
        info!(path = %path.display(), "wrote workbook");
        Ok(vec![path.to_path_buf()])
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }
}

fn write_table(
    worksheet: &mut Worksheet,
    table: &Table,
    header_format: &Format,
    datetime_format: &Format,
) -> Result<()> {
    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header.as_str(), header_format)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let excel_col = c as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(excel_row, excel_col, s.as_str())?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(excel_row, excel_col, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(excel_row, excel_col, *b)?;
                }
                CellValue::DateTime(dt) => {
                    worksheet.write_datetime_with_format(excel_row, excel_col, dt, datetime_format)?;
                }
            }
        }
    }

    Ok(())
}

/// CSV exporter, one file per sheet
///
/// `report.csv` becomes `report_DR_1_-_QLAB.csv`, `report_DR_1_-_SS.csv`, ...
pub struct CsvExporter {
    pub sheet_names: SheetNames,
    /// Field delimiter
    pub delimiter: u8,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new(SheetNames::default())
    }
}

impl CsvExporter {
    pub fn new(sheet_names: SheetNames) -> Self {
        Self {
            sheet_names,
            delimiter: b',',
        }
    }

    /// Set the delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Render one table as CSV bytes
    pub fn render_table(&self, table: &Table) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row.iter().map(|c| c.to_string()))?;
        }

        writer.into_inner()
            .map_err(|e| SmartFlowError::export(ExportFormat::Csv, e.to_string()))
    }
}

impl ReportExporter for CsvExporter {
    fn export(&self, report: &BillingReport, path: &Path) -> Result<Vec<PathBuf>> {
        let dir = path.parent().unwrap_or(Path::new("."));
        let base_name = path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("final_output");

        let mut rendered = Vec::new();
        for table in report.tables(&self.sheet_names) {
            let file = dir.join(format!("{}_{}.csv", base_name, sheet_slug(&table.name)));
            rendered.push((file, self.render_table(&table)?));
        }

        let mut written = Vec::with_capacity(rendered.len());
        for (file, bytes) in rendered {
            std::fs::write(&file, bytes)?;
            written.push(file);
        }

        info!(dir = %dir.display(), files = written.len(), "wrote CSV sheets");
        Ok(written)
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }
}

fn sheet_slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// JSON exporter: one document holding all four tables
pub struct JsonExporter {
    pub sheet_names: SheetNames,
    /// Whether to pretty-print the JSON
    pub pretty_print: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self::new(SheetNames::default())
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    report_date: String,
    sheets: &'a [Table],
}

impl JsonExporter {
    pub fn new(sheet_names: SheetNames) -> Self {
        Self {
            sheet_names,
            pretty_print: true,
        }
    }

    /// Set pretty printing
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    pub fn to_buffer(&self, report: &BillingReport) -> Result<Vec<u8>> {
        let tables = report.tables(&self.sheet_names);
        let doc = JsonDocument {
            report_date: report.report_date.format("%Y-%m-%d").to_string(),
            sheets: &tables,
        };
        let bytes = if self.pretty_print {
            serde_json::to_vec_pretty(&doc)?
        } else {
            serde_json::to_vec(&doc)?
        };
        Ok(bytes)
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &BillingReport, path: &Path) -> Result<Vec<PathBuf>> {
        let buffer = self.to_buffer(report)?;
        std::fs::write(path, buffer)?;
        Ok(vec![path.to_path_buf()])
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregationMisses, Pivot, UniquePatientPivot};
    use crate::data_types::{LineItem, SampleStatus};
    use crate::report::ReportAssembler;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn report() -> BillingReport {
        let catalog = vec!["Lipid Profile".to_string()];
        let mut pivot = Pivot::zeroed(&catalog);
        pivot.increment("Lipid Profile", crate::data_types::LocationBucket::CityWalk);
        let item = LineItem {
            n: 1,
            date: "01/05/2024".to_string(),
            name: CellValue::from("Jane Doe"),
            location: Some("CITY WALK CLINIC".to_string()),
            package: Some("LIPID PROFILE TEST (ADD ON WITH WELLNESS)".to_string()),
            payment: String::new(),
            time: CellValue::from("10:00"),
            shopify: CellValue::from("TX1"),
            desc_code: CellValue::Empty,
            price: CellValue::Number(500.0),
            hrs: Some("24hrs".to_string()),
            status: SampleStatus::SamplePending,
        };
        ReportAssembler::default().assemble(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            1,
            vec![item],
            pivot.clone(),
            AggregationMisses::default(),
            UniquePatientPivot { packages: pivot, unique_patients: [1, 0, 0] },
        )
    }

    #[test]
    fn test_xlsx_buffer_is_zip() {
        let bytes = XlsxExporter::default().to_buffer(&report()).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_xlsx_rejects_bad_sheet_name() {
        let names = SheetNames {
            package_pivot: "a name that is far longer than thirty one characters".to_string(),
            ..Default::default()
        };
        let err = XlsxExporter::new(names).to_buffer(&report()).unwrap_err();
        assert!(matches!(err, SmartFlowError::Export { format: ExportFormat::Xlsx, .. }));
    }

    #[test]
    fn test_csv_export_writes_one_file_per_sheet() {
        let dir = TempDir::new().unwrap();
        let files = CsvExporter::default()
            .export(&report(), &dir.path().join("final_output.csv"))
            .unwrap();
        assert_eq!(files.len(), 4);
        assert!(files[0].ends_with("final_output_DR_1_-_QLAB.csv"));
        let line_items = std::fs::read_to_string(&files[2]).unwrap();
        let mut lines = line_items.lines();
        assert_eq!(lines.next(), Some("n,date,name,location,package,payment,time,shopify,desc code,price,hrs,under process"));
        assert_eq!(
            lines.next(),
            Some("1,01/05/2024,Jane Doe,CITY WALK CLINIC,LIPID PROFILE TEST (ADD ON WITH WELLNESS),,10:00,TX1,,500,24hrs,SAMPLE PENDING")
        );
    }

    #[test]
    fn test_json_export() {
        let bytes = JsonExporter::default().with_pretty_print(false).to_buffer(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["report_date"], "2024-05-01");
        assert_eq!(value["sheets"].as_array().unwrap().len(), 4);
        assert_eq!(value["sheets"][0]["name"], "DR 1 - QLAB");
        assert_eq!(value["sheets"][0]["rows"][0][1], 1.0);
        assert_eq!(value["sheets"][1]["rows"][1][0], "Unique Patients");
    }

    #[test]
    fn test_exporter_for_format() {
        assert_eq!(exporter_for(ExportFormat::Csv, SheetNames::default()).format(), ExportFormat::Csv);
        assert_eq!(exporter_for(ExportFormat::Xlsx, SheetNames::default()).format(), ExportFormat::Xlsx);
    }
}
