/*!
 * Record normalization
 *
 * Turns raw billing rows into report line items: rows with a null or zero
 * package price are dropped, the rest keep their relative order and are
 * numbered 1..N. The turnaround label is classified from the raw service name
 * before the package and location columns are trimmed and upper-cased.
 */

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::classify::TurnaroundClassifier;
use crate::constants::DEFAULT_DATE_FORMAT;
use crate::data_types::{CellValue, LineItem, RawRecord, SampleStatus};
use crate::reader::RawTable;
use crate::Result;

/// Outcome of normalizing one input table
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecords {
    pub items: Vec<LineItem>,
    /// Data rows in the input
    pub source_rows: usize,
    /// Rows dropped for a null or zero package price
    pub dropped_rows: usize,
}

/// Projects raw billing rows onto [`LineItem`]s
#[derive(Debug, Clone)]
pub struct RecordNormalizer<'a> {
    classifier: TurnaroundClassifier<'a>,
    /// Pre-formatted report date stamped on every row
    date: String,
}

impl<'a> RecordNormalizer<'a> {
    /// Create a normalizer stamping `report_date` with the default `%d/%m/%Y` format
    pub fn new(classifier: TurnaroundClassifier<'a>, report_date: NaiveDate) -> Self {
        Self::with_date_format(classifier, report_date, DEFAULT_DATE_FORMAT)
    }

    pub fn with_date_format(classifier: TurnaroundClassifier<'a>, report_date: NaiveDate, format: &str) -> Self {
        Self {
            classifier,
            date: report_date.format(format).to_string(),
        }
    }

    /// The date string written on every line item
    pub fn date_label(&self) -> &str {
        &self.date
    }

    /// Validate the table's columns and normalize every row.
    ///
    /// Fails with a schema error naming all missing columns before any row is
    /// processed.
    pub fn normalize_table(&self, table: &RawTable) -> Result<NormalizedRecords> {
        let records = table.records()?;
        Ok(self.normalize(&records))
    }

    /// Normalize already-projected records
    pub fn normalize(&self, records: &[RawRecord]) -> NormalizedRecords {
        let items: Vec<LineItem> = records
            .iter()
            .filter(|r| r.has_billable_price())
            .enumerate()
            .map(|(idx, record)| self.line_item(idx + 1, record))
            .collect();

        let dropped_rows = records.len() - items.len();
        info!(
            rows = records.len(),
            kept = items.len(),
            dropped = dropped_rows,
            "normalized billing rows"
        );

        NormalizedRecords {
            items,
            source_rows: records.len(),
            dropped_rows,
        }
    }

    fn line_item(&self, n: usize, record: &RawRecord) -> LineItem {
        let service_name = record.service_name.as_text();
        let hrs = self.classifier.classify(service_name).map(str::to_string);
        if hrs.is_none() {
            debug!(row = record.source_row, "no turnaround classification");
        }

        LineItem {
            n,
            date: self.date.clone(),
            name: record.patient_name.clone(),
            location: clean_text(&record.location_center),
            package: clean_text(&record.service_name),
            payment: String::new(),
            time: record.bill_time.clone(),
            shopify: record.transaction_no.clone(),
            desc_code: record.discount_code.clone(),
            price: record.net_amount.clone(),
            hrs,
            status: SampleStatus::from_availed(&record.availed_date_time),
        }
    }
}

/// Trimmed, upper-cased text; non-text cells become `None`
fn clean_text(cell: &CellValue) -> Option<String> {
    cell.as_text().map(|s| s.trim().to_uppercase())
}
