/*!
 * Data type definitions for billing records and report line items
 *
 * Raw spreadsheet rows arrive as loosely typed [`CellValue`]s. The normalizer
 * projects them into [`LineItem`]s, which is the shape every output sheet is
 * built from.
 */

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize, Serializer};

use crate::constants::{NA_MARKERS, STATUS_SAMPLE_PENDING, STATUS_UNDER_PROCESS};

/// A single spreadsheet cell as read from the input file
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Build a text cell. Blank text and the [`NA_MARKERS`] read as empty.
    pub fn from_text<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        if text.trim().is_empty() || NA_MARKERS.contains(&text.as_str()) {
            CellValue::Empty
        } else {
            CellValue::Text(text)
        }
    }

    /// Build a cell from a raw CSV field.
    ///
    /// Fields stay text so identifiers keep leading zeros and every digit;
    /// amount columns are coerced later with [`CellValue::numeric`].
    pub fn from_csv_field(field: &str) -> Self {
        Self::from_text(field)
    }

    /// Coerce text holding a finite number into a number cell
    pub fn numeric(self) -> Self {
        let parsed = match &self {
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        };
        parsed.map(CellValue::Number).unwrap_or(self)
    }

    /// Whether the cell holds no value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric view of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Borrow the text if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell as text; empty cells become `None`
    pub fn to_key(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<Option<String>> for CellValue {
    fn from(s: Option<String>) -> Self {
        s.map(CellValue::Text).unwrap_or_default()
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::DateTime(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

/// One row of the input billing export, restricted to the consumed columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    /// 1-based data row in the source sheet (header excluded)
    pub source_row: usize,
    pub package_price: CellValue,
    pub patient_name: CellValue,
    pub location_center: CellValue,
    pub service_name: CellValue,
    pub bill_time: CellValue,
    pub transaction_no: CellValue,
    pub discount_code: CellValue,
    pub net_amount: CellValue,
    pub availed_date_time: CellValue,
}

impl RawRecord {
    /// Rows with a null or zero package price never reach the report
    pub fn has_billable_price(&self) -> bool {
        match &self.package_price {
            CellValue::Empty => false,
            CellValue::Number(n) => *n != 0.0 && !n.is_nan(),
            CellValue::Bool(b) => *b,
            _ => true,
        }
    }
}

/// Sample processing status of a line item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleStatus {
    #[serde(rename = "UNDER PROCESS")]
    UnderProcess,
    #[serde(rename = "SAMPLE PENDING")]
    SamplePending,
}

impl SampleStatus {
    /// Status is decided by the availed date/time being present
    pub fn from_availed(availed: &CellValue) -> Self {
        if availed.is_null() {
            SampleStatus::SamplePending
        } else {
            SampleStatus::UnderProcess
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SampleStatus::UnderProcess => STATUS_UNDER_PROCESS,
            SampleStatus::SamplePending => STATUS_SAMPLE_PENDING,
        }
    }
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service center a location is aggregated under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LocationBucket {
    #[serde(rename = "CITY WALK")]
    CityWalk,
    #[serde(rename = "INDEX")]
    Index,
    #[serde(rename = "DKP")]
    Dkp,
}

impl LocationBucket {
    /// All buckets in pivot column order
    pub const ALL: [LocationBucket; 3] = [
        LocationBucket::CityWalk,
        LocationBucket::Index,
        LocationBucket::Dkp,
    ];

    /// Column position of this bucket in a pivot
    pub fn index(&self) -> usize {
        match self {
            LocationBucket::CityWalk => 0,
            LocationBucket::Index => 1,
            LocationBucket::Dkp => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationBucket::CityWalk => "CITY WALK",
            LocationBucket::Index => "INDEX",
            LocationBucket::Dkp => "DKP",
        }
    }
}

impl fmt::Display for LocationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized report line, one per billable input row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    /// Dense 1-based sequence number
    pub n: usize,
    /// Report generation date, identical on every row of a run
    pub date: String,
    pub name: CellValue,
    /// Trimmed, upper-cased location; `None` when the source cell was not text
    pub location: Option<String>,
    /// Trimmed, upper-cased service name; `None` when the source cell was not text
    pub package: Option<String>,
    pub payment: String,
    pub time: CellValue,
    pub shopify: CellValue,
    pub desc_code: CellValue,
    pub price: CellValue,
    /// Turnaround label, absent when no rule matched
    pub hrs: Option<String>,
    pub status: SampleStatus,
}

impl LineItem {
    /// Cells in output column order
    pub fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Number(self.n as f64),
            CellValue::Text(self.date.clone()),
            self.name.clone(),
            self.location.clone().into(),
            self.package.clone().into(),
            CellValue::Text(self.payment.clone()),
            self.time.clone(),
            self.shopify.clone(),
            self.desc_code.clone(),
            self.price.clone(),
            self.hrs.clone().into(),
            CellValue::Text(self.status.as_str().to_string()),
        ]
    }

    /// Key used when counting distinct patients; blank names have none
    pub fn patient_key(&self) -> Option<String> {
        self.name.to_key()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

/// Re-assign sequence numbers 1..N in current order
pub fn renumber(items: &mut [LineItem]) {
    for (idx, item) in items.iter_mut().enumerate() {
        item.n = idx + 1;
    }
}
