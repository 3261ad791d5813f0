/*!
 * Report assembly
 *
 * Applies the QLAB exclusion filter and packages the two pivots and the two
 * line-item tables into one [`BillingReport`]. Exporters consume the report
 * as four named [`Table`]s in fixed sheet order.
 */

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::{AggregationMisses, Pivot, UniquePatientPivot};
use crate::data_types::{renumber, CellValue, LineItem};
use crate::schema::{LineItemSchema, PivotSchema};

/// Rows excluded from the QLAB sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QlabFilter {
    /// Case-insensitive package substrings that exclude a row
    #[serde(default = "default_excluded_packages")]
    pub excluded_packages: Vec<String>,
    /// Turnaround label that excludes a row, compared exactly
    #[serde(default = "default_excluded_turnaround")]
    pub excluded_turnaround: String,
}

fn default_excluded_packages() -> Vec<String> {
    vec!["GUT HEALTH".to_string(), "CONSULTATION".to_string()]
}

fn default_excluded_turnaround() -> String {
    "0".to_string()
}

impl Default for QlabFilter {
    fn default() -> Self {
        Self {
            excluded_packages: default_excluded_packages(),
            excluded_turnaround: default_excluded_turnaround(),
        }
    }
}

impl QlabFilter {
    /// Whether a line item stays in the QLAB sheet
    pub fn retains(&self, item: &LineItem) -> bool {
        if let Some(package) = &item.package {
            let package = package.to_uppercase();
            if self.excluded_packages.iter().any(|m| package.contains(&m.to_uppercase())) {
                return false;
            }
        }
        item.hrs.as_deref() != Some(self.excluded_turnaround.as_str())
    }

    /// Filtered copy of `items`, renumbered 1..N
    pub fn apply(&self, items: &[LineItem]) -> Vec<LineItem> {
        let mut kept: Vec<LineItem> = items.iter().filter(|i| self.retains(i)).cloned().collect();
        renumber(&mut kept);
        kept
    }
}

/// Output sheet names, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub package_pivot: String,
    pub unique_patient_pivot: String,
    pub line_items: String,
    pub qlab_items: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            package_pivot: "DR 1 - QLAB".to_string(),
            unique_patient_pivot: "DR 1 - SS".to_string(),
            line_items: "DR 2".to_string(),
            qlab_items: "DR QLAB".to_string(),
        }
    }
}

impl SheetNames {
    pub fn in_order(&self) -> [&str; 4] {
        [
            self.package_pivot.as_str(),
            self.unique_patient_pivot.as_str(),
            self.line_items.as_str(),
            self.qlab_items.as_str(),
        ]
    }
}

/// A named, fully materialized output table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    fn from_pivot_rows<'a, I>(name: &str, rows: I) -> Self
    where
        I: Iterator<Item = (&'a str, &'a [u64; 3])>,
    {
        Self {
            name: name.to_string(),
            headers: PivotSchema::column_names().into_iter().map(String::from).collect(),
            rows: rows
                .map(|(label, counts)| {
                    std::iter::once(CellValue::from(label))
                        .chain(counts.iter().map(|c| CellValue::Number(*c as f64)))
                        .collect()
                })
                .collect(),
        }
    }

    fn from_line_items(name: &str, items: &[LineItem]) -> Self {
        Self {
            name: name.to_string(),
            headers: LineItemSchema::column_names().into_iter().map(String::from).collect(),
            rows: items.iter().map(LineItem::cells).collect(),
        }
    }
}

/// Everything one run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingReport {
    pub report_date: NaiveDate,
    pub package_pivot: Pivot,
    pub unique_patient_pivot: UniquePatientPivot,
    pub line_items: Vec<LineItem>,
    pub qlab_items: Vec<LineItem>,
    /// Data rows in the input
    pub source_rows: usize,
    /// Items that reached no package pivot cell
    pub misses: AggregationMisses,
}

impl BillingReport {
    /// True when no input row survived the price filter
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    /// The four output tables, in sheet order
    pub fn tables(&self, names: &SheetNames) -> Vec<Table> {
        vec![
            Table::from_pivot_rows(&names.package_pivot, self.package_pivot.rows()),
            Table::from_pivot_rows(&names.unique_patient_pivot, self.unique_patient_pivot.rows()),
            Table::from_line_items(&names.line_items, &self.line_items),
            Table::from_line_items(&names.qlab_items, &self.qlab_items),
        ]
    }
}

/// Composes pivots and line items into a [`BillingReport`]
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    filter: QlabFilter,
}

impl ReportAssembler {
    pub fn new(filter: QlabFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &QlabFilter {
        &self.filter
    }

    pub fn assemble(
        &self,
        report_date: NaiveDate,
        source_rows: usize,
        line_items: Vec<LineItem>,
        package_pivot: Pivot,
        misses: AggregationMisses,
        unique_patient_pivot: UniquePatientPivot,
    ) -> BillingReport {
        let qlab_items = self.filter.apply(&line_items);
        info!(
            line_items = line_items.len(),
            qlab_items = qlab_items.len(),
            "assembled report"
        );

        BillingReport {
            report_date,
            package_pivot,
            unique_patient_pivot,
            line_items,
            qlab_items,
            source_rows,
            misses,
        }
    }
}
