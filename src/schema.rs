/*!
 * Schema definitions for the billing input and the report sheets
 *
 * The input side lists the columns consumed from the clinic billing export
 * (case-sensitive, exact names). The output side fixes the column order of
 * the line-item sheets and the header cells of the pivot sheets.
 */

use crate::data_types::{CellValue, RawRecord};
use crate::{Result, SmartFlowError};

/// Billing export columns consumed by a run
pub struct InputSchema;

impl InputSchema {
    pub const PACKAGE_PRICE: &'static str = "packageprice";
    pub const PATIENT_NAME: &'static str = "patientname";
    pub const LOCATION_CENTER: &'static str = "locationcenter";
    pub const SERVICE_NAME: &'static str = "servicename";
    pub const BILL_TIME: &'static str = "billtime";
    pub const TRANSACTION_NO: &'static str = "transactionno";
    pub const DISCOUNT_CODE: &'static str = "discountcode";
    pub const NET_AMOUNT: &'static str = "netamt";
    pub const AVAILED_DATE_TIME: &'static str = "availeddatetime";

    /// Required column names, in the order they are checked
    pub fn column_names() -> Vec<&'static str> {
        vec![
            Self::PACKAGE_PRICE,
            Self::PATIENT_NAME,
            Self::LOCATION_CENTER,
            Self::SERVICE_NAME,
            Self::BILL_TIME,
            Self::TRANSACTION_NO,
            Self::DISCOUNT_CODE,
            Self::NET_AMOUNT,
            Self::AVAILED_DATE_TIME,
        ]
    }

    /// Resolve every required column to its position in `headers`.
    ///
    /// Extra columns are ignored. All missing columns are reported together.
    pub fn validate_headers(headers: &[String]) -> Result<ColumnIndex> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = Self::column_names()
            .into_iter()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(SmartFlowError::missing_columns(missing, headers));
        }

        // Every lookup below succeeded in the check above
        let at = |name: &str| position(name).unwrap_or_default();
        Ok(ColumnIndex {
            package_price: at(Self::PACKAGE_PRICE),
            patient_name: at(Self::PATIENT_NAME),
            location_center: at(Self::LOCATION_CENTER),
            service_name: at(Self::SERVICE_NAME),
            bill_time: at(Self::BILL_TIME),
            transaction_no: at(Self::TRANSACTION_NO),
            discount_code: at(Self::DISCOUNT_CODE),
            net_amount: at(Self::NET_AMOUNT),
            availed_date_time: at(Self::AVAILED_DATE_TIME),
        })
    }
}

/// Positions of the consumed columns within an input row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub package_price: usize,
    pub patient_name: usize,
    pub location_center: usize,
    pub service_name: usize,
    pub bill_time: usize,
    pub transaction_no: usize,
    pub discount_code: usize,
    pub net_amount: usize,
    pub availed_date_time: usize,
}

impl ColumnIndex {
    /// Project one input row onto a [`RawRecord`]. Short rows read as empty cells.
    ///
    /// Only the amount columns are coerced to numbers; identifiers and names
    /// keep the text they were read with.
    pub fn extract(&self, source_row: usize, row: &[CellValue]) -> RawRecord {
        let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();
        RawRecord {
            source_row,
            package_price: cell(self.package_price).numeric(),
            patient_name: cell(self.patient_name),
            location_center: cell(self.location_center),
            service_name: cell(self.service_name),
            bill_time: cell(self.bill_time),
            transaction_no: cell(self.transaction_no),
            discount_code: cell(self.discount_code),
            net_amount: cell(self.net_amount).numeric(),
            availed_date_time: cell(self.availed_date_time),
        }
    }
}

/// Column layout of the full and filtered line-item sheets
pub struct LineItemSchema;

impl LineItemSchema {
    pub fn column_names() -> Vec<&'static str> {
        vec![
            "n",
            "date",
            "name",
            "location",
            "package",
            "payment",
            "time",
            "shopify",
            "desc code",
            "price",
            "hrs",
            "under process",
        ]
    }

    pub fn column_count() -> usize {
        12
    }
}

/// Header layout of the pivot sheets
pub struct PivotSchema;

impl PivotSchema {
    /// Header cell above the package index column
    pub const INDEX_HEADER: &'static str = "";

    pub fn column_names() -> Vec<&'static str> {
        let mut columns = vec![Self::INDEX_HEADER];
        columns.extend(crate::data_types::LocationBucket::ALL.iter().map(|b| b.as_str()));
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate_headers_in_any_order() {
        let mut names = InputSchema::column_names();
        names.reverse();
        names.insert(2, "unused");
        let index = InputSchema::validate_headers(&headers(&names)).unwrap();
        assert_eq!(index.availed_date_time, 0);
        assert_eq!(index.package_price, 9);
    }

    #[test]
    fn test_validate_headers_reports_all_missing() {
        let err = InputSchema::validate_headers(&headers(&["patientname", "PackagePrice"])).unwrap_err();
        match err {
            SmartFlowError::Schema { missing, .. } => {
                assert_eq!(missing.len(), 8);
                assert_eq!(missing[0], "packageprice");
                assert!(missing.contains(&"availeddatetime".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_short_row() {
        let index = InputSchema::validate_headers(&headers(&InputSchema::column_names())).unwrap();
        let record = index.extract(1, &[CellValue::Number(500.0), CellValue::from("Jane Doe")]);
        assert_eq!(record.package_price, CellValue::Number(500.0));
        assert_eq!(record.patient_name, CellValue::from("Jane Doe"));
        assert!(record.availed_date_time.is_null());
    }

    #[test]
    fn test_line_item_columns() {
        assert_eq!(LineItemSchema::column_names().len(), LineItemSchema::column_count());
        assert_eq!(PivotSchema::column_names(), vec!["", "CITY WALK", "INDEX", "DKP"]);
    }
}
