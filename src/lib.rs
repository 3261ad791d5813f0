/*!
 * # SmartFlow Billing Report Library
 *
 * Turns a clinic's daily billing export into the lab report workbook the
 * QLAB team works from.
 *
 * ## Features
 *
 * - **Normalization**: drops unbilled rows, projects the billing columns onto
 *   numbered line items stamped with the report date
 * - **Turnaround classification**: maps service names onto turnaround labels
 *   ("24hrs", "6 Weeks", "0", ...) with ordered, first-match rule tables
 * - **Package canonicalization**: collapses free-text service names onto a
 *   fixed package catalog
 * - **Pivots**: package × location counts and unique patients per location
 * - **Export**: one four-sheet Excel workbook, or CSV / JSON equivalents
 *
 * ## Quick Start
 *
 * ```no_run
 * use smartflow::prelude::*;
 *
 * # fn main() -> Result<()> {
 * let pipeline = BillingPipelineBuilder::new()
 *     .profile_kind(ProfileKind::Extended)
 *     .build()?;
 *
 * let report = pipeline.process_file("billing.xlsx", "final_output.xlsx", ExportFormat::Xlsx)?;
 * println!("{} line items, {} for QLAB", report.line_items.len(), report.qlab_items.len());
 * # Ok(())
 * # }
 * ```
 *
 * ## Rule Profiles
 *
 * Every classification table lives in a [`rules::RuleProfile`]. Two built-in
 * profiles exist: `legacy`, matching the first deployed package list, and
 * `extended` (the default), which adds BCA, ECG, OPC and vaccination packages
 * to the catalog. The extended additions are placeholders; turnaround rules are
 * shared with `legacy`.
 * A profile can be dumped to TOML, edited, and loaded back:
 *
 * ```no_run
 * # use smartflow::prelude::*;
 * # fn main() -> Result<()> {
 * RuleProfile::extended().save("rules.toml")?;
 * let custom = RuleProfile::from_file("rules.toml")?;
 * let pipeline = BillingPipelineBuilder::new().profile(custom).build()?;
 * # Ok(())
 * # }
 * ```
 *
 * ## Configuration
 *
 * ```no_run
 * # use smartflow::prelude::*;
 * # fn main() -> Result<()> {
 * // defaults, then ~/.config/smartflow/config.toml, then SMARTFLOW_* variables
 * let config = SmartFlowConfig::load()?;
 * let pipeline = BillingPipelineBuilder::from_config(&config)?.build()?;
 * # Ok(())
 * # }
 * ```
 */

// Re-export error types from root
pub use error::{SmartFlowError, Result, ErrorContext, ExportFormat};

// Public modules
pub mod data_types;
pub mod schema;
pub mod reader;
pub mod rules;
pub mod classify;
pub mod canonical;
pub mod normalizer;
pub mod aggregate;
pub mod report;
pub mod analytics;
pub mod export;
pub mod config;
pub mod pipeline;
pub mod error;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```
/// use smartflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::data_types::*;
    pub use crate::schema::{InputSchema, LineItemSchema, PivotSchema};
    pub use crate::reader::{BillingReader, InputKind, RawTable};
    pub use crate::rules::{LocationRule, ProfileKind, Rule, RuleProfile, RuleTable};
    pub use crate::classify::TurnaroundClassifier;
    pub use crate::canonical::{MatchKind, PackageCanonicalizer, PackageMatch};
    pub use crate::normalizer::{NormalizedRecords, RecordNormalizer};
    pub use crate::aggregate::{Aggregator, Pivot, UniquePatientPivot};
    pub use crate::report::{BillingReport, QlabFilter, ReportAssembler, SheetNames, Table};
    pub use crate::analytics::{ReportAnalytics, ReportStatistics};
    pub use crate::export::{ReportExporter, XlsxExporter, CsvExporter, JsonExporter};
    pub use crate::config::{ConfigBuilder, SmartFlowConfig};
    pub use crate::pipeline::{BillingPipeline, BillingPipelineBuilder};
    pub use crate::error::{SmartFlowError, Result};
    pub use crate::ExportFormat;
}

/// Fixed labels and formats
pub mod constants {
    /// Status for a row whose sample has been availed
    pub const STATUS_UNDER_PROCESS: &str = "UNDER PROCESS";

    /// Status for a row with no availed timestamp
    pub const STATUS_SAMPLE_PENDING: &str = "SAMPLE PENDING";

    /// Date format stamped on line items
    pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

    /// Label of the trailing row in the unique-patient pivot
    pub const UNIQUE_PATIENTS_ROW: &str = "Unique Patients";

    pub const DNA_TURNAROUND: &str = "6 Weeks";

    /// Upper-cased substring marking a consultation
    pub const CONSULTATION_MARKER: &str = "CONSULTATION";
    pub const CONSULTATION_TURNAROUND: &str = "0";

    pub const DEFAULT_OUTPUT_FILE: &str = "final_output.xlsx";

    /// Text cells read as missing values, matched exactly
    pub const NA_MARKERS: &[&str] = &[
        "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
        "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
        "n/a", "nan", "null",
    ];
}

/// Common recipes and utility functions
pub mod cookbook {
    use std::path::Path;

    use crate::prelude::*;

    /// Build the default four-sheet workbook from a billing export
    ///
    /// # Example
    /// ```no_run
    /// # use smartflow::cookbook::workbook_from_export;
    /// # fn main() -> smartflow::Result<()> {
    /// let report = workbook_from_export("billing.xlsx", "final_output.xlsx")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn workbook_from_export<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<BillingReport> {
        BillingPipelineBuilder::new()
            .build()?
            .process_file(input, output, ExportFormat::Xlsx)
    }

    /// Turnaround label for a single service name under a built-in profile
    pub fn turnaround_for(kind: ProfileKind, service_name: &str) -> Option<String> {
        let profile = kind.profile();
        TurnaroundClassifier::new(&profile)
            .classify(Some(service_name))
            .map(str::to_string)
    }

    /// Canonical catalog package for a single service name, if any
    pub fn canonical_package(kind: ProfileKind, service_name: &str) -> Option<String> {
        let profile = kind.profile();
        PackageCanonicalizer::new(&profile)
            .canonicalize(Some(service_name))
            .filter(|p| profile.in_catalog(p))
            .map(str::to_string)
    }

    /// Service names that fall through every canonicalization rule
    pub fn uncatalogued<'a>(kind: ProfileKind, service_names: &[&'a str]) -> Vec<&'a str> {
        service_names.iter()
            .copied()
            .filter(|s| canonical_package(kind, s).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::cookbook::*;
    use super::rules::ProfileKind;

    #[test]
    fn test_turnaround_recipe() {
        assert_eq!(turnaround_for(ProfileKind::Legacy, "Smart DNA Test").as_deref(), Some("6 Weeks"));
        assert_eq!(turnaround_for(ProfileKind::Extended, "DNA Test").as_deref(), Some("6 Weeks"));
        assert_eq!(turnaround_for(ProfileKind::Extended, "doctor consultation").as_deref(), Some("0"));
        assert_eq!(turnaround_for(ProfileKind::Extended, "Mystery Drip"), None);
    }

    #[test]
    fn test_canonical_recipe() {
        assert_eq!(
            canonical_package(ProfileKind::Legacy, "Lipid Profile Test (Add On with Wellness)").as_deref(),
            Some("Lipid Profile")
        );
        // BCA is not a legacy catalog package
        assert_eq!(canonical_package(ProfileKind::Legacy, "BCA"), None);
        assert_eq!(canonical_package(ProfileKind::Extended, "BCA").as_deref(), Some("BCA"));
    }

    #[test]
    fn test_uncatalogued() {
        let names = ["Lipid Profile Test", "Mystery Drip"];
        assert_eq!(uncatalogued(ProfileKind::Extended, &names), vec!["Mystery Drip"]);
    }
}
