/*!
 * End-to-end billing pipeline
 *
 * Provides a builder for configuring a run and a pipeline that goes from a
 * billing export to a finished, exported report.
 */

use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::aggregate::Aggregator;
use crate::classify::TurnaroundClassifier;
use crate::config::SmartFlowConfig;
use crate::constants::DEFAULT_DATE_FORMAT;
use crate::export::exporter_for;
use crate::normalizer::RecordNormalizer;
use crate::reader::{BillingReader, RawTable};
use crate::report::{BillingReport, QlabFilter, ReportAssembler, SheetNames};
use crate::rules::{ProfileKind, RuleProfile};
use crate::{ExportFormat, Result, SmartFlowError};

/// Builder for a [`BillingPipeline`]
///
/// # Example
/// ```no_run
/// # use smartflow::pipeline::BillingPipelineBuilder;
/// # use smartflow::rules::ProfileKind;
/// let pipeline = BillingPipelineBuilder::new()
///     .profile_kind(ProfileKind::Legacy)
///     .date_format("%Y-%m-%d")
///     .build()?;
/// # Ok::<(), smartflow::SmartFlowError>(())
/// ```
pub struct BillingPipelineBuilder {
    profile: Option<RuleProfile>,
    report_date: Option<NaiveDate>,
    date_format: String,
    qlab_filter: QlabFilter,
    sheet_names: SheetNames,
    input_sheet: Option<String>,
}

impl Default for BillingPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BillingPipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            profile: None,
            report_date: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            qlab_filter: QlabFilter::default(),
            sheet_names: SheetNames::default(),
            input_sheet: None,
        }
    }

    /// Start from a loaded configuration; resolves its rule profile
    pub fn from_config(config: &SmartFlowConfig) -> Result<Self> {
        Ok(Self::new()
            .profile(config.resolve_profile()?)
            .date_format(config.date_format.clone())
            .qlab_filter(config.qlab_filter.clone())
            .sheet_names(config.sheet_names.clone()))
    }

    /// Use a specific rule profile
    pub fn profile(mut self, profile: RuleProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Use a built-in rule profile
    pub fn profile_kind(self, kind: ProfileKind) -> Self {
        self.profile(kind.profile())
    }

    /// Date stamped on every line item; defaults to today
    pub fn report_date(mut self, date: NaiveDate) -> Self {
        self.report_date = Some(date);
        self
    }

    pub fn date_format<S: Into<String>>(mut self, format: S) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn qlab_filter(mut self, filter: QlabFilter) -> Self {
        self.qlab_filter = filter;
        self
    }

    pub fn sheet_names(mut self, names: SheetNames) -> Self {
        self.sheet_names = names;
        self
    }

    /// Read this worksheet instead of the first one
    pub fn input_sheet<S: Into<String>>(mut self, name: S) -> Self {
        self.input_sheet = Some(name.into());
        self
    }

    /// Validate the settings and build the pipeline
    pub fn build(self) -> Result<BillingPipeline> {
        let profile = self.profile.unwrap_or_default();
        profile.validate()?;
        debug!(
            profile = %profile.name,
            off_catalog = ?profile.off_catalog_values(),
            "rule profile ready"
        );

        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(SmartFlowError::Configuration {
                message: format!("Invalid date format '{}'", self.date_format),
                suggestion: Some("Use chrono strftime syntax, e.g. %d/%m/%Y".to_string()),
            });
        }

        let mut reader = BillingReader::new();
        if let Some(sheet) = self.input_sheet {
            reader = reader.with_sheet(sheet);
        }

        Ok(BillingPipeline {
            profile,
            report_date: self.report_date.unwrap_or_else(|| chrono::Local::now().date_naive()),
            date_format: self.date_format,
            assembler: ReportAssembler::new(self.qlab_filter),
            sheet_names: self.sheet_names,
            reader,
        })
    }
}

/// A configured run: reader, rule profile, report date and output layout
pub struct BillingPipeline {
    profile: RuleProfile,
    report_date: NaiveDate,
    date_format: String,
    assembler: ReportAssembler,
    sheet_names: SheetNames,
    reader: BillingReader,
}

impl BillingPipeline {
    pub fn profile(&self) -> &RuleProfile {
        &self.profile
    }

    pub fn report_date(&self) -> NaiveDate {
        self.report_date
    }

    pub fn sheet_names(&self) -> &SheetNames {
        &self.sheet_names
    }

    /// Build the report from an in-memory table
    pub fn run_table(&self, table: &RawTable) -> Result<BillingReport> {
        let classifier = TurnaroundClassifier::new(&self.profile);
        let normalizer = RecordNormalizer::with_date_format(classifier, self.report_date, &self.date_format);
        let normalized = normalizer.normalize_table(table)?;

        if normalized.items.is_empty() {
            warn!(
                source_rows = normalized.source_rows,
                "no billable rows; the report will contain empty tables"
            );
        }

        let aggregator = Aggregator::new(&self.profile);
        let (package_pivot, misses) = aggregator.package_pivot_with_misses(&normalized.items);
        let unique_patient_pivot = aggregator.unique_patient_pivot(&normalized.items);

        if misses.unmatched_package > 0 || misses.unbucketed_location > 0 {
            warn!(
                unmatched_package = misses.unmatched_package,
                unbucketed_location = misses.unbucketed_location,
                "line items left out of the package pivot"
            );
        }

        Ok(self.assembler.assemble(
            self.report_date,
            normalized.source_rows,
            normalized.items,
            package_pivot,
            misses,
            unique_patient_pivot,
        ))
    }

    /// Load a billing export and build the report
    pub fn run_file<P: AsRef<Path>>(&self, input: P) -> Result<BillingReport> {
        let table = self.reader.load(input)?;
        self.run_table(&table)
    }

    /// Write a report in the given format; returns the files written
    pub fn export<P: AsRef<Path>>(&self, report: &BillingReport, output: P, format: ExportFormat) -> Result<Vec<PathBuf>> {
        exporter_for(format, self.sheet_names.clone()).export(report, output.as_ref())
    }

    /// Load, build and export in one step
    pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        format: ExportFormat,
    ) -> Result<BillingReport> {
        let report = self.run_file(input)?;
        let written = self.export(&report, output, format)?;
        info!(files = written.len(), %format, "report exported");
        Ok(report)
    }
}
