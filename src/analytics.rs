/*!
 * Run analytics for billing reports
 *
 * Summarizes what a run did with its input: how many rows were dropped by the
 * price filter or the QLAB filter, the status mix, and which descriptions and
 * locations fell through the classification rules. Useful when a new service
 * name shows up and the rule tables need another entry.
 */

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::Aggregator;
use crate::data_types::{LineItem, SampleStatus};
use crate::report::BillingReport;
use crate::rules::RuleProfile;

/// Analytics over one finished report
pub struct ReportAnalytics<'a> {
    report: &'a BillingReport,
    profile: &'a RuleProfile,
}

/// Summary counts for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportStatistics {
    pub source_rows: usize,
    pub dropped_for_price: usize,
    pub line_items: usize,
    pub qlab_items: usize,
    pub excluded_from_qlab: usize,
    pub under_process: usize,
    pub sample_pending: usize,
    pub unclassified_turnaround: usize,
    pub unmatched_packages: usize,
    pub unbucketed_locations: usize,
    pub pivot_total: u64,
}

impl<'a> ReportAnalytics<'a> {
    pub fn new(report: &'a BillingReport, profile: &'a RuleProfile) -> Self {
        Self { report, profile }
    }

    /// Overall counts
    pub fn statistics(&self) -> ReportStatistics {
        let items = &self.report.line_items;
        let under_process = items.iter()
            .filter(|i| i.status == SampleStatus::UnderProcess)
            .count();

        ReportStatistics {
            source_rows: self.report.source_rows,
            dropped_for_price: self.report.source_rows.saturating_sub(items.len()),
            line_items: items.len(),
            qlab_items: self.report.qlab_items.len(),
            excluded_from_qlab: items.len() - self.report.qlab_items.len(),
            under_process,
            sample_pending: items.len() - under_process,
            unclassified_turnaround: items.iter().filter(|i| i.hrs.is_none()).count(),
            unmatched_packages: self.report.misses.unmatched_package,
            unbucketed_locations: self.report.misses.unbucketed_location,
            pivot_total: self.report.package_pivot.total(),
        }
    }

    /// Package descriptions with no turnaround label, most frequent first
    pub fn unclassified_turnaround(&self) -> Vec<(String, usize)> {
        count_descending(
            self.report.line_items.iter()
                .filter(|i| i.hrs.is_none())
                .map(description),
        )
    }

    /// Package descriptions that map to no catalog entry, most frequent first
    pub fn unmatched_packages(&self) -> Vec<(String, usize)> {
        let aggregator = Aggregator::new(self.profile);
        count_descending(
            self.report.line_items.iter()
                .filter(|i| {
                    aggregator.canonicalizer()
                        .canonicalize(i.package.as_deref())
                        .map(|p| !self.profile.in_catalog(p))
                        .unwrap_or(true)
                })
                .map(description),
        )
    }

    /// Locations that match no bucket, most frequent first
    pub fn unbucketed_locations(&self) -> Vec<(String, usize)> {
        let aggregator = Aggregator::new(self.profile);
        count_descending(
            self.report.line_items.iter()
                .filter(|i| aggregator.locations().resolve(i.location.as_deref()).is_none())
                .map(|i| i.location.clone().unwrap_or_else(|| "(not text)".to_string())),
        )
    }

    /// Line item counts per turnaround label, most frequent first
    pub fn turnaround_distribution(&self) -> Vec<(String, usize)> {
        count_descending(
            self.report.line_items.iter()
                .filter_map(|i| i.hrs.clone()),
        )
    }

    /// Print a human-readable summary to stdout
    pub fn print_summary(&self, limit: usize) {
        let stats = self.statistics();

        println!("=== SmartFlow Run Summary ({}) ===", self.report.report_date.format("%d/%m/%Y"));
        println!("Rule profile: {}", self.profile.name);
        println!("Input rows: {}", stats.source_rows);
        println!("Dropped (no package price): {}", stats.dropped_for_price);
        println!("Line items: {}", stats.line_items);
        println!("QLAB line items: {} ({} excluded)", stats.qlab_items, stats.excluded_from_qlab);
        println!("Under process: {}  Sample pending: {}", stats.under_process, stats.sample_pending);
        println!("Counted in package pivot: {}", stats.pivot_total);

        print_section("Turnaround labels", &self.turnaround_distribution(), limit);

        if stats.unclassified_turnaround > 0 {
            print_section("No turnaround rule", &self.unclassified_turnaround(), limit);
        }
        if stats.unmatched_packages > 0 {
            print_section("No canonical package", &self.unmatched_packages(), limit);
        }
        if stats.unbucketed_locations > 0 {
            print_section("No location bucket", &self.unbucketed_locations(), limit);
        }
    }
}

fn description(item: &LineItem) -> String {
    item.package.clone().unwrap_or_else(|| "(not text)".to_string())
}

fn count_descending<I: Iterator<Item = String>>(values: I) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn print_section(title: &str, entries: &[(String, usize)], limit: usize) {
    println!("\n{}:", title);
    for (value, count) in entries.iter().take(limit) {
        println!("  {:>5}  {}", count, value);
    }
    if entries.len() > limit {
        println!("  ... {} more", entries.len() - limit);
    }
}
