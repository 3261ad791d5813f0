/*!
 * Cross-tabulations of line items by canonical package and location bucket
 *
 * Both pivots are fully materialized over catalog x bucket, so packages with
 * no sales show as zero rows. Items whose package does not canonicalize to a
 * catalog entry, or whose location matches no bucket, are left out of the
 * package rows without error.
 */

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::canonical::PackageCanonicalizer;
use crate::constants::UNIQUE_PATIENTS_ROW;
use crate::data_types::{LineItem, LocationBucket};
use crate::rules::{LocationRule, RuleProfile};

const BUCKETS: usize = LocationBucket::ALL.len();

/// Assigns free-text locations to buckets by alias containment
#[derive(Debug, Clone)]
pub struct LocationResolver {
    /// (bucket, upper-cased aliases) in evaluation order
    rules: Vec<(LocationBucket, Vec<String>)>,
}

impl LocationResolver {
    pub fn new(rules: &[LocationRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| (r.bucket, r.aliases.iter().map(|a| a.to_uppercase()).collect()))
                .collect(),
        }
    }

    /// First bucket with an alias contained in the location
    pub fn resolve(&self, location: Option<&str>) -> Option<LocationBucket> {
        let location = location?.trim().to_uppercase();
        self.rules
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| location.contains(a.as_str())))
            .map(|(bucket, _)| *bucket)
    }
}

/// Count table indexed by row label x location bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pivot {
    rows: Vec<String>,
    counts: Vec<[u64; BUCKETS]>,
}

impl Pivot {
    /// Zero-filled pivot with the given row labels
    pub fn zeroed(rows: &[String]) -> Self {
        Self {
            rows: rows.to_vec(),
            counts: vec![[0; BUCKETS]; rows.len()],
        }
    }

    /// Add one to a cell; returns false when `row` is not a row label
    pub fn increment(&mut self, row: &str, bucket: LocationBucket) -> bool {
        match self.rows.iter().position(|r| r == row) {
            Some(idx) => {
                self.counts[idx][bucket.index()] += 1;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, row: &str, bucket: LocationBucket) -> Option<u64> {
        self.rows
            .iter()
            .position(|r| r == row)
            .map(|idx| self.counts[idx][bucket.index()])
    }

    pub fn row_labels(&self) -> &[String] {
        &self.rows
    }

    /// Rows with their counts in bucket column order
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[u64; BUCKETS])> {
        self.rows.iter().map(String::as_str).zip(self.counts.iter())
    }

    /// Sum over a bucket column
    pub fn column_total(&self, bucket: LocationBucket) -> u64 {
        self.counts.iter().map(|c| c[bucket.index()]).sum()
    }

    /// Sum over every cell
    pub fn total(&self) -> u64 {
        self.counts.iter().flat_map(|c| c.iter()).sum()
    }
}

/// Package pivot plus the trailing distinct-patient row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniquePatientPivot {
    pub packages: Pivot,
    /// Distinct patient names per bucket, over all line items
    pub unique_patients: [u64; BUCKETS],
}

impl UniquePatientPivot {
    pub fn unique_patients_at(&self, bucket: LocationBucket) -> u64 {
        self.unique_patients[bucket.index()]
    }

    /// Rows including the trailing unique-patients row
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[u64; BUCKETS])> {
        self.packages
            .rows()
            .chain(std::iter::once((UNIQUE_PATIENTS_ROW, &self.unique_patients)))
    }
}

/// Counts of items left out of the package pivot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregationMisses {
    /// Package did not canonicalize to a catalog entry
    pub unmatched_package: usize,
    /// Location matched no bucket
    pub unbucketed_location: usize,
}

/// Builds both pivots from one profile's catalog, rules and aliases
#[derive(Debug, Clone)]
pub struct Aggregator<'a> {
    catalog: &'a [String],
    canonicalizer: PackageCanonicalizer<'a>,
    locations: LocationResolver,
}

impl<'a> Aggregator<'a> {
    pub fn new(profile: &'a RuleProfile) -> Self {
        Self {
            catalog: &profile.catalog,
            canonicalizer: PackageCanonicalizer::new(profile),
            locations: LocationResolver::new(&profile.locations),
        }
    }

    pub fn canonicalizer(&self) -> &PackageCanonicalizer<'a> {
        &self.canonicalizer
    }

    pub fn locations(&self) -> &LocationResolver {
        &self.locations
    }

    /// Canonical catalog package and bucket for an item, if both resolve
    pub fn cell_for(&self, item: &LineItem) -> Option<(&'a str, LocationBucket)> {
        let package = self.canonicalizer
            .canonicalize(item.package.as_deref())
            .filter(|p| self.catalog.iter().any(|c| c == p))?;
        let bucket = self.locations.resolve(item.location.as_deref())?;
        Some((package, bucket))
    }

    /// Count of line items per canonical package and bucket
    pub fn package_pivot(&self, items: &[LineItem]) -> Pivot {
        self.package_pivot_with_misses(items).0
    }

    /// Package pivot plus the tally of items that reached no cell
    pub fn package_pivot_with_misses(&self, items: &[LineItem]) -> (Pivot, AggregationMisses) {
        let mut pivot = Pivot::zeroed(self.catalog);
        let mut misses = AggregationMisses::default();

        for item in items {
            let package = self.canonicalizer
                .canonicalize(item.package.as_deref())
                .filter(|p| self.catalog.iter().any(|c| c == p));
            let bucket = self.locations.resolve(item.location.as_deref());

            match (package, bucket) {
                (Some(package), Some(bucket)) => {
                    pivot.increment(package, bucket);
                }
                (package, bucket) => {
                    if package.is_none() {
                        misses.unmatched_package += 1;
                    }
                    if bucket.is_none() {
                        misses.unbucketed_location += 1;
                    }
                }
            }
        }

        info!(
            items = items.len(),
            counted = pivot.total(),
            unmatched_package = misses.unmatched_package,
            unbucketed_location = misses.unbucketed_location,
            "built package pivot"
        );
        (pivot, misses)
    }

    /// Package pivot plus distinct patient names per bucket.
    ///
    /// The unique-patients row is computed over every item whose location
    /// buckets, whether or not its package canonicalizes.
    pub fn unique_patient_pivot(&self, items: &[LineItem]) -> UniquePatientPivot {
        let packages = self.package_pivot(items);

        let mut seen: [HashSet<String>; BUCKETS] = Default::default();
        for item in items {
            let (Some(bucket), Some(patient)) = (self.locations.resolve(item.location.as_deref()), item.patient_key()) else {
                continue;
            };
            seen[bucket.index()].insert(patient);
        }

        let unique_patients = seen.map(|names| names.len() as u64);
        debug!(?unique_patients, "counted unique patients");

        UniquePatientPivot { packages, unique_patients }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{CellValue, SampleStatus};

    fn item(name: &str, location: &str, package: &str) -> LineItem {
        LineItem {
            n: 1,
            date: "01/05/2024".to_string(),
            name: CellValue::from(name),
            location: Some(location.trim().to_uppercase()),
            package: Some(package.trim().to_uppercase()),
            payment: String::new(),
            time: CellValue::Empty,
            shopify: CellValue::Empty,
            desc_code: CellValue::Empty,
            price: CellValue::Number(100.0),
            hrs: None,
            status: SampleStatus::SamplePending,
        }
    }

    #[test]
    fn test_location_resolution() {
        let profile = RuleProfile::legacy();
        let resolver = LocationResolver::new(&profile.locations);
        assert_eq!(resolver.resolve(Some("City Walk Clinic")), Some(LocationBucket::CityWalk));
        assert_eq!(resolver.resolve(Some("DUBAI KNOWLEDGE PARK")), Some(LocationBucket::Dkp));
        assert_eq!(resolver.resolve(Some("dkp branch")), Some(LocationBucket::Dkp));
        assert_eq!(resolver.resolve(Some("Index Tower L2")), Some(LocationBucket::Index));
        assert_eq!(resolver.resolve(Some("Marina")), None);
        assert_eq!(resolver.resolve(None), None);
        // first matching bucket wins
        assert_eq!(resolver.resolve(Some("CITY WALK / INDEX")), Some(LocationBucket::CityWalk));
    }

    #[test]
    fn test_pivot_is_fully_materialized() {
        let profile = RuleProfile::legacy();
        let pivot = Aggregator::new(&profile).package_pivot(&[]);
        assert_eq!(pivot.row_labels().len(), profile.catalog.len());
        assert_eq!(pivot.total(), 0);
        for package in &profile.catalog {
            for bucket in LocationBucket::ALL {
                assert_eq!(pivot.get(package, bucket), Some(0));
            }
        }
    }

    #[test]
    fn test_lipid_profile_cell() {
        let profile = RuleProfile::extended();
        let pivot = Aggregator::new(&profile)
            .package_pivot(&[item("Jane Doe", "City Walk Clinic", "Lipid Profile Test (Add On with Wellness)")]);
        assert_eq!(pivot.get("Lipid Profile", LocationBucket::CityWalk), Some(1));
        assert_eq!(pivot.total(), 1);
    }

    #[test]
    fn test_conservation() {
        let profile = RuleProfile::legacy();
        let aggregator = Aggregator::new(&profile);
        let items = vec![
            item("A", "City Walk", "Wellness Package - Standard"),
            item("B", "DKP", "Food Allergy Test (Add On)"),
            item("C", "Marina", "Food Allergy Test (Add On)"),
            item("D", "Index", "Mystery Drip"),
            item("E", "Index", "ECG and Doctor Consult (Stand Alone)"),
            item("F", "Index Tower", "Mag & Zinc"),
        ];
        let (pivot, misses) = aggregator.package_pivot_with_misses(&items);
        let expected = items.iter().filter(|i| aggregator.cell_for(i).is_some()).count() as u64;
        assert_eq!(pivot.total(), expected);
        assert_eq!(pivot.total(), 3);
        assert_eq!(misses.unbucketed_location, 1);
        // "Mystery Drip" and the legacy off-catalog ECG mapping
        assert_eq!(misses.unmatched_package, 2);
        assert_eq!(pivot.get("Mag & Zinc", LocationBucket::Index), Some(1));
        assert_eq!(pivot.column_total(LocationBucket::Dkp), 1);
    }

    #[test]
    fn test_unique_patients_ignore_package_match() {
        let profile = RuleProfile::legacy();
        let aggregator = Aggregator::new(&profile);
        let items = vec![
            item("Jane", "City Walk", "Lipid Profile Test (Add On with Wellness)"),
            item("Jane", "City Walk", "Mystery Drip"),
            item("John", "City Walk", "Mystery Drip"),
            item("Jane", "DKP", "Mystery Drip"),
            item("Ann", "Marina", "Lipid Profile Test (Add On with Wellness)"),
        ];
        let pivot = aggregator.unique_patient_pivot(&items);
        assert_eq!(pivot.unique_patients_at(LocationBucket::CityWalk), 2);
        assert_eq!(pivot.unique_patients_at(LocationBucket::Dkp), 1);
        assert_eq!(pivot.unique_patients_at(LocationBucket::Index), 0);
        assert_eq!(pivot.packages.get("Lipid Profile", LocationBucket::CityWalk), Some(1));

        let labels: Vec<_> = pivot.rows().map(|(label, _)| label).collect();
        assert_eq!(labels.len(), profile.catalog.len() + 1);
        assert_eq!(labels.last(), Some(&"Unique Patients"));
    }

    #[test]
    fn test_increment_unknown_row() {
        let mut pivot = Pivot::zeroed(&["A".to_string()]);
        assert!(!pivot.increment("B", LocationBucket::Dkp));
        assert!(pivot.increment("A", LocationBucket::Dkp));
        assert_eq!(pivot.get("A", LocationBucket::Dkp), Some(1));
    }
}
