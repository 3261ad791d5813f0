/*!
 * Turnaround classification
 *
 * Maps a free-text service name to a turnaround label. Override rules run
 * first (DNA marker, then consultation), then the turnaround table is scanned
 * in its configured order and the first contained pattern wins.
 */

use crate::constants::{CONSULTATION_MARKER, CONSULTATION_TURNAROUND, DNA_TURNAROUND};
use crate::rules::{RuleProfile, RuleTable};

/// Turnaround classifier bound to one rule profile
#[derive(Debug, Clone, Copy)]
pub struct TurnaroundClassifier<'a> {
    dna_marker: &'a str,
    table: &'a RuleTable,
}

impl<'a> TurnaroundClassifier<'a> {
    pub fn new(profile: &'a RuleProfile) -> Self {
        Self::with_table(&profile.dna_marker, &profile.turnaround)
    }

    pub fn with_table(dna_marker: &'a str, table: &'a RuleTable) -> Self {
        Self { dna_marker, table }
    }

    /// Classify a service name.
    ///
    /// `None` input (a non-text cell) and descriptions no rule matches both
    /// yield `None`. Table patterns are matched case-sensitively against the
    /// description as given.
    pub fn classify(&self, description: Option<&str>) -> Option<&'a str> {
        let description = description?;

        if description.contains(self.dna_marker) {
            return Some(DNA_TURNAROUND);
        }

        if description.to_uppercase().contains(CONSULTATION_MARKER) {
            return Some(CONSULTATION_TURNAROUND);
        }

        self.table
            .iter()
            .find(|rule| description.contains(rule.pattern.as_str()))
            .map(|rule| rule.value.as_str())
    }
}
