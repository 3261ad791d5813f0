/*!
 * Package canonicalization
 *
 * Maps a free-text service name onto one canonical package name. The
 * description is trimmed and upper-cased, then matched in strict order:
 * exact rule key, rule key contained in the description (rule order), catalog
 * name contained in the description (catalog order).
 */

use crate::rules::{RuleProfile, RuleTable};

/// How a canonical package was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Partial,
    Catalog,
}

/// Result of a successful canonicalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageMatch<'a> {
    pub package: &'a str,
    pub kind: MatchKind,
}

/// Package canonicalizer bound to one rule profile
#[derive(Debug, Clone)]
pub struct PackageCanonicalizer<'a> {
    /// (upper-cased pattern, canonical value) in rule order
    rules: Vec<(String, &'a str)>,
    /// (upper-cased name, catalog name) in catalog order
    catalog: Vec<(String, &'a str)>,
}

impl<'a> PackageCanonicalizer<'a> {
    pub fn new(profile: &'a RuleProfile) -> Self {
        Self::with_tables(&profile.canonical, &profile.catalog)
    }

    pub fn with_tables(rules: &'a RuleTable, catalog: &'a [String]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|r| (r.pattern.to_uppercase(), r.value.as_str()))
                .collect(),
            catalog: catalog
                .iter()
                .map(|c| (c.to_uppercase(), c.as_str()))
                .collect(),
        }
    }

    /// Canonical package for a service name, or `None` on a miss
    pub fn canonicalize(&self, description: Option<&str>) -> Option<&'a str> {
        self.match_package(description).map(|m| m.package)
    }

    /// Like [`canonicalize`](Self::canonicalize), also reporting which step matched
    pub fn match_package(&self, description: Option<&str>) -> Option<PackageMatch<'a>> {
        let normalized = description?.trim().to_uppercase();

        if let Some((_, value)) = self.rules.iter().find(|(key, _)| *key == normalized) {
            return Some(PackageMatch { package: value, kind: MatchKind::Exact });
        }

        if let Some((_, value)) = self.rules.iter().find(|(key, _)| normalized.contains(key.as_str())) {
            return Some(PackageMatch { package: value, kind: MatchKind::Partial });
        }

        self.catalog
            .iter()
            .find(|(name, _)| normalized.contains(name.as_str()))
            .map(|(_, package)| PackageMatch { package, kind: MatchKind::Catalog })
    }
}
