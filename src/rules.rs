/*!
 * Rule profiles: turnaround table, canonicalization table, package catalog,
 * and location aliases
 *
 * Matching order is load-bearing, so every table is an ordered list of
 * `(pattern, value)` pairs rather than a map. Profiles are plain data: the
 * legacy and extended package sets differ only in catalog and canonical table
 * contents, and a custom profile can be loaded from TOML.
 */

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data_types::LocationBucket;
use crate::{Result, SmartFlowError};

/// A single ordered matching rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    pub value: String,
}

impl Rule {
    pub fn new<P: Into<String>, V: Into<String>>(pattern: P, value: V) -> Self {
        Self {
            pattern: pattern.into(),
            value: value.into(),
        }
    }
}

/// Ordered list of rules; enumeration order is the tie-break
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Build a table from literal pairs, keeping their order
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(pairs.iter().map(|(p, v)| Rule::new(*p, *v)).collect())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append a rule after all existing ones
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Aliases that place a free-text location in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRule {
    pub bucket: LocationBucket,
    pub aliases: Vec<String>,
}

impl LocationRule {
    pub fn new(bucket: LocationBucket, aliases: &[&str]) -> Self {
        Self {
            bucket,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Built-in rule profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// The first deployed package list
    Legacy,
    /// Superset with BCA, ECG, OPC and vaccination packages.
    ///
    /// The added catalog rows and canonical rules are placeholders until the
    /// deployed extended tables are available. Turnaround rules and the DNA
    /// marker are the legacy ones.
    #[default]
    Extended,
}

impl ProfileKind {
    pub fn profile(&self) -> RuleProfile {
        match self {
            ProfileKind::Legacy => RuleProfile::legacy(),
            ProfileKind::Extended => RuleProfile::extended(),
        }
    }
}

impl std::str::FromStr for ProfileKind {
    type Err = SmartFlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(ProfileKind::Legacy),
            "extended" => Ok(ProfileKind::Extended),
            other => Err(SmartFlowError::Configuration {
                message: format!("Unknown rule profile '{}'", other),
                suggestion: Some("Use 'legacy' or 'extended'".to_string()),
            }),
        }
    }
}

/// Complete classification configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleProfile {
    pub name: String,
    /// Case-sensitive substring marking a DNA package ("6 Weeks" turnaround)
    pub dna_marker: String,
    /// Canonical package names, in pivot row order
    pub catalog: Vec<String>,
    /// Turnaround rules: service-name substring -> turnaround label
    pub turnaround: RuleTable,
    /// Canonicalization rules: service-name pattern -> canonical package
    pub canonical: RuleTable,
    /// Location bucket aliases, evaluated in order
    pub locations: Vec<LocationRule>,
}

const LEGACY_TURNAROUND: &[(&str, &str)] = &[
    ("UAE National Pre-employment", "72hrs"),
    ("Wellness Package - Premium", "96hrs"),
    ("Food Intolerance Test", "96hrs"),
    ("Respiratory Allergy Test", "48hrs"),
    ("Body Composition Analysis Test", "0"),
    ("ECG", "0"),
    ("Wellness Package - Enhanced", "72hrs"),
    ("Wellness Package - Standard", "36hrs"),
    ("Lipid Profile Test", "24hrs"),
    ("Food Allergy Test", "48hrs"),
    ("Female Hormone Profile", "48hrs"),
    ("Gut Health", "6 Weeks"),
];

const LEGACY_CANONICAL: &[(&str, &str)] = &[
    ("UAE National Pre-employment", "UAE-National Pre-Employment Test"),
    ("Wellness Package - Premium", "Premium Package"),
    ("Food Intolerance Test (Stand Alone)", "Food Intolerance"),
    ("Respiratory Allergy Test (Add On)", "Respiratory Allergy"),
    ("Body Composition Analysis Test (Add On)", "Body Composition Analysis Test (Add On)"),
    ("ECG and Doctor Consult (Stand Alone)", "ECG and Doctor Consult (Stand Alone)"),
    ("Wellness Package - Enhanced", "Enhanced Package"),
    ("Wellness Package - Standard", "Standard Package"),
    ("Lipid Profile Test (Add On with Wellness)", "Lipid Profile"),
    ("Food Allergy Test (Add On)", "Food Allergy"),
    ("Female Hormone Profile (Add On with Wellness)", "Female Hormone Profile"),
    ("Food Intolerance Test (Add On)", "Food Intolerance"),
    ("Smart DNA - Age Well Package", "Age-Well"),
];

const EXTENDED_CANONICAL: &[(&str, &str)] = &[
    ("UAE National Pre-employment", "UAE-National Pre-Employment Test"),
    ("Wellness Package - Premium", "Premium Package"),
    ("Food Intolerance Test (Stand Alone)", "Food Intolerance"),
    ("Respiratory Allergy Test (Add On)", "Respiratory Allergy"),
    ("Body Composition Analysis Test (Add On)", "BCA"),
    ("Body Composition Analysis", "BCA"),
    ("ECG and Doctor Consult (Stand Alone)", "ECG"),
    ("Wellness Package - Enhanced", "Enhanced Package"),
    ("Wellness Package - Standard", "Standard Package"),
    ("Lipid Profile Test (Add On with Wellness)", "Lipid Profile"),
    ("Food Allergy Test (Add On)", "Food Allergy"),
    ("Female Hormone Profile (Add On with Wellness)", "Female Hormone Profile"),
    ("Food Intolerance Test (Add On)", "Food Intolerance"),
    ("Smart DNA - Age Well Package", "Age-Well"),
    ("Doctor Consultation", "OPC"),
    ("Flu Vaccine", "Flu Vaccination"),
    ("Hepatitis B Vaccine", "Hepatitis B Vaccination"),
    ("Typhoid Vaccine", "Typhoid Vaccination"),
];

const LEGACY_CATALOG: &[&str] = &[
    "Standard Package",
    "Enhanced Package",
    "Premium Package",
    "Lipid Profile",
    "Food Allergy",
    "Food Intolerance",
    "Respiratory Allergy",
    "Female Hormone Profile",
    "Mag & Zinc",
    "Coeliac Profile Test",
    "Active Package",
    "Womens Comprehensive Health Screening",
    "Healthy Heart Package",
    "Right Fit",
    "Athletes Package",
    "NutriGen",
    "UAE-National Pre-Employment Test",
    "Age-Well",
    "Acne Profile",
    "Hair Loss",
];

const EXTENDED_CATALOG_ADDITIONS: &[&str] = &[
    "BCA",
    "ECG",
    "OPC",
    "Flu Vaccination",
    "Hepatitis B Vaccination",
    "Typhoid Vaccination",
];

fn default_locations() -> Vec<LocationRule> {
    vec![
        LocationRule::new(LocationBucket::CityWalk, &["CITY WALK"]),
        LocationRule::new(LocationBucket::Dkp, &["DUBAI KNOWLEDGE PARK", "DKP"]),
        LocationRule::new(LocationBucket::Index, &["INDEX TOWER", "INDEX"]),
    ]
}

impl RuleProfile {
    /// The first deployed package list and tables
    pub fn legacy() -> Self {
        Self {
            name: "legacy".to_string(),
            dna_marker: "DNA".to_string(),
            turnaround: RuleTable::from_pairs(LEGACY_TURNAROUND),
            canonical: RuleTable::from_pairs(LEGACY_CANONICAL),
            catalog: LEGACY_CATALOG.iter().map(|s| s.to_string()).collect(),
            locations: default_locations(),
        }
    }

    /// The richer package list; a superset of [`RuleProfile::legacy`] catalog.
    /// Only the catalog and canonical table differ from legacy.
    pub fn extended() -> Self {
        let catalog = LEGACY_CATALOG
            .iter()
            .chain(EXTENDED_CATALOG_ADDITIONS)
            .map(|s| s.to_string())
            .collect();

        Self {
            name: "extended".to_string(),
            dna_marker: "DNA".to_string(),
            turnaround: RuleTable::from_pairs(LEGACY_TURNAROUND),
            canonical: RuleTable::from_pairs(EXTENDED_CANONICAL),
            catalog,
            locations: default_locations(),
        }
    }

    /// Whether `package` is a row of the pivot catalog
    pub fn in_catalog(&self, package: &str) -> bool {
        self.catalog.iter().any(|c| c == package)
    }

    /// Canonical rule values that are not in the catalog; such matches never
    /// reach a pivot cell
    pub fn off_catalog_values(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.canonical
            .iter()
            .map(|r| r.value.as_str())
            .filter(|v| !self.in_catalog(v) && seen.insert(*v))
            .collect()
    }

    /// Check the profile is usable
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String, suggestion: &str| SmartFlowError::Configuration {
            message: format!("Rule profile '{}': {}", self.name, message),
            suggestion: Some(suggestion.to_string()),
        };

        if self.catalog.is_empty() {
            return Err(invalid("package catalog is empty".to_string(), "List at least one canonical package"));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.catalog.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(invalid(format!("duplicate catalog entry '{}'", dup), "Remove the repeated package name"));
        }

        if self.dna_marker.is_empty() {
            return Err(invalid("DNA marker is empty".to_string(), "Set dna_marker, e.g. \"DNA\""));
        }

        let tables = [("turnaround", &self.turnaround), ("canonical", &self.canonical)];
        for (label, table) in tables {
            if let Some(pos) = table.iter().position(|r| r.pattern.trim().is_empty()) {
                return Err(invalid(
                    format!("{} rule #{} has an empty pattern", label, pos + 1),
                    "An empty pattern matches every description; remove it",
                ));
            }
        }

        for rule in &self.locations {
            if rule.aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(invalid(
                    format!("location {} has an empty alias", rule.bucket),
                    "Remove the empty alias",
                ));
            }
        }

        Ok(())
    }

    /// Load a profile from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let profile: Self = toml::from_str(&contents)
            .map_err(|e| SmartFlowError::Configuration {
                message: format!("Failed to parse rules file: {}", e),
                suggestion: Some("Check that the file is valid TOML with [[turnaround]] and [[canonical]] tables".to_string()),
            })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Serialize the profile to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SmartFlowError::Configuration {
                message: format!("Failed to serialize rule profile: {}", e),
                suggestion: None,
            })
    }

    /// Save the profile to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

impl Default for RuleProfile {
    fn default() -> Self {
        Self::extended()
    }
}
