//! Alias tables for canonical profile values.
//!
//! Each table maps a canonical key (for example `"united states"`) to the
//! spellings and codes users and web forms use for it. The built-in tables are
//! plain data files compiled into the crate and parsed once on first use;
//! extra tables can be layered on top from disk. Nothing mutates a registry
//! after it is built.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

pub mod table;

pub use table::{
    AliasEntry, AliasLoadError, AliasTable, TableFormat, ValidationIssue, ValidationReport,
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AliasCategory {
    Country,
    Region,
    Industry,
    Language,
    EducationLevel,
    EmploymentStatus,
    SkillLevel,
    BooleanIntent,
    Gender,
    MaritalStatus,
    Interest,
}

impl AliasCategory {
    pub const ALL: [AliasCategory; 11] = [
        AliasCategory::Country,
        AliasCategory::Region,
        AliasCategory::Industry,
        AliasCategory::Language,
        AliasCategory::EducationLevel,
        AliasCategory::EmploymentStatus,
        AliasCategory::SkillLevel,
        AliasCategory::BooleanIntent,
        AliasCategory::Gender,
        AliasCategory::MaritalStatus,
        AliasCategory::Interest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AliasCategory::Country => "country",
            AliasCategory::Region => "region",
            AliasCategory::Industry => "industry",
            AliasCategory::Language => "language",
            AliasCategory::EducationLevel => "education_level",
            AliasCategory::EmploymentStatus => "employment_status",
            AliasCategory::SkillLevel => "skill_level",
            AliasCategory::BooleanIntent => "boolean_intent",
            AliasCategory::Gender => "gender",
            AliasCategory::MaritalStatus => "marital_status",
            AliasCategory::Interest => "interest",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            AliasCategory::Country => "Country",
            AliasCategory::Region => "State / province",
            AliasCategory::Industry => "Industry",
            AliasCategory::Language => "Language",
            AliasCategory::EducationLevel => "Education level",
            AliasCategory::EmploymentStatus => "Employment status",
            AliasCategory::SkillLevel => "Skill level",
            AliasCategory::BooleanIntent => "Yes / no",
            AliasCategory::Gender => "Gender",
            AliasCategory::MaritalStatus => "Marital status",
            AliasCategory::Interest => "Interest",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "country" | "countries" => Some(AliasCategory::Country),
            "region" | "state" | "province" => Some(AliasCategory::Region),
            "industry" | "sector" => Some(AliasCategory::Industry),
            "language" | "languages" => Some(AliasCategory::Language),
            "education_level" | "education" => Some(AliasCategory::EducationLevel),
            "employment_status" | "employment" => Some(AliasCategory::EmploymentStatus),
            "skill_level" | "skill" | "experience" => Some(AliasCategory::SkillLevel),
            "boolean_intent" | "boolean" | "yes_no" => Some(AliasCategory::BooleanIntent),
            "gender" => Some(AliasCategory::Gender),
            "marital_status" | "marital" => Some(AliasCategory::MaritalStatus),
            "interest" | "interests" => Some(AliasCategory::Interest),
            _ => None,
        }
    }
}

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("country", include_str!("../tables/country.toml")),
    ("region", include_str!("../tables/region.toml")),
    ("industry", include_str!("../tables/industry.toml")),
    ("language", include_str!("../tables/language.toml")),
    ("education_level", include_str!("../tables/education_level.toml")),
    ("employment_status", include_str!("../tables/employment_status.toml")),
    ("skill_level", include_str!("../tables/skill_level.toml")),
    ("boolean_intent", include_str!("../tables/boolean_intent.toml")),
    ("gender", include_str!("../tables/gender.toml")),
    ("marital_status", include_str!("../tables/marital_status.toml")),
    ("interest", include_str!("../tables/interest.toml")),
];

static BUILTIN: Lazy<AliasRegistry> = Lazy::new(|| AliasRegistry::from_tables(builtin_tables()));

fn builtin_tables() -> Vec<AliasTable> {
    BUILTIN_SOURCES
        .iter()
        .filter_map(|(name, src)| match AliasTable::from_str(src, TableFormat::Toml) {
            Ok(table) => Some(table),
            Err(err) => {
                tracing::error!(
                    target: "fillkit::aliases",
                    table = %name,
                    error = %err,
                    "built-in alias table failed to parse; skipping"
                );
                None
            }
        })
        .collect()
}

/// Lowercase, NFKC-fold and strip punctuation so `"U.S.A."`, `"usa"` and
/// `"USA "` compare equal. Hyphens and slashes become spaces.
pub fn normalize_text(input: &str) -> String {
    let folded: String = input.nfkc().collect::<String>().to_lowercase();
    let mut out = String::with_capacity(folded.len());
    for ch in folded.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
        } else if matches!(ch, '.' | '\'' | '\u{2019}') {
            continue;
        } else if ch == '&' {
            out.push_str(" and ");
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when `needle` occurs in `haystack` as a run of whole tokens. Both
/// inputs must already be normalized.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() || haystack.is_empty() {
        return false;
    }
    if haystack == needle {
        return true;
    }
    format!(" {haystack} ").contains(&format!(" {needle} "))
}

#[derive(Debug, Clone)]
struct Record {
    entry: AliasEntry,
    /// Normalized key and variants.
    names: Vec<String>,
    /// Normalized codes.
    codes: Vec<String>,
    /// Normalized subcategories; narrower than any name.
    subcategories: Vec<String>,
}

impl Record {
    fn new(entry: AliasEntry) -> Self {
        let mut names = Vec::new();
        for raw in std::iter::once(&entry.key).chain(entry.variants.iter()) {
            let norm = normalize_text(raw);
            if !norm.is_empty() && !names.contains(&norm) {
                names.push(norm);
            }
        }
        let mut codes = Vec::new();
        for raw in &entry.codes {
            let norm = normalize_text(raw);
            if !norm.is_empty() && !codes.contains(&norm) {
                codes.push(norm);
            }
        }
        let subcategories = entry
            .subcategories
            .iter()
            .map(|raw| normalize_text(raw))
            .filter(|norm| !norm.is_empty())
            .collect();
        Self {
            entry,
            names,
            codes,
            subcategories,
        }
    }

    fn forms(&self) -> impl Iterator<Item = &String> {
        self.names.iter().chain(self.codes.iter())
    }
}

/// Read-only lookup over all alias tables.
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    tables: BTreeMap<AliasCategory, Vec<Record>>,
}

impl AliasRegistry {
    /// The registry built from the tables shipped with the crate.
    pub fn builtin() -> &'static AliasRegistry {
        &BUILTIN
    }

    /// Build a registry; entries in later tables replace earlier entries with
    /// the same normalized key.
    pub fn from_tables<I: IntoIterator<Item = AliasTable>>(tables: I) -> Self {
        let mut registry = AliasRegistry::default();
        for table in tables {
            registry.merge_table(table);
        }
        registry
    }

    /// Built-in tables with extra table files layered on top, in order.
    pub fn with_extra_tables<P: AsRef<Path>>(paths: &[P]) -> Result<Self, AliasLoadError> {
        let mut registry = AliasRegistry::builtin().clone();
        for path in paths {
            let table = AliasTable::from_path(path)?;
            tracing::debug!(
                target: "fillkit::aliases",
                path = %path.as_ref().display(),
                category = table.category.as_str(),
                entries = table.entries.len(),
                "merging extra alias table"
            );
            registry.merge_table(table);
        }
        Ok(registry)
    }

    fn merge_table(&mut self, table: AliasTable) {
        let records = self.tables.entry(table.category).or_default();
        for entry in table.entries {
            let record = Record::new(entry);
            let Some(key) = record.names.first().cloned() else {
                continue;
            };
            match records
                .iter_mut()
                .find(|existing| existing.names.first() == Some(&key))
            {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = AliasCategory> + '_ {
        self.tables.keys().copied()
    }

    fn records(&self, category: AliasCategory) -> &[Record] {
        self.tables.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    fn record(&self, category: AliasCategory, key: &str) -> Option<&Record> {
        let norm = normalize_text(key);
        self.records(category)
            .iter()
            .find(|record| record.names.first() == Some(&norm))
    }

    /// Canonical keys whose key, variant or code matches `needle` exactly, or
    /// whose key or variant contains `needle` as a whole-token phrase.
    pub fn resolve(&self, category: AliasCategory, needle: &str) -> BTreeSet<String> {
        let needle = normalize_text(needle);
        let mut out = BTreeSet::new();
        if needle.is_empty() {
            return out;
        }
        for record in self.records(category) {
            let exact = record.forms().any(|form| *form == needle);
            let within = record
                .names
                .iter()
                .any(|name| contains_phrase(name, &needle));
            if exact || within {
                out.insert(record.entry.key.clone());
            }
        }
        out
    }

    /// Like [`resolve`](Self::resolve) for regions, narrowed to the regions of
    /// `parent_country` when that parent resolves to a known country.
    pub fn resolve_region(&self, needle: &str, parent_country: Option<&str>) -> BTreeSet<String> {
        let hits = self.resolve(AliasCategory::Region, needle);
        let Some(parent) = parent_country else {
            return hits;
        };
        let parents = self.resolve(AliasCategory::Country, parent);
        if parents.is_empty() {
            return hits;
        }
        hits.into_iter()
            .filter(|key| {
                self.entry(AliasCategory::Region, key)
                    .and_then(|entry| entry.parent.as_ref())
                    .is_some_and(|p| parents.contains(p))
            })
            .collect()
    }

    /// Canonical keys with a key or variant that appears as a whole-token
    /// phrase inside `text`. Codes are left out: short codes such as `IN` or
    /// `IT` collide with ordinary words in running text.
    pub fn resolve_in_text(&self, category: AliasCategory, text: &str) -> BTreeSet<String> {
        let text = normalize_text(text);
        let mut out = BTreeSet::new();
        if text.is_empty() {
            return out;
        }
        for record in self.records(category) {
            if record.names.iter().any(|name| contains_phrase(&text, name)) {
                out.insert(record.entry.key.clone());
            }
        }
        out
    }

    /// Parent keys of the subcategory `text` names. Exact subcategories win;
    /// otherwise any subcategory found as a whole-token phrase inside `text`.
    pub fn resolve_subcategory(&self, category: AliasCategory, text: &str) -> BTreeSet<String> {
        let text = normalize_text(text);
        let mut out = BTreeSet::new();
        if text.is_empty() {
            return out;
        }
        let records = self.records(category);
        for record in records {
            if record.subcategories.iter().any(|sub| *sub == text) {
                out.insert(record.entry.key.clone());
            }
        }
        if out.is_empty() {
            for record in records {
                if record.subcategories.iter().any(|sub| contains_phrase(&text, sub)) {
                    out.insert(record.entry.key.clone());
                }
            }
        }
        out
    }

    /// True when `text` is, or mentions, one of `key`'s subcategories.
    pub fn is_subcategory_of(&self, category: AliasCategory, key: &str, text: &str) -> bool {
        let text = normalize_text(text);
        self.record(category, key).is_some_and(|record| {
            record
                .subcategories
                .iter()
                .any(|sub| contains_phrase(&text, sub))
        })
    }

    /// Key, variants and codes of `key`, in table order.
    pub fn variants_of(&self, category: AliasCategory, key: &str) -> Vec<String> {
        let Some(record) = self.record(category, key) else {
            return Vec::new();
        };
        let mut out = vec![record.entry.key.clone()];
        for value in record.entry.variants.iter().chain(record.entry.codes.iter()) {
            if !out.contains(value) {
                out.push(value.clone());
            }
        }
        out
    }

    pub fn entry(&self, category: AliasCategory, key: &str) -> Option<&AliasEntry> {
        self.record(category, key).map(|record| &record.entry)
    }

    /// First declared code of `key`.
    pub fn code_of(&self, category: AliasCategory, key: &str) -> Option<&str> {
        self.entry(category, key)
            .and_then(|entry| entry.codes.first())
            .map(String::as_str)
    }

    pub fn group_of(&self, category: AliasCategory, key: &str) -> Option<&str> {
        self.entry(category, key).and_then(|entry| entry.group.as_deref())
    }

    /// True when `text` normalizes to exactly one of `key`'s forms.
    pub fn is_exact_form(&self, category: AliasCategory, key: &str, text: &str) -> bool {
        let text = normalize_text(text);
        self.record(category, key)
            .is_some_and(|record| record.forms().any(|form| *form == text))
    }

    /// Length in chars of the longest key or variant of `key` found inside
    /// `text`; how specifically `text` refers to `key`.
    pub fn matched_form_len(&self, category: AliasCategory, key: &str, text: &str) -> Option<usize> {
        let text = normalize_text(text);
        self.record(category, key).and_then(|record| {
            record
                .names
                .iter()
                .filter(|name| contains_phrase(&text, name))
                .map(|name| name.chars().count())
                .max()
        })
    }

    /// Validate every table and check that region parents name known countries.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        for (category, records) in &self.tables {
            let table = AliasTable {
                category: *category,
                version: 1,
                entries: records.iter().map(|record| record.entry.clone()).collect(),
            };
            report.absorb(category.as_str(), table.validate());
        }
        for (idx, record) in self.records(AliasCategory::Region).iter().enumerate() {
            if let Some(parent) = &record.entry.parent {
                if self.record(AliasCategory::Country, parent).is_none() {
                    report.push_error(
                        format!("region.entries[{idx}].parent"),
                        format!("parent '{parent}' of '{}' is not a known country", record.entry.key),
                    );
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn builtin_tables_parse_and_validate() {
        let registry = AliasRegistry::builtin();
        assert_eq!(registry.categories().count(), AliasCategory::ALL.len());
        let report = registry.validate();
        assert!(report.is_success(), "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn normalize_folds_case_and_punctuation() {
        assert_eq!(normalize_text("  U.S.A. "), "usa");
        assert_eq!(normalize_text("Full-Time"), "full time");
        assert_eq!(normalize_text("R&D"), "r and d");
        assert_eq!(normalize_text("Master's"), "masters");
        assert_eq!(normalize_text("ＵＳＡ"), "usa");
    }

    #[test]
    fn contains_phrase_respects_token_boundaries() {
        assert!(contains_phrase("new york city", "new york"));
        assert!(!contains_phrase("female", "male"));
        assert!(!contains_phrase("status", "state"));
        assert!(!contains_phrase("", "x"));
    }

    #[test]
    fn resolves_country_codes_and_variants() {
        let registry = AliasRegistry::builtin();
        let us = keys(&["united states"]);
        assert_eq!(registry.resolve(AliasCategory::Country, "USA"), us);
        assert_eq!(registry.resolve(AliasCategory::Country, "us"), us);
        assert_eq!(registry.resolve(AliasCategory::Country, "U.S.A."), us);
        assert_eq!(registry.resolve(AliasCategory::Country, "United States of America"), us);
        assert_eq!(
            registry.resolve(AliasCategory::Country, "UK"),
            keys(&["united kingdom"])
        );
    }

    #[test]
    fn substring_of_variant_resolves_to_every_owner() {
        let registry = AliasRegistry::builtin();
        let hits = registry.resolve(AliasCategory::Region, "new");
        assert!(hits.contains("new york"));
        assert!(hits.contains("new jersey"));
        assert!(hits.contains("new south wales"));
    }

    #[test]
    fn unknown_or_empty_needles_resolve_to_nothing() {
        let registry = AliasRegistry::builtin();
        assert!(registry.resolve(AliasCategory::Country, "atlantis").is_empty());
        assert!(registry.resolve(AliasCategory::Country, "   ").is_empty());
        assert!(registry.resolve(AliasCategory::Country, "stan").is_empty());
    }

    #[test]
    fn region_collisions_are_narrowed_by_parent_country() {
        let registry = AliasRegistry::builtin();
        assert_eq!(
            registry.resolve(AliasCategory::Region, "WA"),
            keys(&["washington", "western australia"])
        );
        assert_eq!(
            registry.resolve_region("WA", Some("Australia")),
            keys(&["western australia"])
        );
        assert_eq!(registry.resolve_region("WA", Some("US")), keys(&["washington"]));
        assert_eq!(
            registry.resolve_region("NT", Some("CAN")),
            keys(&["northwest territories"])
        );
        assert_eq!(
            registry.resolve_region("WA", Some("Narnia")),
            keys(&["washington", "western australia"])
        );
    }

    #[test]
    fn resolve_in_text_finds_embedded_variants_without_codes() {
        let registry = AliasRegistry::builtin();
        assert_eq!(
            registry.resolve_in_text(AliasCategory::EducationLevel, "Bachelor of Science in CS"),
            keys(&["bachelor degree"])
        );
        assert!(registry
            .resolve_in_text(AliasCategory::Country, "born in france")
            .contains("france"));
        assert!(!registry
            .resolve_in_text(AliasCategory::Country, "born in france")
            .contains("india"));
    }

    #[test]
    fn subcategories_resolve_to_their_parent() {
        let registry = AliasRegistry::builtin();
        assert_eq!(
            registry.resolve_subcategory(AliasCategory::Industry, "Data Science"),
            keys(&["technology"])
        );
        assert_eq!(
            registry.resolve_subcategory(AliasCategory::Industry, "Nursing"),
            keys(&["healthcare"])
        );
        assert_eq!(
            registry.resolve_subcategory(AliasCategory::Industry, "Automotive retail"),
            keys(&["retail"])
        );
        assert!(registry.resolve(AliasCategory::Industry, "Data Science").is_empty());
        assert!(registry.is_subcategory_of(AliasCategory::Industry, "technology", "Cybersecurity"));
        assert!(!registry.is_subcategory_of(AliasCategory::Industry, "technology", "Nursing"));
    }

    #[test]
    fn variants_codes_and_groups_are_exposed() {
        let registry = AliasRegistry::builtin();
        let variants = registry.variants_of(AliasCategory::Country, "united states");
        assert_eq!(variants.first().map(String::as_str), Some("united states"));
        assert!(variants.iter().any(|v| v == "USA"));
        assert!(variants.iter().any(|v| v == "america"));
        assert!(registry.variants_of(AliasCategory::Country, "atlantis").is_empty());
        assert_eq!(registry.code_of(AliasCategory::Region, "new york"), Some("NY"));
        assert_eq!(
            registry.group_of(AliasCategory::EmploymentStatus, "retired"),
            Some("not_working")
        );
    }

    #[test]
    fn exact_form_and_specificity() {
        let registry = AliasRegistry::builtin();
        assert!(registry.is_exact_form(AliasCategory::BooleanIntent, "yes", "Yes"));
        assert!(!registry.is_exact_form(AliasCategory::BooleanIntent, "yes", "Yes please"));
        assert_eq!(
            registry.matched_form_len(AliasCategory::EmploymentStatus, "employed full-time", "Employed full-time"),
            Some("employed full time".len())
        );
        assert_eq!(
            registry.matched_form_len(AliasCategory::EmploymentStatus, "employed full-time", "Employed part-time"),
            Some("employed".len())
        );
    }

    #[test]
    fn extra_tables_override_builtin_entries() {
        let table = AliasTable::from_str(
            r#"
category = "industry"

[[entries]]
key = "technology"
variants = ["deep tech"]
"#,
            TableFormat::Toml,
        )
        .expect("table");
        let registry = AliasRegistry::from_tables(builtin_tables().into_iter().chain([table]));
        assert_eq!(
            registry.resolve(AliasCategory::Industry, "deep tech"),
            keys(&["technology"])
        );
        assert!(registry.resolve(AliasCategory::Industry, "software").is_empty());
    }

    #[test]
    fn category_slugs_round_trip() {
        for category in AliasCategory::ALL {
            assert_eq!(AliasCategory::from_slug(category.as_str()), Some(category));
        }
        assert_eq!(AliasCategory::from_slug("State"), Some(AliasCategory::Region));
        assert_eq!(AliasCategory::from_slug("nope"), None);
    }
}
