use std::{collections::BTreeSet, fs, path::Path};

use anyhow::Context as _;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{normalize_text, AliasCategory};

/// Supported alias table serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Json,
    Toml,
    Unknown,
}

impl TableFormat {
    fn detect_from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => TableFormat::Json,
            Some(ext) if ext.eq_ignore_ascii_case("toml") => TableFormat::Toml,
            _ => TableFormat::Unknown,
        }
    }
}

/// One category worth of alias records, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AliasTable {
    pub category: AliasCategory,
    #[serde(default = "AliasTable::default_version")]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<AliasEntry>,
}

/// A canonical value with the spellings and codes that refer to it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub struct AliasEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    /// Owning country key for region entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Coarser bucket the value rolls up into (education and employment categories).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<String>,
}

impl AliasTable {
    const fn default_version() -> u32 {
        1
    }

    /// Load a table from a string.
    pub fn from_str(input: &str, format: TableFormat) -> Result<Self, AliasLoadError> {
        match format {
            TableFormat::Json => serde_json::from_str::<Self>(input)
                .map_err(|err| AliasLoadError::Parse(oops::ParseError::Json(err))),
            TableFormat::Toml => toml::from_str::<Self>(input)
                .map_err(|err| AliasLoadError::Parse(oops::ParseError::Toml(err))),
            TableFormat::Unknown => match serde_json::from_str::<Self>(input) {
                Ok(value) => Ok(value),
                Err(json_err) => match toml::from_str::<Self>(input) {
                    Ok(value) => Ok(value),
                    Err(toml_err) => Err(AliasLoadError::Parse(oops::ParseError::Both {
                        json: json_err,
                        toml: toml_err,
                    })),
                },
            },
        }
    }

    /// Load a table from disk. The format is inferred from the file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, AliasLoadError> {
        let path = path.as_ref();
        let format = TableFormat::detect_from_path(path);
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read alias table at {}", path.display()))
            .map_err(AliasLoadError::Io)?;
        Self::from_str(&raw, format)
    }

    /// Check table contents. Region parents are checked by the registry, which
    /// knows the country table.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut seen_keys: BTreeSet<String> = BTreeSet::new();

        for (idx, entry) in self.entries.iter().enumerate() {
            let field = format!("entries[{idx}]");
            let key = normalize_text(&entry.key);
            if key.is_empty() {
                report.push_error(format!("{field}.key"), "key is required".to_string());
                continue;
            }
            if !seen_keys.insert(key) {
                report.push_error(
                    format!("{field}.key"),
                    format!("duplicate key '{}' in {} table", entry.key, self.category.as_str()),
                );
            }
            if entry.variants.is_empty() && entry.codes.is_empty() {
                report.push_warning(
                    format!("{field}.variants"),
                    format!("'{}' has no variants or codes; only the key itself resolves", entry.key),
                );
            }
            if entry.variants.iter().any(|v| normalize_text(v).is_empty()) {
                report.push_error(
                    format!("{field}.variants"),
                    format!("'{}' declares an empty variant", entry.key),
                );
            }
            match (self.category, entry.parent.as_deref()) {
                (AliasCategory::Region, None) => report.push_warning(
                    format!("{field}.parent"),
                    format!("region '{}' has no parent country; code collisions cannot be narrowed", entry.key),
                ),
                (AliasCategory::Region, Some(_)) => {}
                (_, Some(_)) => report.push_warning(
                    format!("{field}.parent"),
                    "parent is only meaningful for region tables".to_string(),
                ),
                (_, None) => {}
            }
        }

        report
    }
}

/// Report emitted by [`AliasTable::validate`] and [`crate::AliasRegistry::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationIssue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error<S: Into<String>>(&mut self, field: S, message: S) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    pub fn push_warning<S: Into<String>>(&mut self, field: S, message: S) {
        self.warnings.push(ValidationIssue::new(field, message));
    }

    pub(crate) fn absorb(&mut self, prefix: &str, other: ValidationReport) {
        for issue in other.errors {
            self.push_error(format!("{prefix}.{}", issue.field), issue.message);
        }
        for issue in other.warnings {
            self.push_warning(format!("{prefix}.{}", issue.field), issue.message);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new<S: Into<String>>(field: S, message: S) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors encountered while loading or parsing an alias table.
#[derive(Debug, Error)]
pub enum AliasLoadError {
    #[error("{0}")]
    Io(#[source] anyhow::Error),
    #[error("{0}")]
    Parse(oops::ParseError),
}

pub mod oops {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ParseError {
        #[error("failed to parse alias table as JSON: {0}")]
        Json(#[source] serde_json::Error),
        #[error("failed to parse alias table as TOML: {0}")]
        Toml(#[source] toml::de::Error),
        #[error("failed to parse alias table as JSON ({json}) and TOML ({toml}); use a .json or .toml extension")]
        Both {
            #[source]
            json: serde_json::Error,
            toml: toml::de::Error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
category = "industry"

[[entries]]
key = "aerospace"
variants = ["aerospace", "aviation", "space"]

[[entries]]
key = "agriculture"
variants = ["agriculture", "farming"]
"#;

    #[test]
    fn table_parses_and_validates() {
        let table = AliasTable::from_str(SAMPLE, TableFormat::Toml).expect("table parse");
        assert_eq!(table.category, AliasCategory::Industry);
        assert_eq!(table.version, 1);
        assert_eq!(table.entries.len(), 2);
        assert!(table.validate().is_success());
    }

    #[test]
    fn duplicate_keys_are_errors() {
        let mut table = AliasTable::from_str(SAMPLE, TableFormat::Toml).expect("table parse");
        table.entries.push(AliasEntry {
            key: "Aerospace".into(),
            variants: vec!["aero".into()],
            ..Default::default()
        });
        let report = table.validate();
        assert!(report
            .errors
            .iter()
            .any(|issue| issue.message.contains("duplicate key")));
    }

    #[test]
    fn region_without_parent_warns() {
        let table = AliasTable {
            category: AliasCategory::Region,
            version: 1,
            entries: vec![AliasEntry {
                key: "bavaria".into(),
                codes: vec!["BY".into()],
                ..Default::default()
            }],
        };
        let report = table.validate();
        assert!(report.is_success());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].field, "entries[0].parent");
    }

    #[test]
    fn from_path_detects_format() {
        let tmp = NamedTempFile::new().expect("tmp");
        let path = tmp.path().with_extension("json");
        let table = AliasTable::from_str(SAMPLE, TableFormat::Toml).expect("table parse");
        fs::write(&path, serde_json::to_string_pretty(&table).expect("json")).expect("write");
        let loaded = AliasTable::from_path(&path).expect("load");
        assert_eq!(loaded, table);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn unknown_format_reports_both_parsers() {
        let err = AliasTable::from_str("not a table {", TableFormat::Unknown).unwrap_err();
        assert!(matches!(
            err,
            AliasLoadError::Parse(oops::ParseError::Both { .. })
        ));
    }
}
