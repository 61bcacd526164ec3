use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use fillkit_aliases::AliasRegistry;
use fillkit_match::{HttpSuggestionSource, MatchOptions, PolicyError, StageMinimums};
use fillkit_widget::WidgetConfig;
use jsonschema::{validator_for, Validator};
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::policy::{BelowThreshold, FillPolicy};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct MatchingConfig {
    /// Results at or above this confidence are applied without asking.
    #[schemars(range(min = 0.0, max = 1.0))]
    pub confidence_threshold: f64,
    /// Consult the remote suggestion service when local stages come up short.
    pub allow_remote: bool,
    /// What happens to a match below the threshold.
    pub below_threshold: BelowThreshold,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub direct_min: f64,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub category_min: f64,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub semantic_min: f64,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub remote_min: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let minimums = StageMinimums::default();
        Self {
            confidence_threshold: 0.8,
            allow_remote: false,
            below_threshold: BelowThreshold::default(),
            direct_min: minimums.direct,
            category_min: minimums.category,
            semantic_min: minimums.semantic,
            remote_min: minimums.remote,
        }
    }
}

impl MatchingConfig {
    pub fn stage_minimums(&self) -> StageMinimums {
        StageMinimums {
            direct: self.direct_min,
            category: self.category_min,
            semantic: self.semantic_min,
            remote: self.remote_min,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct RemoteConfig {
    /// Suggestion service URL; remote matching stays off without one.
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    /// Environment variable holding the bearer token.
    pub api_key_env: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 5000,
            api_key_env: None,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct AliasesConfig {
    /// Alias table files (JSON or TOML) merged over the built-in tables, in order.
    pub extra_tables: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub aliases: AliasesConfig,
}

static CONFIG_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema = schemars::schema_for!(Config);
    let schema_value = serde_json::to_value(&schema).expect("schema value");
    validator_for(&schema_value).expect("valid schema")
});

/// Returns the JSON schema describing the configuration structure.
///
/// # Panics
///
/// Panics if schema generation fails; this indicates a programming error.
pub fn config_schema_json() -> serde_json::Value {
    let schema = schemars::schema_for!(Config);
    serde_json::to_value(&schema).expect("schema json")
}

pub fn write_schema_file<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    let schema_json = config_schema_json();
    std::fs::write(path, serde_json::to_string_pretty(&schema_json)?)
}

/// Parse TOML configuration text, validating it against [`config_schema_json`] first.
pub fn parse_config(content: &str) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content).context("config is not valid TOML")?;
    let json_value = serde_json::to_value(&raw)?;
    let validation_errors: Vec<_> = CONFIG_SCHEMA
        .iter_errors(&json_value)
        .map(|e| format!("{}: {}", e.instance_path, e))
        .collect();
    if !validation_errors.is_empty() {
        return Err(anyhow::anyhow!(validation_errors.join(", ")));
    }
    let cfg: Config = toml::from_str(content)?;
    Ok(cfg)
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config {}", path.display()))
}

/// Everything one pass needs from configuration, checked and frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct PassSettings {
    pub policy: FillPolicy,
    pub options: MatchOptions,
    pub minimums: StageMinimums,
    pub widget: WidgetConfig,
    pub remote: RemoteConfig,
    pub extra_tables: Vec<PathBuf>,
}

impl PassSettings {
    pub fn from_config(config: &Config) -> Result<Self, PolicyError> {
        let matching = &config.matching;
        let policy = FillPolicy::new(matching.confidence_threshold, matching.below_threshold)?;
        let minimums = matching.stage_minimums();
        minimums.validate()?;
        Ok(Self {
            policy,
            options: MatchOptions {
                allow_remote: matching.allow_remote,
            },
            minimums,
            widget: config.widget.clone(),
            remote: config.remote.clone(),
            extra_tables: config.aliases.extra_tables.iter().map(PathBuf::from).collect(),
        })
    }

    /// Built-in alias tables plus the configured extras.
    pub fn registry(&self) -> Result<AliasRegistry> {
        if self.extra_tables.is_empty() {
            return Ok(AliasRegistry::builtin().clone());
        }
        AliasRegistry::with_extra_tables(&self.extra_tables).context("loading extra alias tables")
    }

    /// The HTTP suggestion source, when remote matching is allowed and an
    /// endpoint is configured.
    pub fn remote_source(&self) -> Result<Option<HttpSuggestionSource>> {
        if !self.options.allow_remote {
            return Ok(None);
        }
        let Some(endpoint) = self.remote.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            tracing::warn!(
                target: "fillkit::remote",
                "remote suggestions allowed but no endpoint configured"
            );
            return Ok(None);
        };
        let source = HttpSuggestionSource::from_env(endpoint, self.remote.timeout(), self.remote.api_key_env.as_deref())
            .context("building remote suggestion client")?;
        Ok(Some(source))
    }
}

impl Default for PassSettings {
    fn default() -> Self {
        Self {
            policy: FillPolicy::default(),
            options: MatchOptions::default(),
            minimums: StageMinimums::default(),
            widget: WidgetConfig::default(),
            remote: RemoteConfig::default(),
            extra_tables: Vec::new(),
        }
    }
}
