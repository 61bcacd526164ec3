use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use fillkit_aliases::AliasRegistry;
use fillkit_core::{load_config, Config, PassSettings};
use fillkit_profile::{CanonicalProfile, ProfileNormalizer, RawProfile};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Configuration and profile inputs shared by the matching commands.
#[derive(Args, Clone)]
pub struct ProfileArgs {
    /// Profile JSON file (flat or nested object)
    #[arg(long)]
    pub profile: PathBuf,
    /// Reference date for derived ages (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Args, Clone, Default)]
pub struct OutputArgs {
    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn print_json<T: Serialize>(value: &T, out: &OutputArgs) -> Result<()> {
    let text = if out.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

pub fn config_from(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

pub fn settings_from(config: &Config) -> Result<PassSettings> {
    PassSettings::from_config(config).context("invalid matching configuration")
}

pub fn load_profile(args: &ProfileArgs, registry: &AliasRegistry) -> Result<CanonicalProfile> {
    let raw: RawProfile = read_json(&args.profile)?;
    let as_of = args.as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    Ok(ProfileNormalizer::with_registry(registry, as_of).normalize(&raw))
}
