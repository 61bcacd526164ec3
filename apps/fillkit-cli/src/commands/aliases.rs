use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use fillkit_aliases::{AliasCategory, AliasRegistry};
use serde_json::json;

use super::util::{print_json, OutputArgs};

#[derive(Subcommand)]
pub enum AliasesCmd {
    /// Resolve free text to canonical alias keys
    Resolve(ResolveArgs),
    /// Check built-in and extra alias tables for conflicts
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Category slug (country, region, industry, language, ...)
    pub category: String,
    /// Text to resolve
    pub text: String,
    /// Parent country narrowing region lookups
    #[arg(long)]
    pub country: Option<String>,
    /// Extra alias table files merged over the built-ins
    #[arg(long = "table")]
    pub tables: Vec<PathBuf>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Extra alias table files merged over the built-ins
    #[arg(long = "table")]
    pub tables: Vec<PathBuf>,
    #[command(flatten)]
    pub output: OutputArgs,
}

fn registry(tables: &[PathBuf]) -> Result<AliasRegistry> {
    if tables.is_empty() {
        return Ok(AliasRegistry::builtin().clone());
    }
    Ok(AliasRegistry::with_extra_tables(tables)?)
}

pub fn execute(cmd: AliasesCmd) -> Result<()> {
    match cmd {
        AliasesCmd::Resolve(args) => resolve(args),
        AliasesCmd::Validate(args) => validate(args),
    }
}

fn resolve(args: ResolveArgs) -> Result<()> {
    let category =
        AliasCategory::from_slug(&args.category).ok_or_else(|| anyhow!("unknown alias category '{}'", args.category))?;
    let registry = registry(&args.tables)?;
    let keys = match (category, args.country.as_deref()) {
        (AliasCategory::Region, country) => registry.resolve_region(&args.text, country),
        _ => registry.resolve(category, &args.text),
    };
    let entries: Vec<_> = keys
        .iter()
        .map(|key| {
            json!({
                "key": key,
                "code": registry.code_of(category, key),
                "group": registry.group_of(category, key),
            })
        })
        .collect();
    print_json(&json!({ "category": category, "matches": entries }), &args.output)
}

fn validate(args: ValidateArgs) -> Result<()> {
    let registry = registry(&args.tables)?;
    let report = registry.validate();
    print_json(&report, &args.output)?;
    if !report.is_success() {
        bail!("alias tables have {} error(s)", report.errors.len());
    }
    Ok(())
}
