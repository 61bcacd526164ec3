use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use fillkit_aliases::AliasRegistry;
use fillkit_core::{Config, FieldTask, Orchestrator, PassSettings};
use fillkit_match::MatchEngine;
use fillkit_protocol::FieldDescriptor;

use super::util::{config_from, load_profile, print_json, read_json, settings_from, OutputArgs, ProfileArgs};

/// Command-line overrides applied over the loaded configuration.
#[derive(Args, Clone, Default)]
pub struct MatchingOverrides {
    /// Confidence at or above which a match is applied
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Consult the remote suggestion service when local stages come up short
    #[arg(long)]
    pub allow_remote: bool,
}

impl MatchingOverrides {
    fn apply(&self, config: &mut Config) {
        if let Some(threshold) = self.threshold {
            config.matching.confidence_threshold = threshold;
        }
        if self.allow_remote {
            config.matching.allow_remote = true;
        }
    }
}

#[derive(Args)]
pub struct MatchArgs {
    #[command(flatten)]
    pub input: ProfileArgs,
    /// Field descriptor JSON file
    #[arg(long)]
    pub field: PathBuf,
    #[command(flatten)]
    pub overrides: MatchingOverrides,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct PassArgs {
    #[command(flatten)]
    pub input: ProfileArgs,
    /// JSON array of field descriptors, in page order
    #[arg(long)]
    pub fields: PathBuf,
    #[command(flatten)]
    pub overrides: MatchingOverrides,
    #[command(flatten)]
    pub output: OutputArgs,
}

fn prepare(config: Option<PathBuf>, overrides: &MatchingOverrides) -> Result<PassSettings> {
    let mut config = config_from(config.as_deref())?;
    overrides.apply(&mut config);
    settings_from(&config)
}

fn engine<'r>(registry: &'r AliasRegistry, settings: &PassSettings) -> Result<MatchEngine<'r>> {
    let engine = MatchEngine::with_minimums(registry, settings.minimums).context("invalid stage minimums")?;
    Ok(match settings.remote_source()? {
        Some(source) => engine.with_remote(Box::new(source), settings.remote.timeout()),
        None => engine,
    })
}

pub async fn match_field(args: MatchArgs, config: Option<PathBuf>) -> Result<()> {
    let settings = prepare(config, &args.overrides)?;
    let registry = settings.registry()?;
    let profile = load_profile(&args.input, &registry)?;
    let field: FieldDescriptor = read_json(&args.field)?;
    let engine = engine(&registry, &settings)?;
    let evaluation = engine.evaluate(&field, &profile, settings.options).await;
    print_json(&evaluation, &args.output)
}

/// Dry run: matches every field and reports what a pass would do, without
/// touching any page.
pub async fn pass(args: PassArgs, config: Option<PathBuf>) -> Result<()> {
    let settings = prepare(config, &args.overrides)?;
    let registry = settings.registry()?;
    let profile = load_profile(&args.input, &registry)?;
    let fields: Vec<FieldDescriptor> = read_json(&args.fields)?;
    let orchestrator = Orchestrator::new(engine(&registry, &settings)?, &settings);
    let tasks: Vec<FieldTask<'_>> = fields.into_iter().map(FieldTask::new).collect();
    let report = orchestrator.run_pass(&profile, &tasks).await;
    print_json(&report, &args.output)
}
