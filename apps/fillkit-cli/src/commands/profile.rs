use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fillkit_match::suggest_value;
use fillkit_profile::suggest_improvements;
use fillkit_protocol::FieldDescriptor;
use serde_json::json;

use super::util::{config_from, load_profile, print_json, settings_from, OutputArgs, ProfileArgs};

#[derive(Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub input: ProfileArgs,
    /// Include hints for values the alias tables cannot place
    #[arg(long)]
    pub suggestions: bool,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub input: ProfileArgs,
    /// Visible label of the freeform field
    #[arg(long)]
    pub label: String,
    /// Input name attribute
    #[arg(long, default_value = "")]
    pub name: String,
    /// Input type (text, email, tel, ...)
    #[arg(long, default_value = "text")]
    pub kind: String,
    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn normalize(args: NormalizeArgs, config: Option<PathBuf>) -> Result<()> {
    let settings = settings_from(&config_from(config.as_deref())?)?;
    let registry = settings.registry()?;
    let profile = load_profile(&args.input, &registry)?;
    tracing::debug!(present = profile.present_count(), "profile normalized");
    if args.suggestions {
        let suggestions = suggest_improvements(&profile, &registry);
        print_json(&json!({ "profile": profile, "suggestions": suggestions }), &args.output)
    } else {
        print_json(&profile, &args.output)
    }
}

pub fn suggest(args: SuggestArgs, config: Option<PathBuf>) -> Result<()> {
    let settings = settings_from(&config_from(config.as_deref())?)?;
    let registry = settings.registry()?;
    let profile = load_profile(&args.input, &registry)?;
    let field = FieldDescriptor::new(args.label).with_name(args.name).with_kind(args.kind);
    print_json(&suggest_value(&field, &profile), &args.output)
}
