use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use fillkit_core::{config_schema_json, load_config, write_schema_file, PassSettings};

use super::util::{print_json, OutputArgs};

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Print or write the configuration JSON schema
    Schema(SchemaArgs),
    /// Validate a configuration file and print the effective values
    Check(CheckArgs),
}

#[derive(Args)]
pub struct SchemaArgs {
    /// Write the schema to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct CheckArgs {
    /// TOML configuration file
    pub path: PathBuf,
    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn execute(cmd: ConfigCmd) -> Result<()> {
    match cmd {
        ConfigCmd::Schema(args) => match args.out {
            Some(out) => {
                write_schema_file(&out).with_context(|| format!("writing {}", out.display()))?;
                println!("Wrote {}", out.display());
                Ok(())
            }
            None => print_json(&config_schema_json(), &args.output),
        },
        ConfigCmd::Check(args) => {
            let config = load_config(&args.path)?;
            PassSettings::from_config(&config).context("invalid matching configuration")?;
            print_json(&config, &args.output)
        }
    }
}
