use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};

mod commands;

use commands::{AliasesCmd, ConfigCmd, MatchArgs, NormalizeArgs, PassArgs, SuggestArgs};

#[derive(Parser)]
#[command(name = "fillkit-cli", version, about = "Match profile data to form fields")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a profile and print its canonical leaves (JSON)
    Normalize(NormalizeArgs),
    /// Match one field descriptor against a profile
    Match(MatchArgs),
    /// Dry-run a fill pass over a list of field descriptors
    Pass(PassArgs),
    /// Suggest a value for a freeform field
    Suggest(SuggestArgs),
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
    /// Alias table helpers
    Aliases {
        #[command(subcommand)]
        cmd: AliasesCmd,
    },
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    shell: clap_complete::Shell,
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config;
    match cli.command {
        Commands::Normalize(args) => commands::profile::normalize(args, config),
        Commands::Match(args) => commands::matching::match_field(args, config).await,
        Commands::Pass(args) => commands::matching::pass(args, config).await,
        Commands::Suggest(args) => commands::profile::suggest(args, config),
        Commands::Config { cmd } => commands::config::execute(cmd),
        Commands::Aliases { cmd } => commands::aliases::execute(cmd),
        Commands::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "fillkit-cli", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    fillkit_otel::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
