use std::process::ExitCode;

use clap::{Parser, Subcommand};

use nxrelease::commands::init_config::InitConfigArgs;
use nxrelease::commands::releasenotes::ReleaseNotesArgs;
use nxrelease::commands::triage::TriageArgs;
use nxrelease::{commands, error, telemetry, ui};

#[derive(Debug, Parser)]
#[command(
    name = "nxrelease",
    version,
    about = "Triage merged pull requests onto release-notes project boards"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pick or create a release board, sync merged PRs onto it, then triage
    Releasenotes(ReleaseNotesArgs),
    /// Triage the To-Add column of an existing release board
    Triage(TriageArgs),
    /// Write a commented default config file
    InitConfig(InitConfigArgs),
    /// Print the JSON Schema for .nxrelease.toml
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Releasenotes(_) => "releasenotes",
            Self::Triage(_) => "triage",
            Self::InitConfig(_) => "init-config",
            Self::Schema => "schema",
        }
    }
}

fn main() -> ExitCode {
    telemetry::init();
    ui::install_interrupt_handler();

    let cli = Cli::parse();

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Releasenotes(args) => args.execute(),
        Commands::Triage(args) => args.execute(),
        Commands::InitConfig(args) => args.execute(),
        Commands::Schema => commands::schema::run_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
