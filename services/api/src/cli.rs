use crate::demo::{run_demo, run_roster_import, DemoArgs, RosterImportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use training_nominations::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Training Nomination Desk",
    about = "Run the training nomination service or exercise it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Nominal roll utilities
    Roster {
        #[command(subcommand)]
        command: RosterCommand,
    },
    /// Walk a nomination from criteria to sealed print against a sample roll
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum RosterCommand {
    /// Validate a nominal roll CSV and report row-level rejections
    Import(RosterImportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Nominal roll CSV loaded into the staff directory before serving
    #[arg(long)]
    pub(crate) roster: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Roster {
            command: RosterCommand::Import(args),
        } => run_roster_import(args),
        Command::Demo(args) => run_demo(args),
    }
}
