use clap::{Args, Parser, Subcommand};
use devtrack::error::AppError;

use crate::commands::{run_export, run_preview, ExportArgs, PreviewArgs};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "devtrack",
    about = "Track development units, reconcile spreadsheet edits, and audit every change",
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
    /// Write the portfolio (or one development) to an .xlsx or .csv file
    Export(ExportArgs),
    /// Reconcile a spreadsheet against the portfolio without applying it
    Preview(PreviewArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Export(args) => run_export(args),
        Command::Preview(args) => run_preview(args),
    }
}
