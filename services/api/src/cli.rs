use crate::batch::{run_batch, run_models, BatchArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use decision_desk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Decision Desk",
    about = "Validate scenarios and request decisions from remote decision models",
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
    /// List the models available to the configured API key
    Models,
    /// Validate a CSV of scenarios and submit the clean rows as one batch
    Batch(BatchArgs),
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
        Command::Models => run_models().await,
        Command::Batch(args) => run_batch(args).await,
    }
}
