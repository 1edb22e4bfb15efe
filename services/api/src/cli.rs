use crate::commands::{run_schema, run_submit, SchemaArgs, SubmitArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use inspection_ai::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Inspection Report Service",
    about = "Submit equipment inspections (API 510 / 570 / 653) and serve the inspection API",
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
    /// Print the form fields declared for each inspection variant
    Schema(SchemaArgs),
    /// Validate, generate and store a report for a recorded inspection
    Submit(SubmitArgs),
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
        Command::Schema(args) => run_schema(args),
        Command::Submit(args) => run_submit(args).await,
    }
}
