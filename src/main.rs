use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use cnb_rates::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display exchange rates for the given currency codes
    Rates {
        /// Currency codes, e.g. EUR USD (defaults to the configured list)
        currencies: Vec<String>,

        /// Print rates as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => cnb_rates::cli::setup::setup(),
        Some(Commands::Rates { currencies, json }) => {
            cnb_rates::run_command(
                cnb_rates::AppCommand::Rates { currencies, json },
                cli.config_path.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
