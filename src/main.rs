use clap::Parser;
use tracing::error;

use arbcore::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => arbcore::cli::run::execute(&cli.config, cli.log_level.as_deref(), cli.dry_run, args).await,
        Commands::Check => arbcore::cli::check::execute(&cli.config),
    };

    if let Err(e) = result {
        error!(error = %e, "arbcore exited with error");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
