//! GlassScore CLI entry point.

use clap::Parser;

use glassscore::cli::{commands, handle_error, Cli, Commands};
use glassscore::infrastructure::logging::{LogConfig, LoggerImpl};
use glassscore::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => handle_error(err),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err),
    };

    let result = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::execute(args, &config).await,
        Commands::Config => commands::config::execute(&config),
    };

    if let Err(err) = result {
        handle_error(err);
    }
}
