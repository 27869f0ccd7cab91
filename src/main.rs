use clap::Parser;
use statarb::cli::{Cli, Commands, DataSourceConfig};
use statarb::commands;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the --verbose level applies globally.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.verbose));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Scan {
            data,
            symbols,
            bars,
            synthetic,
            config,
            output_dir,
        } => {
            let resolved =
                DataSourceConfig::resolve(data, &symbols, bars, synthetic, config, output_dir)?;
            commands::run_scan(resolved)?;
        }
        Commands::Run {
            data,
            symbols,
            bars,
            synthetic,
            config,
            output_dir,
        } => {
            let resolved =
                DataSourceConfig::resolve(data, &symbols, bars, synthetic, config, output_dir)?;
            commands::run_pipeline(resolved)?;
        }
    }

    Ok(())
}
