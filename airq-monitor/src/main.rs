use anyhow::bail;
use clap::Parser;

use cli::Commands;
use config::Config;

mod actions;
mod cli;
mod config;
mod run;
mod sensors;
mod telemetry;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let config = Config::load(&cli.config)?;
    let errors = config.validate();
    if !errors.is_empty() {
        bail!("invalid configuration: {}", errors.join("; "));
    }

    match cli.command {
        Commands::Info => actions::info(&config)?,
        Commands::Read { format } => actions::read(&config, format)?,
        Commands::Status { clear } => actions::status(&config, clear)?,
        Commands::Clean => actions::clean(&config)?,
        Commands::AutoClean { days } => actions::auto_clean(&config, days)?,
        Commands::Run { cycles } => run::run(&config, cycles)?,
    }
    Ok(())
}
