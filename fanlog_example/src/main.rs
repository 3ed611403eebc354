use anyhow::Result;
use clap::Parser;
use fanlog::{LoggerConfig, Registry};
use std::path::PathBuf;
use tracing::info;

mod logging_demo;

#[derive(Parser)]
#[command(name = "basic_example")]
#[command(about = "Routes sample log calls through a fanlog registry")]
struct Cli {
    /// TOML configuration file; a console-only registry is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the global threshold from the configuration
    #[arg(short, long)]
    level: Option<String>,

    /// Number of sample rounds to emit
    #[arg(short, long, default_value_t = 1)]
    rounds: u32,

    /// Show the registry's own diagnostics (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => {
            info!("Loading logger configuration from {:?}", path);
            LoggerConfig::from_file(path)?
        }
        None => logging_demo::default_config(),
    };

    let registry = config.build()?;
    if let Some(level) = &cli.level {
        registry.set_level(level.parse()?);
    }
    let registry = fanlog::init_global(registry)?;

    for round in 0..cli.rounds {
        logging_demo::emit_samples(&registry, round)?;
    }

    logging_demo::print_hook_statistics(&registry);
    shutdown(&registry)
}

/// Initialize tracing subscriber for the registry's own diagnostics
fn init_tracing(verbose: u8) -> Result<()> {
    let default_filter = match verbose {
        0 => "warn",
        1 => "fanlog=debug",
        _ => "fanlog=trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

fn shutdown(registry: &Registry) -> Result<()> {
    registry.flush()?;
    registry.close()?;
    info!("Registry closed");
    Ok(())
}
