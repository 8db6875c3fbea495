//! gemrelay - Key-hiding relay for generative language endpoints
//!
//! Runs a small HTTP service that forwards frontend payloads to Gemini and
//! Imagen models with a server-side API key.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gemrelay::config::{Config, LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(name = "gemrelay")]
#[command(about = "Key-hiding relay for Gemini and Imagen endpoints")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration and show where the API key comes from
    Check {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Loading configuration from {}", path.display())),
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Report config warnings; called after the subscriber is installed.
fn log_config_warnings(cfg: &Config) {
    for warning in cfg.warnings() {
        tracing::warn!("{}", warning);
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("gemrelay={0},tower_http={0}", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let mut cfg = load_config(config.as_ref())?;
            init_tracing(&cfg.logging);
            log_config_warnings(&cfg);

            if let Some(path) = &config {
                tracing::info!(config = %path.display(), "Loaded configuration");
            }
            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                cfg.server.listen = addr;
            }
            tracing::info!(
                upstream = %cfg.upstream.base_url,
                key_source = %cfg.upstream.key_source(),
                "Upstream configured"
            );

            gemrelay::relay::run_server(cfg).await
        }

        Commands::Check { config } => {
            let cfg = load_config(config.as_ref())?;
            init_tracing(&cfg.logging);
            log_config_warnings(&cfg);

            println!("Configuration OK");
            println!("  listen:     {}", cfg.server.listen);
            println!("  path:       {}", cfg.server.path);
            println!(
                "  upstream:   {}/{}",
                cfg.upstream.base_url, cfg.upstream.api_version
            );
            println!("  key source: {}", cfg.upstream.key_source());
            Ok(())
        }
    }
}
