use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use visitlog_config::{AppConfig, ConfigLoader};

#[derive(Parser)]
#[command(
    name = "visitlog",
    version,
    about = "visitlog - file visit telemetry ingest service"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory holding config.yml or config.toml
    #[arg(long, env = "VISITLOG_CONFIG_DIR", global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ingest server
    Start {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// SQLite database file
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Check whether a running server is alive
    Status,

    /// Purge visits longer than a threshold on a running server
    Cleanup {
        /// Threshold in minutes (server default: 1440)
        #[arg(long)]
        threshold_in_min: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };
    let mut config = config_loader.load()?;

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();
    // load() ran before the subscriber existed, so report its choice here
    if config_loader.config_file_exists() {
        info!("config loaded from {}", config_loader.config_dir().display());
    } else {
        info!(
            "no config file in {}, using defaults",
            config_loader.config_dir().display()
        );
    }

    match cli.command {
        Commands::Start {
            host,
            port,
            db_path,
        } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(db_path) = db_path {
                config.database.path = db_path;
            }

            info!("using database {}", config.database.path.display());

            let server = visitlog_gateway::GatewayServer::new(config);
            server.run().await?;
        }
        Commands::Status => {
            let base = client_base_url(&config);
            let resp = reqwest::get(format!("{base}/status"))
                .await
                .map_err(|_| anyhow::anyhow!("visitlog is not running at {base}"))?;

            let body = resp.json::<serde_json::Value>().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Commands::Cleanup { threshold_in_min } => {
            let base = client_base_url(&config);
            let url = match threshold_in_min {
                Some(minutes) => format!("{base}/cleanup?threshold_in_min={minutes}"),
                None => format!("{base}/cleanup"),
            };

            let resp = reqwest::Client::new()
                .delete(url)
                .send()
                .await
                .map_err(|_| anyhow::anyhow!("visitlog is not running at {base}"))?;

            let status = resp.status();
            let body = resp.json::<serde_json::Value>().await?;
            if !status.is_success() {
                anyhow::bail!("cleanup failed ({status}): {}", body["detail"]);
            }
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

/// Address a local client should dial; a wildcard bind is reached via loopback.
fn client_base_url(config: &AppConfig) -> String {
    let host = match config.gateway.host.as_str() {
        "0.0.0.0" | "::" => "127.0.0.1",
        other => other,
    };
    format!("http://{}:{}", host, config.gateway.port)
}
