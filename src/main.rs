//! JSON API server.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                     API SERVER                       │
//!                  │                                                      │
//!   Request        │  ┌────────────┐   ┌────────────┐   ┌──────────────┐  │
//!   ───────────────┼─▶│ request id │──▶│  extract   │──▶│   handler    │  │
//!                  │  │  + trace   │   │ (decoder)  │   │              │  │
//!                  │  └────────────┘   └─────┬──────┘   └──────┬───────┘  │
//!                  │                         │ 400             │          │
//!                  │                         ▼                 ▼          │
//!   Response       │                   ┌────────────┐   ┌──────────────┐  │
//!   ◀──────────────┼───────────────────│   error    │──▶│   encoder    │  │
//!                  │                   │ responder  │   │  (envelope)  │  │
//!                  │                   └────────────┘   └──────────────┘  │
//!                  │                                                      │
//!                  │   config · logger handle · metrics · panic recovery  │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use json_boundary::config::{self, ApiConfig, ConfigError, Environment};
use json_boundary::observability::{metrics, Logger};
use json_boundary::ApiServer;

#[derive(Parser)]
#[command(name = "json-boundary")]
#[command(version, about = "JSON API server", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API server port (overrides the configured bind address port)
    #[arg(long)]
    port: Option<u16>,

    /// Environment (development|staging|production)
    #[arg(long)]
    env: Option<Environment>,

    /// Maximum JSON request body size in bytes
    #[arg(long)]
    max_body_bytes: Option<usize>,
}

impl Cli {
    fn load(&self) -> Result<ApiConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => ApiConfig::default(),
        };

        if let Some(port) = self.port {
            let mut addr: SocketAddr = config
                .listener
                .bind_address
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));
            addr.set_port(port);
            config.listener.bind_address = addr.to_string();
        }
        if let Some(env) = self.env {
            config.env = env;
        }
        if let Some(max_body_bytes) = self.max_body_bytes {
            config.limits.max_body_bytes = max_body_bytes;
        }

        config::validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    let logger = Logger::from_config(&config.observability)?;
    logger.install_global()?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        env = %config.env,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let server = ApiServer::new(config, logger);
    server.run(listener).await?;

    Ok(())
}
