//! Runs a chat relay until Ctrl-C.
//!
//!   chatrelay-server --bind 0.0.0.0 --port 8005 --max-clients 10

use anyhow::{Context, Result};
use chatrelay::{ChatServer, ServerConfig};
use chatrelay_cli::init_logging;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "chatrelay-server", about = "Multi-client TCP chat relay")]
struct Cli {
    /// Interface to listen on
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8005)]
    port: u16,

    /// Maximum number of registered clients
    #[arg(short, long, default_value_t = 5)]
    max_clients: usize,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_host: self.bind.clone(),
            bind_port: self.port,
            max_clients: self.max_clients,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log)?;

    let server = ChatServer::builder()
        .config(cli.server_config())
        .build()
        .await
        .context("failed to start server")?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Ctrl-C received, shutting down");
        })
        .await?;
    Ok(())
}
