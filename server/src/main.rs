use clap::Parser;
use log::{error, info};
use server::config::Config;
use server::network::Server;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long)]
    host: Option<String>,
    /// Server port to listen on, TCP and UDP
    #[clap(short, long)]
    port: Option<u16>,
    /// Configuration file; defaults are used if it doesn't exist
    #[clap(short, long, default_value = "server.toml")]
    config: PathBuf,
    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

/// Main-method of the application.
/// Parses command-line arguments, loads the configuration and runs the server until it stops or Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = Config::load(&args.config)?;
    if let Some(host) = args.host {
        config.network.host = host;
    }
    if let Some(port) = args.port {
        config.network.port = port;
    }

    let mut server = Server::new(&config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
