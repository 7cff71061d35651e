use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;
use shared::SERVER_PORT;

/// Authoritative UDP server for two-player dogfights
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to bind to
    #[arg(short = 'H', long, env = "DOGFIGHT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// UDP port to listen on
    #[arg(short, long, env = "DOGFIGHT_PORT", default_value_t = SERVER_PORT)]
    port: u16,

    /// Simulation steps per second
    #[arg(short, long, env = "DOGFIGHT_TICK_RATE", default_value = "10")]
    tick_rate: u32,

    /// GAME_STATE broadcasts per second
    #[arg(short, long, env = "DOGFIGHT_BROADCAST_RATE", default_value = "20")]
    broadcast_rate: u32,

    /// Seconds of silence before a player is dropped
    #[arg(long, env = "DOGFIGHT_TIMEOUT", default_value = "5")]
    timeout: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::from_parts(
        &args.host,
        args.port,
        args.tick_rate,
        args.broadcast_rate,
        args.timeout,
    )?;

    info!("Starting dogfight server...");
    let mut server = Server::new(config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
