use clap::Parser;
use env_logger::Env;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use shared::GameConfig;
use std::time::Duration;

/// Authoritative two-player Pong session server.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "3000")]
    port: u16,
    /// Simulation ticks per second in each active room
    #[clap(short, long, default_value = "60")]
    tick_rate: u32,
    /// Points needed to win a match
    #[clap(short, long, default_value = "5")]
    winning_score: u32,
    /// Seconds an ended room lingers before it is released
    #[clap(long, default_value = "10")]
    grace_secs: u64,
    /// Seconds between sweeps for abandoned rooms
    #[clap(long, default_value = "30")]
    sweep_secs: u64,
    /// Maximum number of rooms alive at once
    #[clap(long, default_value = "1024")]
    max_rooms: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        game: GameConfig {
            tick_rate: args.tick_rate.max(1),
            winning_score: args.winning_score.max(1),
            ..GameConfig::default()
        },
        grace_period: Duration::from_secs(args.grace_secs),
        sweep_interval: Duration::from_secs(args.sweep_secs.max(1)),
        max_rooms: args.max_rooms,
        ..ServerConfig::default()
    };

    info!(
        "Starting server on {} ({} Hz, first to {})",
        config.bind_addr, config.game.tick_rate, config.game.winning_score
    );
    let addr = config.bind_addr.clone();
    let server = Server::new(&addr, config).await?;

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
