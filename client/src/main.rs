use clap::Parser;
use client::network::{Client, MatchResult};
use env_logger::Env;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Number of matches to play before exiting
    #[arg(short = 'g', long, default_value = "1")]
    games: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Starting client...");
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let mut wins = 0;
    for game in 1..=args.games {
        let mut client = Client::connect(&args.server, args.fake_ping).await?;
        let result = client.run().await?;

        match &result {
            MatchResult::Won => {
                wins += 1;
                info!("Game {}: won", game);
            }
            MatchResult::Lost { winner } => info!("Game {}: lost to player {}", game, winner),
            MatchResult::Refused { reason } => {
                info!("Game {}: server refused ({})", game, reason);
                break;
            }
            MatchResult::Dropped => {
                info!("Game {}: connection dropped", game);
                break;
            }
        }
    }

    info!("Won {} of {} game(s)", wins, args.games);
    Ok(())
}
