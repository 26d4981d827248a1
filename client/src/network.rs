use crate::game::ClientGameState;
use log::{debug, info, warn};
use shared::{read_packet, write_packet, GameConfig, Packet, PlayerId, PROTOCOL_VERSION};
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{interval, sleep, MissedTickBehavior};

pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// How one connection to the server ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Won,
    Lost { winner: PlayerId },
    /// The server sent `Disconnected` before a winner was known.
    Refused { reason: String },
    /// The connection closed without a result.
    Dropped,
}

/// Headless player: joins a room, readies up and tracks the ball with its
/// paddle until the match is decided.
pub struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    game_state: ClientGameState,
    fake_ping_ms: u64,
    tick: Duration,
}

impl Client {
    pub async fn connect(server_addr: &str, fake_ping_ms: u64) -> Result<Self, ClientError> {
        info!("Connecting to server at {}...", server_addr);
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        let config = GameConfig::default();
        let mut client = Client {
            reader,
            writer,
            game_state: ClientGameState::new(config),
            fake_ping_ms,
            tick: config.tick_interval(),
        };

        client
            .send_packet(&Packet::Connect {
                client_version: PROTOCOL_VERSION,
            })
            .await?;
        Ok(client)
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    async fn send_packet(&mut self, packet: &Packet) -> Result<(), ClientError> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        write_packet(&mut self.writer, packet).await?;
        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<(), ClientError> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        if let Packet::Disconnected { reason } = &packet {
            warn!("Disconnected: {}", reason);
        }

        if let Some(reply) = self.game_state.apply_packet(&packet) {
            self.send_packet(&reply).await?;
        }
        Ok(())
    }

    /// Plays until the server reports a result or closes the connection.
    pub async fn run(&mut self) -> Result<MatchResult, ClientError> {
        let mut move_interval = interval(self.tick);
        move_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let dt = self.tick.as_secs_f32();

        while !self.game_state.is_finished() {
            tokio::select! {
                result = read_packet(&mut self.reader) => match result? {
                    Some(packet) => self.handle_packet(packet).await?,
                    None => {
                        debug!("Server closed the connection");
                        break;
                    }
                },

                _ = move_interval.tick() => {
                    if let Some(y) = self.game_state.next_paddle_target(dt) {
                        self.send_packet(&Packet::PaddleMove { y }).await?;
                    }
                },
            }
        }

        let result = self.result();
        if result == MatchResult::Dropped {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }
        Ok(result)
    }

    fn result(&self) -> MatchResult {
        let state = &self.game_state;
        match (state.winner(), state.disconnect_reason()) {
            (Some(_), _) if state.won() => MatchResult::Won,
            (Some(winner), _) => MatchResult::Lost { winner },
            (None, Some(reason)) => MatchResult::Refused {
                reason: reason.to_string(),
            },
            (None, None) => MatchResult::Dropped,
        }
    }
}
