use crate::room::RoomSettings;
use shared::GameConfig;
use std::time::Duration;

/// Runtime settings for the session server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub game: GameConfig,
    /// How long an ended room lingers so slow clients still see the result.
    pub grace_period: Duration,
    pub sweep_interval: Duration,
    pub max_rooms: usize,
    /// Packets buffered per connection before broadcasts start dropping.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            game: GameConfig::default(),
            grace_period: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(30),
            max_rooms: 1024,
            outbound_buffer: 64,
        }
    }
}

impl ServerConfig {
    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            game: self.game,
            grace_period: self.grace_period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_settings_follow_server_config() {
        let config = ServerConfig {
            grace_period: Duration::from_millis(250),
            game: GameConfig {
                winning_score: 3,
                ..GameConfig::default()
            },
            ..ServerConfig::default()
        };

        let settings = config.room_settings();

        assert_eq!(settings.grace_period, Duration::from_millis(250));
        assert_eq!(settings.game.winning_score, 3);
    }
}
