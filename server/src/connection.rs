use crate::error::RoomError;
use crate::registry::SessionRegistry;
use crate::room::{Outbound, PhaseKind, Room};
use log::{debug, info, warn};
use shared::{Packet, PlayerId, RoomId, Slot};
use std::sync::Arc;

/// Per-connection adapter between inbound intents and the player's room.
///
/// Holds only a handle to the room and the seat number; all state changes go
/// through the room's own methods.
pub struct Connection {
    player_id: PlayerId,
    slot: Slot,
    room: Arc<Room>,
    registry: Arc<SessionRegistry>,
}

impl Connection {
    /// Places the player through matchmaking.
    pub async fn open(
        registry: Arc<SessionRegistry>,
        player_id: PlayerId,
        outbound: Outbound,
    ) -> Result<Self, RoomError> {
        let (room, slot) = registry.assign(player_id, outbound).await?;
        Ok(Self {
            player_id,
            slot,
            room,
            registry,
        })
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn room_id(&self) -> RoomId {
        self.room.id()
    }

    /// Applies one inbound packet. Returns false when the client asked to
    /// disconnect.
    pub async fn handle_packet(&self, packet: Packet) -> bool {
        let result = match packet {
            Packet::Ready => self.room.set_ready(self.player_id).await,
            Packet::PaddleMove { y } => self
                .room
                .set_paddle_position(self.player_id, y)
                .await
                .map(|_| ()),
            Packet::Disconnect => return false,
            other => {
                warn!(
                    "Unexpected packet from player {}: {:?}",
                    self.player_id, other
                );
                Ok(())
            }
        };

        if let Err(e) = result {
            // Only happens when an intent races the player's own departure.
            warn!("Dropping intent from player {}: {}", self.player_id, e);
        }
        true
    }

    /// Leaves the room and releases it right away if nobody is left and the
    /// match never finished.
    pub async fn disconnect(self) {
        let room_id = self.room.id();

        match self.room.leave(self.player_id).await {
            Ok(summary) if summary.occupants == 0 && summary.phase != PhaseKind::Ended => {
                self.registry.release(room_id).await;
            }
            Ok(summary) => {
                debug!(
                    "Room {} keeps {} player(s) after player {} left",
                    room_id, summary.occupants, self.player_id
                );
            }
            Err(e) => warn!("Player {} could not leave cleanly: {}", self.player_id, e),
        }

        info!("Player {} disconnected from room {}", self.player_id, room_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn registry() -> Arc<SessionRegistry> {
        SessionRegistry::new(&ServerConfig {
            grace_period: Duration::from_millis(200),
            ..ServerConfig::default()
        })
    }

    #[tokio::test]
    async fn test_open_reports_seat() {
        let registry = registry();
        let (tx1, mut rx1) = mpsc::channel(64);
        let (tx2, _rx2) = mpsc::channel(64);

        let first = Connection::open(Arc::clone(&registry), 1, tx1).await.unwrap();
        let second = Connection::open(Arc::clone(&registry), 2, tx2).await.unwrap();

        assert_eq!(first.slot(), Slot::One);
        assert_eq!(second.slot(), Slot::Two);
        assert_eq!(first.room_id(), second.room_id());
        assert_eq!(first.player_id(), 1);
        assert_eq!(
            rx1.recv().await,
            Some(Packet::PlayerJoined {
                identity: 1,
                slot: Slot::One
            })
        );
    }

    #[tokio::test]
    async fn test_intents_reach_the_room() {
        let registry = registry();
        let (tx1, _rx1) = mpsc::channel(64);
        let (tx2, _rx2) = mpsc::channel(64);
        let first = Connection::open(Arc::clone(&registry), 1, tx1).await.unwrap();
        let second = Connection::open(Arc::clone(&registry), 2, tx2).await.unwrap();

        assert!(first.handle_packet(Packet::PaddleMove { y: -5.0 }).await);
        assert!(first.handle_packet(Packet::Ready).await);
        assert!(second.handle_packet(Packet::Ready).await);
        assert!(first.handle_packet(Packet::WaitingForPlayer).await);

        let room = registry.get(first.room_id()).await.unwrap();
        assert_eq!(room.phase().await, PhaseKind::Active);
        assert_eq!(room.snapshot().await.slot1.unwrap().paddle_y, 0.0);

        assert!(!first.handle_packet(Packet::Disconnect).await);
    }

    #[tokio::test]
    async fn test_last_player_out_releases_room() {
        let registry = registry();
        let (tx, _rx) = mpsc::channel(64);
        let connection = Connection::open(Arc::clone(&registry), 1, tx).await.unwrap();

        connection.disconnect().await;

        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_forfeit_keeps_room_for_grace_period() {
        let registry = registry();
        let (tx1, _rx1) = mpsc::channel(64);
        let (tx2, mut rx2) = mpsc::channel(256);
        let first = Connection::open(Arc::clone(&registry), 1, tx1).await.unwrap();
        let second = Connection::open(Arc::clone(&registry), 2, tx2).await.unwrap();
        first.handle_packet(Packet::Ready).await;
        second.handle_packet(Packet::Ready).await;

        first.disconnect().await;

        let room = registry.get(second.room_id()).await.unwrap();
        assert_eq!(room.phase().await, PhaseKind::Ended);

        let mut ended = None;
        while let Ok(packet) = rx2.try_recv() {
            if let Packet::GameEnded { winner } = packet {
                ended = Some(winner);
            }
        }
        assert_eq!(ended, Some(2));

        second.disconnect().await;
        assert_eq!(registry.len().await, 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(registry.is_empty().await);
    }
}
