//! Process-wide table of rooms and the matchmaking that fills them.
//!
//! The registry decides which room a newly connected player lands in,
//! creates rooms on demand and removes them again:
//! - immediately, when the last player leaves before the match ended
//! - after a grace period, once a match has ended
//! - from the periodic sweep, for rooms nobody cleaned up
//!
//! Lock order is always registry table first, then a room. Rooms never take
//! the table lock while holding their own.

use crate::config::ServerConfig;
use crate::error::RoomError;
use crate::room::{Outbound, PhaseKind, Room, RoomSettings};
use log::{debug, info};
use shared::{PlayerId, RoomId, Slot};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};

struct RoomTable {
    rooms: HashMap<RoomId, Arc<Room>>,
    next_room_id: RoomId,
}

impl RoomTable {
    /// Room ids in ascending order, the deterministic matchmaking order.
    fn sorted_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

pub struct SessionRegistry {
    table: RwLock<RoomTable>,
    settings: RoomSettings,
    sweep_interval: Duration,
    max_rooms: usize,
}

impl SessionRegistry {
    pub fn new(config: &ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            table: RwLock::new(RoomTable {
                rooms: HashMap::new(),
                next_room_id: 1,
            }),
            settings: config.room_settings(),
            sweep_interval: config.sweep_interval,
            max_rooms: config.max_rooms,
        })
    }

    /// Seats `identity` in the oldest room with a lone waiting player, or in
    /// slot one of a brand new room.
    pub async fn assign(
        self: &Arc<Self>,
        identity: PlayerId,
        outbound: Outbound,
    ) -> Result<(Arc<Room>, Slot), RoomError> {
        let mut table = self.table.write().await;

        for id in table.sorted_ids() {
            let Some(room) = table.rooms.get(&id).cloned() else {
                continue;
            };
            if !room.summary().await.is_open() {
                continue;
            }

            match room.join(identity, outbound.clone()).await {
                Ok(slot) => return Ok((room, slot)),
                Err(RoomError::RoomFull(id)) => {
                    debug!("Room {} filled up before player {} could join", id, identity);
                }
                Err(e) => return Err(e),
            }
        }

        if table.rooms.len() >= self.max_rooms {
            return Err(RoomError::Capacity(self.max_rooms));
        }

        let room_id = table.next_room_id;
        table.next_room_id += 1;

        let room = Room::new(room_id, self.settings.clone(), Arc::downgrade(self));
        let slot = room.join(identity, outbound).await?;
        table.rooms.insert(room_id, Arc::clone(&room));
        info!("Created room {} for player {}", room_id, identity);

        Ok((room, slot))
    }

    /// Removes a room. Returns false if it was already gone.
    pub async fn release(&self, room_id: RoomId) -> bool {
        let removed = self.table.write().await.rooms.remove(&room_id).is_some();
        if removed {
            info!("Released room {}", room_id);
        }
        removed
    }

    pub fn schedule_release(self: &Arc<Self>, room_id: RoomId, delay: Duration) {
        let registry = Arc::downgrade(self);
        debug!("Room {} will be released in {:?}", room_id, delay);

        tokio::spawn(async move {
            sleep(delay).await;
            if let Some(registry) = registry.upgrade() {
                registry.release(room_id).await;
            }
        });
    }

    pub async fn get(&self, room_id: RoomId) -> Option<Arc<Room>> {
        self.table.read().await.rooms.get(&room_id).cloned()
    }

    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.table.read().await.sorted_ids()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rooms.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rooms.is_empty()
    }

    /// Removes empty rooms and rooms whose lone player has waited a full
    /// sweep interval for an opponent. Returns the removed ids.
    pub async fn sweep(&self) -> Vec<RoomId> {
        let mut table = self.table.write().await;
        let mut removed = Vec::new();

        for id in table.sorted_ids() {
            let Some(room) = table.rooms.get(&id) else {
                continue;
            };
            let summary = room.summary().await;

            if summary.occupants == 0 {
                removed.push(id);
            } else if summary.phase == PhaseKind::Waiting
                && summary
                    .waiting_since
                    .is_some_and(|since| since.elapsed() >= self.sweep_interval)
            {
                room.close("No opponent found").await;
                removed.push(id);
            }
        }

        for id in &removed {
            table.rooms.remove(id);
        }
        if !removed.is_empty() {
            info!("Swept {} room(s): {:?}", removed.len(), removed);
        }

        removed
    }

    /// Runs [`sweep`](Self::sweep) every sweep interval until the registry
    /// is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        let period = self.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.sweep().await;
            }
        })
    }
}
