use shared::{PlayerId, RoomId};

/// Room-scoped failures. None of these are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("player {identity} is not seated in room {room_id}")]
    UnknownIdentity { room_id: RoomId, identity: PlayerId },

    #[error("server is at its limit of {0} rooms")]
    Capacity(usize),
}
