use huddle_core::{ConnectionId, RelayFailure, RelayKind, RoomId, ServerMessage};
use thiserror::Error;

/// Addressing failures of a peer-to-peer relay. Reported to the sender only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Target {0} not found")]
    TargetNotFound(ConnectionId),

    #[error("Target {0} is not connected")]
    TargetDisconnected(ConnectionId),
}

impl RelayError {
    pub fn failure(&self) -> RelayFailure {
        match self {
            RelayError::TargetNotFound(_) => RelayFailure::TargetNotFound,
            RelayError::TargetDisconnected(_) => RelayFailure::TargetDisconnected,
        }
    }

    pub fn target_id(&self) -> &ConnectionId {
        match self {
            RelayError::TargetNotFound(id) | RelayError::TargetDisconnected(id) => id,
        }
    }

    pub fn to_message(&self, kind: RelayKind) -> ServerMessage {
        ServerMessage::RelayError {
            kind,
            target_id: self.target_id().clone(),
            reason: self.failure(),
        }
    }
}

/// A request that was rejected before any state changed.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Room id must not be empty")]
    EmptyRoomId,

    #[error("Connection {connection_id} is not a member of room {room_id}")]
    NotInRoom {
        connection_id: ConnectionId,
        room_id: RoomId,
    },

    #[error("Join declared connection id {declared}, but this session is {actual}")]
    ConnectionIdMismatch {
        declared: ConnectionId,
        actual: ConnectionId,
    },

    #[error("Malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl RequestError {
    pub fn to_message(&self) -> ServerMessage {
        match self {
            RequestError::EmptyRoomId => ServerMessage::RoomError {
                room_id: None,
                message: self.to_string(),
            },
            RequestError::NotInRoom { room_id, .. } => ServerMessage::RoomError {
                room_id: Some(room_id.clone()),
                message: self.to_string(),
            },
            RequestError::ConnectionIdMismatch { .. } | RequestError::Malformed(_) => {
                ServerMessage::ValidationError {
                    message: self.to_string(),
                }
            }
        }
    }
}
