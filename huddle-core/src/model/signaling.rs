use crate::model::connection::ConnectionId;
use crate::model::presence::{MemberPresence, NoiseSuppressionLevel, Role};
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The four kinds of peer-addressed negotiation traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayKind {
    OfferAnswer,
    Candidate,
    DirectControl,
    Voice,
}

impl RelayKind {
    /// Offers and answers are singular and worth confirming; the rest are not.
    pub fn acknowledges_sender(self) -> bool {
        matches!(self, RelayKind::OfferAnswer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayFailure {
    TargetNotFound,
    TargetDisconnected,
}

/// Frames accepted from clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join {
        room_id: RoomId,
        #[serde(default)]
        connection_id: Option<ConnectionId>,
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        role: Role,
    },
    Leave {
        room_id: RoomId,
    },
    SetSharing {
        room_id: RoomId,
        is_sharing: bool,
        #[serde(default)]
        has_audio: Option<bool>,
    },
    SetAudioStatus {
        is_muted: bool,
        #[serde(default)]
        has_audio: Option<bool>,
    },
    SetNoiseSuppression {
        level: NoiseSuppressionLevel,
    },
    RelayOfferAnswer {
        target_id: ConnectionId,
        payload: Value,
    },
    RelayCandidate {
        target_id: ConnectionId,
        payload: Value,
    },
    DirectControl {
        target_id: ConnectionId,
        payload: Value,
        #[serde(rename = "type")]
        control_type: String,
    },
    RelayVoice {
        target_id: ConnectionId,
        payload: Value,
    },
    RequestPresence {
        room_id: RoomId,
        #[serde(default)]
        broadcast: bool,
    },
    ChatMessage {
        room_id: RoomId,
        message: Value,
    },
}

impl ClientMessage {
    pub fn op(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Leave { .. } => "leave",
            ClientMessage::SetSharing { .. } => "set-sharing",
            ClientMessage::SetAudioStatus { .. } => "set-audio-status",
            ClientMessage::SetNoiseSuppression { .. } => "set-noise-suppression",
            ClientMessage::RelayOfferAnswer { .. } => "relay-offer-answer",
            ClientMessage::RelayCandidate { .. } => "relay-candidate",
            ClientMessage::DirectControl { .. } => "direct-control",
            ClientMessage::RelayVoice { .. } => "relay-voice",
            ClientMessage::RequestPresence { .. } => "request-presence",
            ClientMessage::ChatMessage { .. } => "chat-message",
        }
    }
}

/// Frames emitted to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ServerMessage {
    PresenceUpdated {
        room_id: RoomId,
        members: Vec<MemberPresence>,
    },
    RoomSnapshot {
        room_id: RoomId,
        members: Vec<MemberPresence>,
        self_id: ConnectionId,
        is_reconnect: bool,
    },
    ShareStarted {
        room_id: RoomId,
        user_id: ConnectionId,
        user_name: String,
        has_audio: bool,
    },
    ShareStopped {
        room_id: RoomId,
        user_id: ConnectionId,
        user_name: String,
    },
    RequestReconnect {
        share_user_id: ConnectionId,
        room_id: RoomId,
        timestamp: u64,
    },
    /// `id` duplicates `sender_id` for older clients.
    RelayOfferAnswer {
        sender_id: ConnectionId,
        id: ConnectionId,
        payload: Value,
        timestamp: u64,
    },
    RelayCandidate {
        sender_id: ConnectionId,
        id: ConnectionId,
        payload: Value,
        timestamp: u64,
    },
    DirectControl {
        sender_id: ConnectionId,
        #[serde(rename = "type")]
        control_type: String,
        payload: Value,
        timestamp: u64,
    },
    RelayVoice {
        sender_id: ConnectionId,
        payload: Value,
        timestamp: u64,
    },
    Delivered {
        kind: RelayKind,
        target_id: ConnectionId,
    },
    RelayError {
        kind: RelayKind,
        target_id: ConnectionId,
        reason: RelayFailure,
    },
    NoiseSuppressionUpdated {
        level: NoiseSuppressionLevel,
    },
    ChatMessage {
        room_id: RoomId,
        sender_id: ConnectionId,
        message: Value,
    },
    RoomError {
        room_id: Option<RoomId>,
        message: String,
    },
    ValidationError {
        message: String,
    },
}

impl ServerMessage {
    /// Wire name of the frame, used in logs.
    pub fn op(&self) -> &'static str {
        match self {
            ServerMessage::PresenceUpdated { .. } => "presence-updated",
            ServerMessage::RoomSnapshot { .. } => "room-snapshot",
            ServerMessage::ShareStarted { .. } => "share-started",
            ServerMessage::ShareStopped { .. } => "share-stopped",
            ServerMessage::RequestReconnect { .. } => "request-reconnect",
            ServerMessage::RelayOfferAnswer { .. } => "relay-offer-answer",
            ServerMessage::RelayCandidate { .. } => "relay-candidate",
            ServerMessage::DirectControl { .. } => "direct-control",
            ServerMessage::RelayVoice { .. } => "relay-voice",
            ServerMessage::Delivered { .. } => "delivered",
            ServerMessage::RelayError { .. } => "relay-error",
            ServerMessage::NoiseSuppressionUpdated { .. } => "noise-suppression-updated",
            ServerMessage::ChatMessage { .. } => "chat-message",
            ServerMessage::RoomError { .. } => "room-error",
            ServerMessage::ValidationError { .. } => "validation-error",
        }
    }
}
