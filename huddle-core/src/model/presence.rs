use crate::model::connection::ConnectionId;
use serde::{Deserialize, Serialize};

/// Role chosen at join time. Never changes for the rest of the session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    #[default]
    Guest,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseSuppressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Publicly visible attributes of one room member.
///
/// Noise suppression is deliberately absent: it is acknowledged only to the
/// connection that set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPresence {
    pub id: ConnectionId,
    pub display_name: String,
    pub role: Role,
    pub is_sharing: bool,
    pub is_muted: bool,
    pub has_audio: bool,
}
