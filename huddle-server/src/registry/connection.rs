use huddle_core::{ConnectionId, MemberPresence, NoiseSuppressionLevel, Role, RoomId};

/// Server-side record of one live client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    /// Transport session that last joined under this id.
    pub session: u64,
    pub display_name: String,
    pub room_id: Option<RoomId>,
    pub role: Role,
    pub is_sharing: bool,
    pub has_audio: bool,
    pub is_muted: bool,
    pub noise_suppression_level: NoiseSuppressionLevel,
}

impl Connection {
    pub fn new(id: ConnectionId, session: u64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            session,
            display_name: display_name.into(),
            room_id: None,
            role: Role::default(),
            is_sharing: false,
            has_audio: false,
            is_muted: false,
            noise_suppression_level: NoiseSuppressionLevel::default(),
        }
    }

    pub fn is_in(&self, room_id: &RoomId) -> bool {
        self.room_id.as_ref() == Some(room_id)
    }

    pub fn presence(&self) -> MemberPresence {
        MemberPresence {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            is_sharing: self.is_sharing,
            is_muted: self.is_muted,
            has_audio: self.has_audio,
        }
    }
}

/// A partial update of the owner-mutable attributes. `None` leaves a field
/// untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeUpdate {
    pub is_sharing: Option<bool>,
    pub has_audio: Option<bool>,
    pub is_muted: Option<bool>,
    pub noise_suppression_level: Option<NoiseSuppressionLevel>,
}

impl AttributeUpdate {
    pub(crate) fn apply(self, connection: &mut Connection) {
        if let Some(v) = self.is_sharing {
            connection.is_sharing = v;
        }
        if let Some(v) = self.has_audio {
            connection.has_audio = v;
        }
        if let Some(v) = self.is_muted {
            connection.is_muted = v;
        }
        if let Some(v) = self.noise_suppression_level {
            connection.noise_suppression_level = v;
        }
    }
}
