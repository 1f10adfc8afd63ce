use crate::registry::ConnectionRegistry;
use crate::room::room_directory::RoomDirectory;
use crate::signaling::SignalingOutput;
use huddle_core::{ConnectionId, MemberPresence, RoomId, ServerMessage};
use tracing::{debug, warn};

/// Pushes the full member list of a room to every member.
///
/// Lists are rebuilt from the registry and directory on every call; nothing
/// is cached between publishes.
#[derive(Debug, Default)]
pub struct PresenceBroadcaster {
    dropped_members: u64,
}

impl PresenceBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the room's members in join order.
    ///
    /// Ids that do not resolve to a connection currently in this room are
    /// left out and counted.
    pub fn members(
        &mut self,
        registry: &ConnectionRegistry,
        directory: &RoomDirectory,
        room_id: &RoomId,
    ) -> Vec<MemberPresence> {
        directory
            .members_of(room_id)
            .iter()
            .filter_map(|id| match registry.get(id) {
                Some(connection) if connection.is_in(room_id) => Some(connection.presence()),
                _ => {
                    self.dropped_members += 1;
                    warn!("Dropping unresolved member {} from presence of room {}", id, room_id);
                    None
                }
            })
            .collect()
    }

    /// Delivers `presence-updated` to every resolved member. Returns the
    /// number of recipients.
    pub async fn publish(
        &mut self,
        registry: &ConnectionRegistry,
        directory: &RoomDirectory,
        output: &dyn SignalingOutput,
        room_id: &RoomId,
    ) -> usize {
        let members = self.members(registry, directory, room_id);
        let recipients: Vec<ConnectionId> = members.iter().map(|m| m.id.clone()).collect();

        debug!("Publishing presence of room {} to {} members", room_id, recipients.len());

        for id in &recipients {
            output
                .deliver(
                    id,
                    ServerMessage::PresenceUpdated {
                        room_id: room_id.clone(),
                        members: members.clone(),
                    },
                )
                .await;
        }

        recipients.len()
    }

    /// Total member ids dropped because they failed to resolve.
    pub fn dropped_members(&self) -> u64 {
        self.dropped_members
    }
}
