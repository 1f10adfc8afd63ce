use crate::registry::ConnectionRegistry;
use crate::room::room_directory::RoomDirectory;
use crate::signaling::SignalingOutput;
use huddle_core::{ConnectionId, RoomId, ServerMessage, now_millis};
use tracing::debug;

/// Prompts clients to renegotiate peer connections when a share begins.
///
/// Fire-and-forget: nothing is awaited back from clients and nothing is
/// retried.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconnectCoordinator;

impl ReconnectCoordinator {
    /// Sends `request-reconnect` to every other connected member of the room.
    /// Returns the number of instructions sent.
    pub async fn notify_peers_of_share_start(
        &self,
        directory: &RoomDirectory,
        output: &dyn SignalingOutput,
        room_id: &RoomId,
        sharing_id: &ConnectionId,
    ) -> usize {
        let timestamp = now_millis();
        let mut sent = 0;

        for member in directory.members_of(room_id) {
            if &member == sharing_id || !output.is_connected(&member) {
                continue;
            }
            output
                .deliver(
                    &member,
                    ServerMessage::RequestReconnect {
                        share_user_id: sharing_id.clone(),
                        room_id: room_id.clone(),
                        timestamp,
                    },
                )
                .await;
            sent += 1;
        }

        debug!(
            "Asked {} members of room {} to reconnect to {}",
            sent, room_id, sharing_id
        );
        sent
    }

    /// Replays `share-started` for every member already sharing, to the
    /// rejoining connection only.
    pub async fn replay_active_shares(
        &self,
        registry: &ConnectionRegistry,
        directory: &RoomDirectory,
        output: &dyn SignalingOutput,
        room_id: &RoomId,
        rejoining_id: &ConnectionId,
    ) -> usize {
        let mut replayed = 0;

        for member in directory.members_of(room_id) {
            if &member == rejoining_id {
                continue;
            }
            let Some(connection) = registry.get(&member) else {
                continue;
            };
            if !connection.is_sharing {
                continue;
            }
            output
                .deliver(
                    rejoining_id,
                    ServerMessage::ShareStarted {
                        room_id: room_id.clone(),
                        user_id: connection.id.clone(),
                        user_name: connection.display_name.clone(),
                        has_audio: connection.has_audio,
                    },
                )
                .await;
            replayed += 1;
        }

        replayed
    }
}
