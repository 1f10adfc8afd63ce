use huddle_core::{ClientMessage, ConnectionId, Role, RoomId};
use huddle_server::RelayEngine;
use serde_json::Value;

use super::mock_signaling::MockSignalingOutput;

pub fn join_msg(room: &str, name: &str, role: Role) -> ClientMessage {
    ClientMessage::Join {
        room_id: RoomId::from(room),
        connection_id: None,
        display_name: Some(name.to_string()),
        role,
    }
}

/// Opens a transport session for `id` and joins `room`.
pub async fn connect_and_join(
    engine: &mut RelayEngine,
    output: &MockSignalingOutput,
    id: &str,
    room: &str,
    role: Role,
) -> ConnectionId {
    let connection_id = ConnectionId::from(id);
    let session = output.connect(&connection_id);
    engine
        .accept(&connection_id, session, join_msg(room, id, role))
        .await;
    connection_id
}

/// Transport drops the session and reports the close.
pub async fn disconnect(
    engine: &mut RelayEngine,
    output: &MockSignalingOutput,
    connection_id: &ConnectionId,
) {
    let session = output.session_of(connection_id);
    output.disconnect(connection_id);
    engine.connection_closed(connection_id, session).await;
}

pub async fn set_sharing(
    engine: &mut RelayEngine,
    output: &MockSignalingOutput,
    connection_id: &ConnectionId,
    room: &str,
    is_sharing: bool,
) {
    engine
        .accept(
            connection_id,
            output.session_of(connection_id),
            ClientMessage::SetSharing {
                room_id: RoomId::from(room),
                is_sharing,
                has_audio: None,
            },
        )
        .await;
}

pub fn offer(target: &ConnectionId, payload: Value) -> ClientMessage {
    ClientMessage::RelayOfferAnswer {
        target_id: target.clone(),
        payload,
    }
}

/// Every directory listing matches a registry record in that room, every
/// record in a room is listed there exactly once, and each connection is
/// listed in at most one room.
pub fn assert_consistent(engine: &RelayEngine) {
    let registry = engine.registry();
    let directory = engine.directory();

    for (room_id, members) in directory.rooms() {
        assert!(!members.is_empty(), "room {} persisted with no members", room_id);
        for id in members {
            let connection = registry
                .get(id)
                .unwrap_or_else(|| panic!("member {} of {} has no connection", id, room_id));
            assert_eq!(connection.room_id.as_ref(), Some(room_id));
        }
    }

    for connection in registry.iter() {
        if let Some(room_id) = &connection.room_id {
            let members = directory.members_of(room_id);
            let count = members.iter().filter(|id| **id == connection.id).count();
            assert_eq!(count, 1, "{} listed {} times in {}", connection.id, count, room_id);
        }
        let rooms_listing = directory
            .rooms()
            .filter(|(_, members)| members.contains(&connection.id))
            .count();
        assert!(rooms_listing <= 1, "{} is in {} rooms", connection.id, rooms_listing);
    }
}
