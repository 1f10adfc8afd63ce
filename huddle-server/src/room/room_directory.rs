use huddle_core::{ConnectionId, RoomId};
use std::collections::HashMap;
use tracing::info;

/// Result of [`RoomDirectory::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection was in no room before.
    Joined,
    /// The connection was already a member of this room.
    AlreadyMember,
    /// The connection left `from` to join this room.
    Switched { from: RoomId },
}

impl JoinOutcome {
    pub fn is_switch(&self) -> bool {
        matches!(self, JoinOutcome::Switched { .. })
    }
}

/// Member lists per room, in join order.
///
/// A connection's current room is recorded only on its registry record;
/// callers pass it in. A room exists exactly as long as it has members.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomId, Vec<ConnectionId>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the connection from `current` into `room_id` in one step.
    pub fn join(
        &mut self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
        current: Option<&RoomId>,
    ) -> JoinOutcome {
        let outcome = match current {
            Some(current) if current == room_id => JoinOutcome::AlreadyMember,
            Some(current) => {
                self.leave(current, connection_id);
                JoinOutcome::Switched {
                    from: current.clone(),
                }
            }
            None => JoinOutcome::Joined,
        };

        let members = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room_id);
            Vec::new()
        });
        if !members.contains(connection_id) {
            members.push(connection_id.clone());
        }

        outcome
    }

    /// Removes the membership if it exists. Returns whether anything changed.
    pub fn leave(&mut self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let before = members.len();
        members.retain(|id| id != connection_id);
        let removed = members.len() != before;

        if members.is_empty() {
            self.rooms.remove(room_id);
            info!("Room {} is empty, removing it", room_id);
        }
        removed
    }

    /// Members in join order; empty if the room does not exist.
    pub fn members_of(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms.get(room_id).cloned().unwrap_or_default()
    }

    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms(&self) -> impl Iterator<Item = (&RoomId, &[ConnectionId])> {
        self.rooms.iter().map(|(id, members)| (id, members.as_slice()))
    }

    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}
