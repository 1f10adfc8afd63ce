use crate::registry::connection::{AttributeUpdate, Connection};
use huddle_core::{ConnectionId, RoomId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

/// Owns every [`Connection`] record, keyed by transport-assigned id.
///
/// Mutation happens only here; nothing is broadcast from this table.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    default_display_name: String,
}

impl ConnectionRegistry {
    pub fn new(default_display_name: impl Into<String>) -> Self {
        Self {
            connections: HashMap::new(),
            default_display_name: default_display_name.into(),
        }
    }

    /// Creates a fresh record with no room and default attributes, replacing
    /// any existing record under the same id.
    pub fn register(&mut self, connection_id: ConnectionId, session: u64) -> &mut Connection {
        let connection = Connection::new(
            connection_id.clone(),
            session,
            self.default_display_name.clone(),
        );
        match self.connections.entry(connection_id) {
            Entry::Occupied(mut entry) => {
                debug!("Replaced connection record for {}", entry.key());
                entry.insert(connection);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(connection),
        }
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(connection_id)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    /// Unknown ids are ignored: updates may race with disconnection.
    /// Returns whether a record was updated.
    pub fn update_attributes(&mut self, connection_id: &ConnectionId, update: AttributeUpdate) -> bool {
        match self.connections.get_mut(connection_id) {
            Some(connection) => {
                update.apply(connection);
                true
            }
            None => {
                debug!("Ignoring attribute update for unknown connection {}", connection_id);
                false
            }
        }
    }

    /// Current room of the connection. This is the only place membership is
    /// recorded per connection.
    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<&RoomId> {
        self.connections
            .get(connection_id)
            .and_then(|connection| connection.room_id.as_ref())
    }

    pub(crate) fn set_room(&mut self, connection_id: &ConnectionId, room_id: Option<RoomId>) {
        if let Some(connection) = self.connections.get_mut(connection_id) {
            connection.room_id = room_id;
        }
    }

    /// Removes the record, returning its last known room.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<RoomId> {
        self.connections
            .remove(connection_id)
            .and_then(|connection| connection.room_id)
    }

    pub fn default_display_name(&self) -> &str {
        &self.default_display_name
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn clear(&mut self) {
        self.connections.clear();
    }
}
