use huddle_core::{ConnectionId, RoomId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// Out-of-band requests to a running engine.
#[derive(Debug)]
pub enum EngineCommand {
    /// Current members of a room, in join order.
    MembersOf {
        room_id: RoomId,
        reply: oneshot::Sender<Vec<ConnectionId>>,
    },

    /// Drops all connection and room state.
    Clear,

    /// Stops the engine loop.
    Shutdown,
}

/// Cloneable handle for sending [`EngineCommand`]s to a spawned engine.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<EngineCommand>) -> Self {
        Self { command_tx }
    }

    /// `None` if the engine has stopped.
    pub async fn members_of(&self, room_id: impl Into<RoomId>) -> Option<Vec<ConnectionId>> {
        let (reply, rx) = oneshot::channel();
        let cmd = EngineCommand::MembersOf {
            room_id: room_id.into(),
            reply,
        };
        if let Err(e) = self.command_tx.send(cmd).await {
            error!("Relay engine died: {}", e);
            return None;
        }
        rx.await.ok()
    }

    pub async fn clear(&self) {
        if let Err(e) = self.command_tx.send(EngineCommand::Clear).await {
            error!("Relay engine died: {}", e);
        }
    }

    /// Asks the engine to stop. State is dropped with it.
    pub async fn shutdown(&self) {
        if let Err(e) = self.command_tx.send(EngineCommand::Shutdown).await {
            debug!("Relay engine already stopped: {}", e);
        }
    }

    /// Whether the engine loop has exited.
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }
}
