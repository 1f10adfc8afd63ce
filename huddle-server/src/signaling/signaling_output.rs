use async_trait::async_trait;
use huddle_core::{ConnectionId, ServerMessage};

/// The two primitives the relay engine needs from the transport layer.
///
/// Implemented by [`SignalingPeers`](crate::SignalingPeers) for real
/// WebSocket clients and by test doubles.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Queue a frame for one connection. Frames to the same connection arrive
    /// in the order they were delivered here.
    async fn deliver(&self, connection_id: &ConnectionId, message: ServerMessage);

    /// Whether the transport currently holds an open session for this id.
    fn is_connected(&self, connection_id: &ConnectionId) -> bool;
}
