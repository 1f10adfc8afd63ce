use huddle_core::ConnectionId;

/// What the transport layer reports to the relay engine.
///
/// `session` is the number [`SignalingService::add_peer`](crate::SignalingService::add_peer)
/// handed out when the socket opened. Session numbers only grow, so a
/// reconnect under the same id always carries a larger one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame received from a connection, not yet decoded.
    Message {
        connection_id: ConnectionId,
        session: u64,
        text: String,
    },
    /// The session has ended.
    Closed {
        connection_id: ConnectionId,
        session: u64,
    },
}
