use crate::signaling::SignalingOutput;
use crate::transport::TransportEvent;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use huddle_core::{ConnectionId, ServerMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

struct PeerSender {
    session: u64,
    tx: mpsc::UnboundedSender<Message>,
}

struct PeersInner {
    peers: DashMap<ConnectionId, PeerSender>,
    next_session: AtomicU64,
}

/// Outbound side of the transport: one queue per open session.
///
/// This is what the relay engine writes to. It holds no inbound sender, so
/// the engine's event channel closes once every [`SignalingService`] is gone.
#[derive(Clone)]
pub struct SignalingPeers {
    inner: Arc<PeersInner>,
}

impl SignalingPeers {
    fn new() -> Self {
        Self {
            inner: Arc::new(PeersInner {
                peers: DashMap::new(),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    pub fn connected_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn send_signal(&self, connection_id: &ConnectionId, msg: &ServerMessage) {
        if let Some(peer) = self.inner.peers.get(connection_id) {
            match serde_json::to_string(msg) {
                Ok(json) => {
                    if let Err(e) = peer.tx.send(Message::Text(json.into())) {
                        error!("Failed to send WS message to {}: {:?}", connection_id, e);
                    }
                }
                Err(e) => error!("Failed to serialize {} message: {}", msg.op(), e),
            }
        } else {
            warn!(
                "Attempted to send {} to disconnected connection {}",
                msg.op(),
                connection_id
            );
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingPeers {
    async fn deliver(&self, connection_id: &ConnectionId, message: ServerMessage) {
        self.send_signal(connection_id, &message);
    }

    fn is_connected(&self, connection_id: &ConnectionId) -> bool {
        self.inner.peers.contains_key(connection_id)
    }
}

/// Socket-facing half of the transport, shared by the WebSocket handlers:
/// the open sessions plus the queue of inbound events feeding the engine.
#[derive(Clone)]
pub struct SignalingService {
    peers: SignalingPeers,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl SignalingService {
    pub fn new(events_tx: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            peers: SignalingPeers::new(),
            events_tx,
        }
    }

    /// Handle the relay engine delivers through.
    pub fn output(&self) -> SignalingPeers {
        self.peers.clone()
    }

    /// Registers an outbound queue for a new session and returns its session
    /// number. A session already open under the same id is superseded.
    pub fn add_peer(&self, connection_id: ConnectionId, tx: mpsc::UnboundedSender<Message>) -> u64 {
        let inner = &self.peers.inner;
        let session = inner.next_session.fetch_add(1, Ordering::Relaxed);
        if inner
            .peers
            .insert(connection_id.clone(), PeerSender { session, tx })
            .is_some()
        {
            debug!("Session {} supersedes an open session of {}", session, connection_id);
        }
        session
    }

    /// Drops the outbound queue, unless a newer session has taken the id.
    pub fn remove_peer(&self, connection_id: &ConnectionId, session: u64) {
        self.peers
            .inner
            .peers
            .remove_if(connection_id, |_, peer| peer.session == session);
    }

    pub fn connected_count(&self) -> usize {
        self.peers.connected_count()
    }

    pub async fn submit(&self, event: TransportEvent) {
        if let Err(e) = self.events_tx.send(event).await {
            error!("Relay engine is gone: {}", e);
        }
    }
}
