use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::{ConnectionId, MemberPresence, ServerMessage};
use huddle_server::SignalingOutput;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// One captured outbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub connection_id: ConnectionId,
    pub message: ServerMessage,
}

/// Mock SignalingOutput that captures every delivery and lets tests decide
/// which sessions the transport considers open.
#[derive(Clone, Default)]
pub struct MockSignalingOutput {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    sessions: Arc<DashMap<ConnectionId, u64>>,
    next_session: Arc<AtomicU64>,
}

impl MockSignalingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new session for the id, superseding any open one, and returns
    /// its number.
    pub fn connect(&self, connection_id: &ConnectionId) -> u64 {
        let session = self.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        self.sessions.insert(connection_id.clone(), session);
        session
    }

    /// Simulates the transport dropping a session before the engine hears
    /// about it.
    pub fn disconnect(&self, connection_id: &ConnectionId) {
        self.sessions.remove(connection_id);
    }

    /// Number of the open session, or 0 if the id never connected.
    pub fn session_of(&self, connection_id: &ConnectionId) -> u64 {
        self.sessions
            .get(connection_id)
            .map(|session| *session)
            .unwrap_or_default()
    }

    pub async fn all(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    pub async fn messages_for(&self, connection_id: &ConnectionId) -> Vec<ServerMessage> {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter(|d| &d.connection_id == connection_id)
            .map(|d| d.message.clone())
            .collect()
    }

    /// Removes and returns everything delivered to one connection so far.
    pub async fn take_for(&self, connection_id: &ConnectionId) -> Vec<ServerMessage> {
        let mut deliveries = self.deliveries.lock().await;
        let (taken, kept): (Vec<_>, Vec<_>) = deliveries
            .drain(..)
            .partition(|d| &d.connection_id == connection_id);
        *deliveries = kept;
        taken.into_iter().map(|d| d.message).collect()
    }

    pub async fn clear(&self) {
        self.deliveries.lock().await.clear();
    }

    /// Member lists of every `presence-updated` delivered to a connection.
    pub async fn presence_updates_for(
        &self,
        connection_id: &ConnectionId,
    ) -> Vec<Vec<MemberPresence>> {
        self.messages_for(connection_id)
            .await
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::PresenceUpdated { members, .. } => Some(members),
                _ => None,
            })
            .collect()
    }

    pub async fn last_presence_for(
        &self,
        connection_id: &ConnectionId,
    ) -> Option<Vec<MemberPresence>> {
        self.presence_updates_for(connection_id).await.pop()
    }

    pub async fn count_op_for(&self, connection_id: &ConnectionId, op: &str) -> usize {
        self.messages_for(connection_id)
            .await
            .iter()
            .filter(|m| m.op() == op)
            .count()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn deliver(&self, connection_id: &ConnectionId, message: ServerMessage) {
        tracing::debug!("[MockSignaling] {} to {}", message.op(), connection_id);

        self.deliveries.lock().await.push(Delivery {
            connection_id: connection_id.clone(),
            message,
        });
    }

    fn is_connected(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.contains_key(connection_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::NoiseSuppressionLevel;

    #[tokio::test]
    async fn test_mock_signaling_captures_deliveries() {
        let signaling = MockSignalingOutput::new();
        let a = ConnectionId::from("a");
        let b = ConnectionId::from("b");

        signaling
            .deliver(
                &a,
                ServerMessage::NoiseSuppressionUpdated {
                    level: NoiseSuppressionLevel::Low,
                },
            )
            .await;

        assert_eq!(signaling.messages_for(&a).await.len(), 1);
        assert!(signaling.messages_for(&b).await.is_empty());
        assert_eq!(signaling.take_for(&a).await.len(), 1);
        assert!(signaling.all().await.is_empty());
    }

    #[test]
    fn test_mock_signaling_tracks_liveness() {
        let signaling = MockSignalingOutput::new();
        let a = ConnectionId::from("a");

        assert!(!signaling.is_connected(&a));
        let first = signaling.connect(&a);
        let second = signaling.connect(&a);
        assert!(second > first);
        assert_eq!(signaling.session_of(&a), second);
        assert!(signaling.is_connected(&a));
        signaling.disconnect(&a);
        assert!(!signaling.is_connected(&a));
        assert_eq!(signaling.session_of(&a), 0);
    }
}
