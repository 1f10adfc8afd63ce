use crate::error::RelayError;
use crate::registry::ConnectionRegistry;
use crate::signaling::signaling_output::SignalingOutput;
use huddle_core::{ConnectionId, RelayKind, ServerMessage, now_millis};
use serde_json::Value;
use tracing::debug;

/// One addressed negotiation message. Never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvelope {
    pub kind: RelayKind,
    pub sender_id: ConnectionId,
    pub target_id: ConnectionId,
    pub payload: Value,
    /// Only set for [`RelayKind::DirectControl`].
    pub control_type: Option<String>,
}

impl SignalEnvelope {
    pub fn new(kind: RelayKind, sender_id: ConnectionId, target_id: ConnectionId, payload: Value) -> Self {
        Self {
            kind,
            sender_id,
            target_id,
            payload,
            control_type: None,
        }
    }

    pub fn with_control_type(mut self, control_type: impl Into<String>) -> Self {
        self.control_type = Some(control_type.into());
        self
    }

    fn into_forward(self, timestamp: u64) -> ServerMessage {
        match self.kind {
            RelayKind::OfferAnswer => ServerMessage::RelayOfferAnswer {
                id: self.sender_id.clone(),
                sender_id: self.sender_id,
                payload: self.payload,
                timestamp,
            },
            RelayKind::Candidate => ServerMessage::RelayCandidate {
                id: self.sender_id.clone(),
                sender_id: self.sender_id,
                payload: self.payload,
                timestamp,
            },
            RelayKind::DirectControl => ServerMessage::DirectControl {
                sender_id: self.sender_id,
                control_type: self.control_type.unwrap_or_default(),
                payload: self.payload,
                timestamp,
            },
            RelayKind::Voice => ServerMessage::RelayVoice {
                sender_id: self.sender_id,
                payload: self.payload,
                timestamp,
            },
        }
    }
}

/// Stateless pass-through between exactly two connections.
///
/// No sequencing or deduplication: per-pair order comes from the transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalRelay;

impl SignalRelay {
    /// Forwards the envelope to its target, or reports an addressing error
    /// back to the sender. The error is also returned for the caller's logs.
    pub async fn relay(
        &self,
        registry: &ConnectionRegistry,
        output: &dyn SignalingOutput,
        envelope: SignalEnvelope,
    ) -> Result<(), RelayError> {
        let kind = envelope.kind;
        let sender_id = envelope.sender_id.clone();
        let target_id = envelope.target_id.clone();

        let checked = if !registry.contains(&target_id) {
            Err(RelayError::TargetNotFound(target_id.clone()))
        } else if !output.is_connected(&target_id) {
            Err(RelayError::TargetDisconnected(target_id.clone()))
        } else {
            Ok(())
        };

        if let Err(e) = checked {
            debug!("Relay {:?} from {} failed: {}", kind, sender_id, e);
            output.deliver(&sender_id, e.to_message(kind)).await;
            return Err(e);
        }

        debug!("Relaying {:?} from {} to {}", kind, sender_id, target_id);
        output
            .deliver(&target_id, envelope.into_forward(now_millis()))
            .await;

        if kind.acknowledges_sender() {
            output
                .deliver(&sender_id, ServerMessage::Delivered { kind, target_id })
                .await;
        }

        Ok(())
    }
}
