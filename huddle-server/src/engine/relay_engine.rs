use crate::config::ServerConfig;
use crate::engine::engine_command::{EngineCommand, EngineHandle};
use crate::error::RequestError;
use crate::registry::{AttributeUpdate, Connection, ConnectionRegistry};
use crate::room::{JoinOutcome, PresenceBroadcaster, ReconnectCoordinator, RoomDirectory};
use crate::signaling::{SignalEnvelope, SignalRelay, SignalingOutput};
use crate::transport::TransportEvent;
use huddle_core::{
    ClientMessage, ConnectionId, NoiseSuppressionLevel, RelayKind, Role, RoomId, ServerMessage,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Owns the registry and directory and applies every inbound event to them.
///
/// Events are handled one at a time to completion, so no locks guard the
/// tables and presence updates for a room go out in trigger order.
pub struct RelayEngine {
    registry: ConnectionRegistry,
    directory: RoomDirectory,
    presence: PresenceBroadcaster,
    relay: SignalRelay,
    reconnect: ReconnectCoordinator,
    output: Arc<dyn SignalingOutput>,
}

impl RelayEngine {
    pub fn new(output: Arc<dyn SignalingOutput>, config: &ServerConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(config.default_display_name.clone()),
            directory: RoomDirectory::new(),
            presence: PresenceBroadcaster::new(),
            relay: SignalRelay,
            reconnect: ReconnectCoordinator,
            output,
        }
    }

    /// Spawns the engine loop and returns a handle for out-of-band commands.
    pub fn start(self, events_rx: mpsc::Receiver<TransportEvent>) -> EngineHandle {
        let (command_tx, command_rx) = mpsc::channel(16);
        tokio::spawn(self.run(events_rx, command_rx));
        EngineHandle::new(command_tx)
    }

    pub async fn run(
        mut self,
        mut events_rx: mpsc::Receiver<TransportEvent>,
        mut command_rx: mpsc::Receiver<EngineCommand>,
    ) {
        info!("Relay engine started");

        loop {
            tokio::select! {
                Some(cmd) = command_rx.recv() => {
                    if matches!(cmd, EngineCommand::Shutdown) {
                        info!("Shutdown requested. Stopping relay engine.");
                        break;
                    }
                    self.handle_command(cmd);
                }

                evt = events_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_event(e).await,
                        None => {
                            info!("Transport channel closed. Shutting down relay engine.");
                            break;
                        }
                    }
                }
            }
        }

        info!("Relay engine finished");
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::MembersOf { room_id, reply } => {
                let _ = reply.send(self.directory.members_of(&room_id));
            }
            EngineCommand::Clear => self.clear(),
            EngineCommand::Shutdown => {}
        }
    }

    pub async fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message {
                connection_id,
                session,
                text,
            } => self.accept_frame(&connection_id, session, &text).await,
            TransportEvent::Closed {
                connection_id,
                session,
            } => self.connection_closed(&connection_id, session).await,
        }
    }

    /// Decodes one text frame and dispatches it.
    pub async fn accept_frame(&mut self, connection_id: &ConnectionId, session: u64, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.accept(connection_id, session, message).await,
            Err(e) => {
                warn!("Invalid frame from {}: {}", connection_id, e);
                self.reject(connection_id, RequestError::from(e)).await;
            }
        }
    }

    /// The single inbound entry point for decoded messages.
    ///
    /// Messages from a session older than the one that last joined under the
    /// id are dropped.
    pub async fn accept(
        &mut self,
        connection_id: &ConnectionId,
        session: u64,
        message: ClientMessage,
    ) {
        if let Some(connection) = self.registry.get(connection_id)
            && connection.session > session
        {
            debug!(
                "Dropping {} from superseded session {} of {}",
                message.op(),
                session,
                connection_id
            );
            return;
        }

        let result = match message {
            ClientMessage::Join {
                room_id,
                connection_id: declared,
                display_name,
                role,
            } => {
                self.join(connection_id, session, room_id, declared, display_name, role)
                    .await
            }
            ClientMessage::Leave { room_id } => {
                self.leave(connection_id, &room_id).await;
                Ok(())
            }
            ClientMessage::SetSharing {
                room_id,
                is_sharing,
                has_audio,
            } => {
                self.set_sharing(connection_id, room_id, is_sharing, has_audio)
                    .await
            }
            ClientMessage::SetAudioStatus {
                is_muted,
                has_audio,
            } => {
                self.set_audio_status(connection_id, is_muted, has_audio)
                    .await;
                Ok(())
            }
            ClientMessage::SetNoiseSuppression { level } => {
                self.set_noise_suppression(connection_id, level).await;
                Ok(())
            }
            ClientMessage::RelayOfferAnswer { target_id, payload } => {
                self.forward(RelayKind::OfferAnswer, connection_id, target_id, payload, None)
                    .await;
                Ok(())
            }
            ClientMessage::RelayCandidate { target_id, payload } => {
                self.forward(RelayKind::Candidate, connection_id, target_id, payload, None)
                    .await;
                Ok(())
            }
            ClientMessage::DirectControl {
                target_id,
                payload,
                control_type,
            } => {
                self.forward(
                    RelayKind::DirectControl,
                    connection_id,
                    target_id,
                    payload,
                    Some(control_type),
                )
                .await;
                Ok(())
            }
            ClientMessage::RelayVoice { target_id, payload } => {
                self.forward(RelayKind::Voice, connection_id, target_id, payload, None)
                    .await;
                Ok(())
            }
            ClientMessage::RequestPresence { room_id, broadcast } => {
                self.request_presence(connection_id, room_id, broadcast)
                    .await
            }
            ClientMessage::ChatMessage { room_id, message } => {
                self.chat(connection_id, room_id, message).await
            }
        };

        if let Err(e) = result {
            warn!("Rejected request from {}: {}", connection_id, e);
            self.reject(connection_id, e).await;
        }
    }

    /// Implicit leave for the connection's room, then record removal.
    ///
    /// Ignored if a newer session holds the id, whether it has joined yet or
    /// is only open on the transport.
    pub async fn connection_closed(&mut self, connection_id: &ConnectionId, session: u64) {
        if self.output.is_connected(connection_id) {
            debug!("Ignoring stale close of {}: a newer session is open", connection_id);
            return;
        }

        let Some(connection) = self.registry.get(connection_id).cloned() else {
            debug!("Connection {} closed before joining", connection_id);
            return;
        };
        if connection.session > session {
            debug!(
                "Ignoring close of session {} of {}: session {} has joined since",
                session, connection_id, connection.session
            );
            return;
        }

        let room = self.registry.remove(connection_id);
        info!("Connection {} ({}) disconnected", connection_id, connection.display_name);

        let Some(room_id) = room else {
            return;
        };
        self.directory.leave(&room_id, connection_id);
        if connection.is_sharing {
            self.announce_share_stopped(&room_id, &connection).await;
        }
        self.publish(&room_id).await;
    }

    async fn join(
        &mut self,
        connection_id: &ConnectionId,
        session: u64,
        room_id: RoomId,
        declared: Option<ConnectionId>,
        display_name: Option<String>,
        role: Role,
    ) -> Result<(), RequestError> {
        if room_id.is_blank() {
            return Err(RequestError::EmptyRoomId);
        }
        if let Some(declared) = declared
            && &declared != connection_id
        {
            return Err(RequestError::ConnectionIdMismatch {
                declared,
                actual: connection_id.clone(),
            });
        }

        let previous = self.registry.get(connection_id).cloned();
        if let Some(previous) = &previous
            && previous.session == session
            && previous.is_in(&room_id)
        {
            debug!("{} repeated join of room {}, keeping its record", connection_id, room_id);
            self.send_snapshot(connection_id, &room_id, false).await;
            return Ok(());
        }

        let is_reconnect = previous.as_ref().is_some_and(|c| c.is_in(&room_id));
        let current_room = previous.as_ref().and_then(|c| c.room_id.clone());

        let connection = self.registry.register(connection_id.clone(), session);
        connection.role = role;
        if let Some(name) = display_name.filter(|n| !n.trim().is_empty()) {
            connection.display_name = name;
        }
        let display_name = connection.display_name.clone();

        let outcome = self
            .directory
            .join(&room_id, connection_id, current_room.as_ref());
        self.registry.set_room(connection_id, Some(room_id.clone()));

        info!(
            "{} ({}) joined room {} as {:?}{}",
            display_name,
            connection_id,
            room_id,
            role,
            if is_reconnect { " (reconnect)" } else { "" }
        );

        if let Some(previous) = &previous
            && previous.is_sharing
            && let Some(previous_room) = &previous.room_id
        {
            self.announce_share_stopped(previous_room, previous).await;
        }

        if let JoinOutcome::Switched { from } = &outcome {
            info!("{} switched from room {} to {}", connection_id, from, room_id);
            self.publish(from).await;
        }

        self.publish(&room_id).await;
        self.send_snapshot(connection_id, &room_id, is_reconnect).await;

        if is_reconnect || outcome.is_switch() {
            self.reconnect
                .replay_active_shares(
                    &self.registry,
                    &self.directory,
                    self.output.as_ref(),
                    &room_id,
                    connection_id,
                )
                .await;
        }

        Ok(())
    }

    async fn send_snapshot(
        &mut self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        is_reconnect: bool,
    ) {
        let members = self
            .presence
            .members(&self.registry, &self.directory, room_id);
        self.output
            .deliver(
                connection_id,
                ServerMessage::RoomSnapshot {
                    room_id: room_id.clone(),
                    members,
                    self_id: connection_id.clone(),
                    is_reconnect,
                },
            )
            .await;
    }

    async fn leave(&mut self, connection_id: &ConnectionId, room_id: &RoomId) {
        let Some(connection) = self.registry.get(connection_id).cloned() else {
            debug!("Leave from unknown connection {}", connection_id);
            return;
        };
        if !connection.is_in(room_id) {
            debug!("{} is not in room {}, nothing to leave", connection_id, room_id);
            return;
        }

        self.directory.leave(room_id, connection_id);
        self.registry.set_room(connection_id, None);
        info!("{} ({}) left room {}", connection.display_name, connection_id, room_id);

        if connection.is_sharing {
            self.registry.update_attributes(
                connection_id,
                AttributeUpdate {
                    is_sharing: Some(false),
                    ..Default::default()
                },
            );
            self.announce_share_stopped(room_id, &connection).await;
        }

        self.publish(room_id).await;
    }

    async fn set_sharing(
        &mut self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        is_sharing: bool,
        has_audio: Option<bool>,
    ) -> Result<(), RequestError> {
        let Some(connection) = self.registry.get(connection_id) else {
            debug!("Sharing change from unknown connection {}", connection_id);
            return Ok(());
        };
        if !connection.is_in(&room_id) {
            return Err(RequestError::NotInRoom {
                connection_id: connection_id.clone(),
                room_id,
            });
        }
        let was_sharing = connection.is_sharing;

        self.registry.update_attributes(
            connection_id,
            AttributeUpdate {
                is_sharing: Some(is_sharing),
                has_audio,
                ..Default::default()
            },
        );
        self.publish(&room_id).await;

        let Some(connection) = self.registry.get(connection_id).cloned() else {
            return Ok(());
        };

        match (was_sharing, is_sharing) {
            (false, true) => {
                info!("{} started sharing in room {}", connection_id, room_id);
                self.announce_to_others(
                    &room_id,
                    connection_id,
                    ServerMessage::ShareStarted {
                        room_id: room_id.clone(),
                        user_id: connection.id.clone(),
                        user_name: connection.display_name.clone(),
                        has_audio: connection.has_audio,
                    },
                )
                .await;
                self.reconnect
                    .notify_peers_of_share_start(
                        &self.directory,
                        self.output.as_ref(),
                        &room_id,
                        connection_id,
                    )
                    .await;
            }
            (true, false) => {
                info!("{} stopped sharing in room {}", connection_id, room_id);
                self.announce_share_stopped(&room_id, &connection).await;
            }
            _ => {}
        }

        Ok(())
    }

    async fn set_audio_status(
        &mut self,
        connection_id: &ConnectionId,
        is_muted: bool,
        has_audio: Option<bool>,
    ) {
        let updated = self.registry.update_attributes(
            connection_id,
            AttributeUpdate {
                is_muted: Some(is_muted),
                has_audio,
                ..Default::default()
            },
        );
        if !updated {
            return;
        }

        if let Some(room_id) = self
            .registry
            .get(connection_id)
            .and_then(|c| c.room_id.clone())
        {
            self.publish(&room_id).await;
        }
    }

    async fn set_noise_suppression(
        &mut self,
        connection_id: &ConnectionId,
        level: NoiseSuppressionLevel,
    ) {
        let updated = self.registry.update_attributes(
            connection_id,
            AttributeUpdate {
                noise_suppression_level: Some(level),
                ..Default::default()
            },
        );
        if updated {
            self.output
                .deliver(
                    connection_id,
                    ServerMessage::NoiseSuppressionUpdated { level },
                )
                .await;
        }
    }

    async fn forward(
        &mut self,
        kind: RelayKind,
        sender_id: &ConnectionId,
        target_id: ConnectionId,
        payload: Value,
        control_type: Option<String>,
    ) {
        let mut envelope = SignalEnvelope::new(kind, sender_id.clone(), target_id, payload);
        if let Some(control_type) = control_type {
            envelope = envelope.with_control_type(control_type);
        }
        // Failures were already reported to the sender.
        let _ = self
            .relay
            .relay(&self.registry, self.output.as_ref(), envelope)
            .await;
    }

    async fn request_presence(
        &mut self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        broadcast: bool,
    ) -> Result<(), RequestError> {
        if room_id.is_blank() {
            return Err(RequestError::EmptyRoomId);
        }

        let is_member = self
            .registry
            .get(connection_id)
            .is_some_and(|c| c.is_in(&room_id));
        if broadcast && is_member {
            self.publish(&room_id).await;
            return Ok(());
        }

        let members = self
            .presence
            .members(&self.registry, &self.directory, &room_id);
        self.output
            .deliver(
                connection_id,
                ServerMessage::PresenceUpdated { room_id, members },
            )
            .await;
        Ok(())
    }

    async fn chat(
        &mut self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        message: Value,
    ) -> Result<(), RequestError> {
        let is_member = self
            .registry
            .get(connection_id)
            .is_some_and(|c| c.is_in(&room_id));
        if !is_member {
            return Err(RequestError::NotInRoom {
                connection_id: connection_id.clone(),
                room_id,
            });
        }

        self.announce_to_others(
            &room_id,
            connection_id,
            ServerMessage::ChatMessage {
                room_id: room_id.clone(),
                sender_id: connection_id.clone(),
                message,
            },
        )
        .await;
        Ok(())
    }

    async fn publish(&mut self, room_id: &RoomId) {
        self.presence
            .publish(&self.registry, &self.directory, self.output.as_ref(), room_id)
            .await;
    }

    async fn announce_share_stopped(&self, room_id: &RoomId, connection: &Connection) {
        self.announce_to_others(
            room_id,
            &connection.id,
            ServerMessage::ShareStopped {
                room_id: room_id.clone(),
                user_id: connection.id.clone(),
                user_name: connection.display_name.clone(),
            },
        )
        .await;
    }

    async fn announce_to_others(
        &self,
        room_id: &RoomId,
        except: &ConnectionId,
        message: ServerMessage,
    ) {
        for member in self.directory.members_of(room_id) {
            if &member != except {
                self.output.deliver(&member, message.clone()).await;
            }
        }
    }

    async fn reject(&self, connection_id: &ConnectionId, error: RequestError) {
        self.output
            .deliver(connection_id, error.to_message())
            .await;
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    pub fn presence(&self) -> &PresenceBroadcaster {
        &self.presence
    }

    pub fn clear(&mut self) {
        info!(
            "Clearing {} connections and {} rooms",
            self.registry.len(),
            self.directory.room_count()
        );
        self.registry.clear();
        self.directory.clear();
    }
}
