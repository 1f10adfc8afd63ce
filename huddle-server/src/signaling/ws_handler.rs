use crate::signaling::SignalingService;
use crate::transport::TransportEvent;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use huddle_core::ConnectionId;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// `/ws/{connection_id}`: the client picks its id, and may reuse it to
/// reconnect under a new session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(connection_id): Path<String>,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    let connection_id = ConnectionId::from(connection_id);

    ws.on_upgrade(move |socket| handle_socket(socket, connection_id, service))
}

/// `/ws`: the server assigns a fresh id.
pub async fn ws_handler_assigned(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ConnectionId::new(), service))
}

async fn handle_socket(socket: WebSocket, connection_id: ConnectionId, service: SignalingService) {
    info!("New WebSocket connection: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let session = service.add_peer(connection_id.clone(), tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let connection_id = connection_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        service
                            .submit(TransportEvent::Message {
                                connection_id: connection_id.clone(),
                                session,
                                text: text.as_str().to_owned(),
                            })
                            .await;
                    }
                    Message::Binary(_) => {
                        warn!("Ignoring binary frame from {}", connection_id);
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_peer(&connection_id, session);
    service
        .submit(TransportEvent::Closed {
            connection_id: connection_id.clone(),
            session,
        })
        .await;
    info!("WebSocket disconnected: {}", connection_id);
}
