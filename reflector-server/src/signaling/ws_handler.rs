use crate::room::RoomRegistry;
use crate::signaling::{SignalSink, WsSignalChannel};
use crate::transport::{PeerSession, TransportConfig};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use reflector_core::{SignalEvent, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// `GET /websocket/{roomId}/join` — the upgrade is unconditional.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(registry): State<RoomRegistry>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, registry))
}

async fn handle_socket(socket: WebSocket, room_id: String, registry: RoomRegistry) {
    if room_id.is_empty() {
        warn!("Идентификатор комнаты отсутствует");
    }
    info!("new signaling connection for room {room_id}");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Single-writer discipline: this task is the only place frames hit the
    // wire.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    let channel: Arc<dyn SignalSink> = Arc::new(WsSignalChannel::new(tx));

    let session = match PeerSession::connect(
        room_id.clone(),
        TransportConfig::default(),
        registry.clone(),
        channel,
    )
    .await
    {
        Ok(session) => session,
        Err(e) => {
            error!("failed to set up peer connection for room {room_id}: {e:#}");
            send_task.abort();
            return;
        }
    };

    let pinger = registry.spawn_keyframe_pinger(&room_id);

    // The newcomer needs an offer carrying the room's current track set.
    registry.renegotiate(&room_id).await;

    while let Some(Ok(frame)) = receiver.next().await {
        match frame {
            Message::Text(raw) => {
                let message = match SignalMessage::decode(&raw) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("malformed signaling frame in room {room_id}: {e}");
                        break;
                    }
                };
                match message.event {
                    SignalEvent::Candidate => {
                        if let Err(e) = session.add_remote_candidate(&message.data).await {
                            warn!("dropping session in room {room_id}: {e:#}");
                            break;
                        }
                    }
                    SignalEvent::Answer => {
                        if let Err(e) = session.apply_answer(&message.data).await {
                            warn!("dropping session in room {room_id}: {e:#}");
                            break;
                        }
                    }
                    SignalEvent::Offer => {
                        // The server is the offerer; a client offer is a
                        // protocol violation.
                        warn!("unexpected offer from client in room {room_id}");
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Closing flips the connection to Closed so the next renegotiation pass
    // prunes it; detach drops the registry entry right away.
    pinger.abort();
    if let Err(e) = session.close().await {
        warn!("failed to close peer connection for room {room_id}: {e}");
    }
    registry.detach(&room_id, &session.peer_connection).await;
    send_task.abort();

    info!("signaling connection for room {room_id} ended");
}
