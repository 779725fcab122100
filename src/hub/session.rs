//! Per-connection session: the read/write loop for one device's WebSocket,
//! grounded on the relay's mpsc tx/rx + `tokio::select!` heartbeat pattern
//! (the teacher repo has no WebSocket code of its own).

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::cache::{DeviceConnection, QueueItem};
use shared::error::AppError;
use shared::models::ActionKind;
use shared::types::{Envelope, EnvelopeKind, NotificationActionKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use uuid::Uuid;

use crate::ingestion;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(54);
const READ_DEADLINE: Duration = Duration::from_secs(60);
const WRITE_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: String,
    device_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct NotificationActionPayload {
    notification_id: Uuid,
    action: NotificationActionKind,
}

pub async fn ws_upgrade_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let user_ctx = state.auth.extract_user_context(&query.token)?;
    let device = state
        .repos
        .devices
        .get_by_id(query.device_id)
        .await?
        .ok_or_else(|| AppError::not_found("device"))?;
    if device.user_id != user_ctx.user_id {
        return Err(AppError::authentication("device does not belong to this user"));
    }

    let user_id = user_ctx.user_id;
    let device_id = query.device_id;
    Ok(ws.on_upgrade(move |socket| handle_socket(state, socket, user_id, device_id)))
}

async fn handle_socket(state: Arc<AppState>, socket: WebSocket, user_id: Uuid, device_id: Uuid) {
    let (mut sink, mut stream) = socket.split();
    let mut rx = state.hub.register(user_id, device_id).await;

    if let Err(e) = state.redis.add_user_device(user_id, device_id).await {
        tracing::warn!(%device_id, "presence cache write failed: {e}");
    }
    if let Err(e) = state
        .redis
        .set_connection(&DeviceConnection {
            device_id,
            socket_id: None,
            last_ping: chrono::Utc::now(),
            is_online: true,
            user_agent: None,
        })
        .await
    {
        tracing::warn!(%device_id, "presence cache write failed: {e}");
    }

    if !drain_queue(&state, &mut sink, device_id).await {
        cleanup(&state, user_id, device_id).await;
        return;
    }

    let mut heartbeat = interval(PING_INTERVAL);
    let mut last_activity = tokio::time::Instant::now();

    loop {
        tokio::select! {
            maybe_envelope = rx.recv() => {
                match maybe_envelope {
                    Some(envelope) => {
                        if !send_envelope(&mut sink, &envelope).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = tokio::time::timeout(READ_DEADLINE, stream.next()) => {
                match incoming {
                    Ok(Some(Ok(msg))) => {
                        last_activity = tokio::time::Instant::now();
                        match msg {
                            Message::Text(text) => {
                                handle_inbound(&state, user_id, device_id, &text, &mut sink).await;
                            }
                            Message::Pong(_) => {}
                            Message::Close(_) => break,
                            _ => {}
                        }
                    }
                    Ok(Some(Err(_))) | Ok(None) => break,
                    Err(_) => {
                        tracing::debug!(%device_id, "read deadline exceeded, closing session");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if last_activity.elapsed() > READ_DEADLINE {
                    break;
                }
                if tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Ping(Vec::new().into())))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }

    cleanup(&state, user_id, device_id).await;
}

async fn drain_queue(
    state: &Arc<AppState>,
    sink: &mut (impl futures::Sink<Message> + Unpin),
    device_id: Uuid,
) -> bool {
    let items = match state.redis.dequeue(device_id).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(%device_id, "queue drain failed: {e}");
            return true;
        }
    };
    for item in items {
        let envelope = Envelope::new(queue_kind(&item), item.data);
        if !send_envelope(sink, &envelope).await {
            return false;
        }
    }
    true
}

fn queue_kind(item: &QueueItem) -> EnvelopeKind {
    serde_json::from_value(serde_json::Value::String(item.kind.clone()))
        .unwrap_or(EnvelopeKind::NewNotification)
}

async fn send_envelope(
    sink: &mut (impl futures::Sink<Message> + Unpin),
    envelope: &Envelope,
) -> bool {
    let Ok(payload) = serde_json::to_string(envelope) else { return true };
    tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Text(payload.into())))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

async fn handle_inbound(
    state: &Arc<AppState>,
    user_id: Uuid,
    device_id: Uuid,
    text: &str,
    sink: &mut (impl futures::Sink<Message> + Unpin),
) {
    let Ok(msg) = serde_json::from_str::<InboundMessage>(text) else {
        tracing::debug!(%device_id, "dropping unparseable inbound message");
        return;
    };

    match msg.kind.as_str() {
        "ping" => {
            if let Err(e) = state.redis.heartbeat(device_id).await {
                tracing::warn!(%device_id, "heartbeat write failed: {e}");
            }
            let pong = Envelope::new(EnvelopeKind::Pong, serde_json::json!({}));
            send_envelope(sink, &pong).await;
        }
        "device_status" => {
            if let Err(e) = state.redis.heartbeat(device_id).await {
                tracing::warn!(%device_id, "heartbeat write failed: {e}");
            }
        }
        "notification_action" => {
            let Ok(payload) = serde_json::from_value::<NotificationActionPayload>(msg.data) else {
                return;
            };
            if let Err(e) = ingestion::apply_action(
                state,
                user_id,
                device_id,
                payload.notification_id,
                to_action_kind(payload.action),
            )
            .await
            {
                tracing::warn!(%device_id, "notification_action failed: {e}");
            }
        }
        other => {
            tracing::debug!(%device_id, kind = other, "unrecognized inbound message type");
        }
    }
}

fn to_action_kind(action: NotificationActionKind) -> ActionKind {
    match action {
        NotificationActionKind::Read => ActionKind::Read,
        NotificationActionKind::Dismiss => ActionKind::Dismissed,
        NotificationActionKind::Click => ActionKind::Clicked,
    }
}

async fn cleanup(state: &Arc<AppState>, user_id: Uuid, device_id: Uuid) {
    state.hub.unregister(user_id, device_id).await;
    if let Err(e) = state.redis.remove_connection(device_id).await {
        tracing::warn!(%device_id, "presence cleanup failed: {e}");
    }
    let envelope = Envelope::new(
        EnvelopeKind::DeviceStatus,
        serde_json::json!({ "device_id": device_id, "status": "offline" }),
    );
    let message = shared::types::BusMessage {
        kind: envelope.kind,
        user_id,
        device_id: Some(device_id),
        data: envelope.data,
        timestamp: envelope.timestamp,
    };
    if let Err(e) = state.bus.publish(&message).await {
        tracing::debug!("offline status publish failed (best-effort): {e}");
    }
    tracing::info!(%user_id, %device_id, "session closed");
}
