//! The real-time fan-out hub (C7): an in-process broker of WebSocket
//! sessions. A single actor task owns the connection registry so that
//! register/unregister/broadcast are serialized without locking from the
//! caller's side (§5's "single-writer" policy).

pub mod session;

use shared::types::Envelope;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

pub use session::ws_upgrade_handler;

const SESSION_BUFFER: usize = 256;

/// A session's outbound sink, as seen by the hub actor.
type SessionTx = mpsc::Sender<Envelope>;

enum HubCommand {
    Register {
        user_id: Uuid,
        device_id: Uuid,
        tx: SessionTx,
        reply: oneshot::Sender<()>,
    },
    Unregister {
        user_id: Uuid,
        device_id: Uuid,
    },
    Broadcast {
        user_id: Uuid,
        envelope: Envelope,
        exclude_device: Option<Uuid>,
    },
    SendToDevice {
        user_id: Uuid,
        device_id: Uuid,
        envelope: Envelope,
        reply: oneshot::Sender<bool>,
    },
    HasDevice {
        user_id: Uuid,
        device_id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

/// Cheaply-cloneable front for the hub actor. Stored in `AppState`.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn register(&self, user_id: Uuid, device_id: Uuid) -> mpsc::Receiver<Envelope> {
        let (session_tx, session_rx) = mpsc::channel(SESSION_BUFFER);
        let (reply_tx, reply_rx) = oneshot::channel();
        let _ = self
            .tx
            .send(HubCommand::Register { user_id, device_id, tx: session_tx, reply: reply_tx })
            .await;
        let _ = reply_rx.await;
        session_rx
    }

    pub async fn unregister(&self, user_id: Uuid, device_id: Uuid) {
        let _ = self.tx.send(HubCommand::Unregister { user_id, device_id }).await;
    }

    pub async fn broadcast(&self, user_id: Uuid, envelope: Envelope, exclude_device: Option<Uuid>) {
        let _ = self.tx.send(HubCommand::Broadcast { user_id, envelope, exclude_device }).await;
    }

    /// Delivers directly to one device's session if it is registered on
    /// this instance. Returns false if absent or the session is full.
    pub async fn send_to_device(&self, user_id: Uuid, device_id: Uuid, envelope: Envelope) -> bool {
        let (reply, reply_rx) = oneshot::channel();
        if self
            .tx
            .send(HubCommand::SendToDevice { user_id, device_id, envelope, reply })
            .await
            .is_err()
        {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    pub async fn has_device(&self, user_id: Uuid, device_id: Uuid) -> bool {
        let (reply, reply_rx) = oneshot::channel();
        if self.tx.send(HubCommand::HasDevice { user_id, device_id, reply }).await.is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(HubCommand::Shutdown).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

fn registry_session_count(registry: &HashMap<Uuid, HashMap<Uuid, SessionTx>>) -> i64 {
    registry.values().map(|devices| devices.len() as i64).sum()
}

/// Spawns the hub actor and returns a handle to it. The actor owns
/// `registry: user_id -> device_id -> session sender` and processes
/// register/unregister/broadcast one at a time, in receipt order.
pub fn spawn() -> HubHandle {
    let (tx, mut rx) = mpsc::channel::<HubCommand>(1024);

    tokio::spawn(async move {
        let mut registry: HashMap<Uuid, HashMap<Uuid, SessionTx>> = HashMap::new();

        while let Some(cmd) = rx.recv().await {
            match cmd {
                HubCommand::Register { user_id, device_id, tx, reply } => {
                    registry.entry(user_id).or_default().insert(device_id, tx);
                    crate::observability::set_active_sessions("local", registry_session_count(&registry));
                    let _ = reply.send(());
                }
                HubCommand::Unregister { user_id, device_id } => {
                    if let Some(devices) = registry.get_mut(&user_id) {
                        devices.remove(&device_id);
                        if devices.is_empty() {
                            registry.remove(&user_id);
                        }
                    }
                    crate::observability::set_active_sessions("local", registry_session_count(&registry));
                }
                HubCommand::Broadcast { user_id, envelope, exclude_device } => {
                    let Some(devices) = registry.get_mut(&user_id) else { continue };
                    let mut dead = Vec::new();
                    for (device_id, session_tx) in devices.iter() {
                        if Some(*device_id) == exclude_device {
                            continue;
                        }
                        // Non-blocking: a full buffer means a slow session,
                        // which is closed rather than allowed to stall the
                        // single hub loop (§5 backpressure policy).
                        if session_tx.try_send(envelope.clone()).is_err() {
                            dead.push(*device_id);
                        }
                    }
                    for device_id in dead {
                        devices.remove(&device_id);
                        crate::observability::record_slow_session_dropped("full_buffer");
                    }
                }
                HubCommand::SendToDevice { user_id, device_id, envelope, reply } => {
                    let ok = registry
                        .get(&user_id)
                        .and_then(|devices| devices.get(&device_id))
                        .map(|tx| tx.try_send(envelope).is_ok())
                        .unwrap_or(false);
                    let _ = reply.send(ok);
                }
                HubCommand::HasDevice { user_id, device_id, reply } => {
                    let present = registry
                        .get(&user_id)
                        .map(|devices| devices.contains_key(&device_id))
                        .unwrap_or(false);
                    let _ = reply.send(present);
                }
                HubCommand::Shutdown => break,
            }
        }
        tracing::info!("hub actor stopped");
    });

    HubHandle { tx }
}

/// Holds the `user:*` pattern subscription and re-enters `BroadcastToUser`
/// for every envelope received from Redis — this is how a notification
/// published on one instance reaches sessions registered on another, and
/// (by the same path) a `notification_action` on this instance reaches its
/// own other local sessions (§4.7's broadcast rule always excludes the
/// action's source device, never the server it was processed on).
pub fn spawn_bus_bridge(
    hub: HubHandle,
    bus: shared::Bus,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let stream = match bus.subscribe_pattern().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("bus bridge failed to subscribe: {e}");
                return;
            }
        };
        tokio::pin!(stream);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                msg = futures::StreamExt::next(&mut stream) => {
                    let Some(msg) = msg else { break };
                    let envelope = Envelope::new(msg.kind, msg.data);
                    hub.broadcast(msg.user_id, envelope, msg.device_id).await;
                }
            }
        }
        tracing::info!("bus bridge stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::EnvelopeKind;

    fn envelope() -> Envelope {
        Envelope::new(EnvelopeKind::NewNotification, serde_json::json!({"id": "1"}))
    }

    #[tokio::test]
    async fn broadcast_excludes_source_device() {
        let hub = spawn();
        let user_id = Uuid::new_v4();
        let device_a = Uuid::new_v4();
        let device_b = Uuid::new_v4();

        let mut rx_a = hub.register(user_id, device_a).await;
        let mut rx_b = hub.register(user_id, device_b).await;

        hub.broadcast(user_id, envelope(), Some(device_a)).await;

        let received_b = tokio::time::timeout(std::time::Duration::from_secs(1), rx_b.recv()).await;
        assert!(received_b.is_ok() && received_b.unwrap().is_some());

        let received_a = rx_a.try_recv();
        assert!(received_a.is_err(), "excluded device should not receive the broadcast");
    }

    #[tokio::test]
    async fn unregister_removes_device_from_registry() {
        let hub = spawn();
        let user_id = Uuid::new_v4();
        let device_id = Uuid::new_v4();

        let _rx = hub.register(user_id, device_id).await;
        assert!(hub.has_device(user_id, device_id).await);

        hub.unregister(user_id, device_id).await;
        assert!(!hub.has_device(user_id, device_id).await);
    }

    #[tokio::test]
    async fn send_to_device_returns_false_when_not_registered() {
        let hub = spawn();
        let user_id = Uuid::new_v4();
        let device_id = Uuid::new_v4();

        let delivered = hub.send_to_device(user_id, device_id, envelope()).await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn send_to_device_delivers_directly_when_registered() {
        let hub = spawn();
        let user_id = Uuid::new_v4();
        let device_id = Uuid::new_v4();

        let mut rx = hub.register(user_id, device_id).await;
        let delivered = hub.send_to_device(user_id, device_id, envelope()).await;
        assert!(delivered);

        let received = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv()).await;
        assert!(received.is_ok() && received.unwrap().is_some());
    }
}
