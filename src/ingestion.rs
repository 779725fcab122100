//! Ingestion pipeline (C6): `Submit()` ties C1 (validate/sanitize), C5
//! (classify/rules), C2 (persist), C3 (cache), and C4/C7 (fan-out) together
//! on the submitting request's task — no background handoff between steps.

use chrono::{Duration, Utc};
use shared::cache::{NotificationStatus, QueueItem};
use shared::error::AppError;
use shared::models::{ActionKind, Category, Notification};
use shared::rules::{apply_rules, auto_classify, NotificationDraft};
use shared::types::{BusMessage, Envelope, EnvelopeKind};
use shared::validation::{sanitize_notification, validate_notification, NotificationInput};
use shared::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::state::AppState;

const NOTIFICATION_TTL_DAYS: i64 = 7;
const IDEMPOTENCY_WINDOW_SECONDS: i64 = 60;
const MAX_CLOCK_SKEW: Duration = Duration::minutes(5);
const STALE_INPUT_AGE: Duration = Duration::days(30);

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub app_name: String,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub priority: Option<i16>,
    pub extras: Option<serde_json::Value>,
    pub client_id: Option<String>,
    pub created_at: Option<chrono::DateTime<Utc>>,
}

/// `Submit(user_id, device_id, CreateNotification) -> Notification | Error`.
pub async fn submit(
    state: &Arc<AppState>,
    user_id: Uuid,
    device_id: Uuid,
    input: CreateNotification,
) -> Result<Notification> {
    // Step 2: verify device belongs to user.
    if !state.repos.devices.belongs_to_user(device_id, user_id).await? {
        return Err(AppError::not_found("device"));
    }

    // Step 1: validate + sanitize.
    let mut notif_input = NotificationInput {
        app_name: input.app_name,
        title: input.title,
        body: input.body,
        category: input.category,
        priority: input.priority,
    };
    sanitize_notification(&mut notif_input);
    if let Err(e) = validate_notification(&notif_input) {
        crate::observability::record_ingestion("rejected");
        return Err(e);
    }

    // Idempotency: same client_id within the window returns the prior id.
    if let Some(client_id) = &input.client_id {
        if let Some(existing) = state
            .repos
            .notifications
            .find_recent_by_client_id(user_id, client_id, IDEMPOTENCY_WINDOW_SECONDS)
            .await?
        {
            return Ok(existing);
        }
    }

    let now = Utc::now();
    let created_at = input.created_at.unwrap_or(now);

    // Step 3: reject extremely stale replays.
    if created_at > now + MAX_CLOCK_SKEW {
        return Err(AppError::validation("created_at is too far in the future"));
    }
    if now - created_at > STALE_INPUT_AGE {
        return Err(AppError::validation("notification timestamp is too stale to ingest"));
    }

    // Step 4: classify, then apply rules (rules may override classification).
    let incoming_category = notif_input
        .category
        .as_deref()
        .and_then(|c| match c.to_lowercase().as_str() {
            "work" => Some(Category::Work),
            "personal" => Some(Category::Personal),
            "junk" => Some(Category::Junk),
            _ => None,
        });
    let priority = notif_input.priority.unwrap_or(0);
    let (category, priority) = match incoming_category {
        Some(c) => (c, priority),
        None => auto_classify(&notif_input.app_name, &notif_input.title, &notif_input.body, priority),
    };

    let mut draft = NotificationDraft {
        app_name: notif_input.app_name.clone(),
        title: notif_input.title.clone(),
        body: notif_input.body.clone(),
        category,
        priority,
        highlighted: false,
    };
    let active_rules = state.repos.user_rules.list_active_ordered(user_id).await?;
    apply_rules(&mut draft, &active_rules, now);

    let classification_source = if incoming_category.is_some() { "client" } else { "auto" };
    crate::observability::record_classification(category_str(draft.category), classification_source);

    let mut extras = input.extras;
    if draft.highlighted {
        let obj = extras.get_or_insert_with(|| serde_json::json!({}));
        if let Some(map) = obj.as_object_mut() {
            map.insert("highlighted".to_string(), serde_json::Value::Bool(true));
        }
    }

    // Step 5 + 6: set defaults and persist.
    let notification = Notification {
        id: Uuid::new_v4(),
        user_id,
        source_device_id: device_id,
        app_name: draft.app_name,
        title: draft.title,
        body: draft.body,
        category: draft.category,
        priority: draft.priority,
        is_read: false,
        is_dismissed: false,
        created_at,
        expires_at: created_at + Duration::days(NOTIFICATION_TTL_DAYS),
        extras,
        client_id: input.client_id,
    };
    let persisted = state.repos.notifications.create(&notification).await?;

    // Step 7: best-effort initial status cache.
    let status = NotificationStatus {
        id: persisted.id,
        is_read: false,
        is_dismissed: false,
        updated_at: persisted.created_at,
    };
    if let Err(e) = state.redis.set_status(&status).await {
        tracing::warn!(notification_id = %persisted.id, "status cache write failed: {e}");
    }

    // Step 8: fire-and-forget last_seen touch.
    {
        let repos = state.repos.clone();
        tokio::spawn(async move {
            if let Err(e) = repos.devices.touch_last_seen(device_id).await {
                tracing::debug!("last_seen touch failed: {e}");
            }
        });
    }

    // Step 9: fan out to every other device of the user.
    fan_out_new_notification(state, &persisted).await;

    crate::observability::record_ingestion("accepted");
    Ok(persisted)
}

fn category_str(category: Category) -> &'static str {
    match category {
        Category::Work => "work",
        Category::Personal => "personal",
        Category::Junk => "junk",
    }
}

async fn fan_out_new_notification(state: &Arc<AppState>, notification: &Notification) {
    let data = serde_json::to_value(notification).unwrap_or_default();
    fan_out(
        state,
        notification.user_id,
        notification.source_device_id,
        EnvelopeKind::NewNotification,
        data,
    )
    .await;
}

/// Delivers to every device of `user_id` other than `source_device_id`:
/// directly through the hub if registered on this instance, otherwise via
/// the bus (for peers) if online elsewhere, otherwise enqueued for
/// durability (§4.6 step 9, §4.3 message queue).
async fn fan_out(
    state: &Arc<AppState>,
    user_id: Uuid,
    source_device_id: Uuid,
    kind: EnvelopeKind,
    data: serde_json::Value,
) {
    let devices = match state.repos.devices.list(user_id).await {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("fan-out device lookup failed: {e}");
            return;
        }
    };
    let online = state.redis.online_devices_for_user(user_id).await.unwrap_or_default();

    let mut needs_bus_publish = false;
    for device in devices.iter().filter(|d| d.id != source_device_id) {
        if state.hub.has_device(user_id, device.id).await {
            let envelope = Envelope::new(kind, data.clone());
            if state.hub.send_to_device(user_id, device.id, envelope).await {
                crate::observability::record_fanout("local", "delivered");
                continue;
            }
        }
        if online.contains(&device.id) {
            needs_bus_publish = true;
        } else {
            let item = QueueItem {
                id: Uuid::new_v4(),
                kind: envelope_kind_str(kind).to_string(),
                data: data.clone(),
                timestamp: Utc::now(),
                retries: 0,
            };
            if let Err(e) = state.redis.enqueue(device.id, &item).await {
                tracing::warn!(device_id = %device.id, "enqueue failed: {e}");
                crate::observability::record_fanout("queue", "failed");
            } else {
                crate::observability::record_fanout("queue", "enqueued");
            }
        }
    }

    if needs_bus_publish {
        let message = BusMessage {
            kind,
            user_id,
            device_id: Some(source_device_id),
            data,
            timestamp: Utc::now(),
        };
        match state.bus.publish(&message).await {
            Ok(()) => crate::observability::record_fanout("bus", "published"),
            Err(e) => {
                tracing::debug!("bus publish failed (best-effort): {e}");
                crate::observability::record_fanout("bus", "failed");
            }
        }
    }
}

fn envelope_kind_str(kind: EnvelopeKind) -> &'static str {
    match kind {
        EnvelopeKind::Ping => "ping",
        EnvelopeKind::Pong => "pong",
        EnvelopeKind::NewNotification => "new_notification",
        EnvelopeKind::NotificationSync => "notification_sync",
        EnvelopeKind::NotificationUpdate => "notification_update",
        EnvelopeKind::DeviceStatus => "device_status",
        EnvelopeKind::NotificationAction => "notification_action",
    }
}

/// Applies a `read`/`dismiss`/`click` action from a device (over HTTP or the
/// hub): persists the ActionRecord + flag mutation, updates the status
/// cache, and publishes `notification_sync` excluding the source device.
pub async fn apply_action(
    state: &Arc<AppState>,
    user_id: Uuid,
    device_id: Uuid,
    notification_id: Uuid,
    action: ActionKind,
) -> Result<()> {
    let notification = state
        .repos
        .notifications
        .get_by_id(notification_id)
        .await?
        .ok_or_else(|| AppError::not_found("notification"))?;
    if notification.user_id != user_id {
        return Err(AppError::authentication("notification does not belong to this user"));
    }
    if notification.is_expired_at(Utc::now()) {
        return Err(AppError::not_found("notification"));
    }

    let (is_read, is_dismissed) = match action {
        ActionKind::Read => (true, notification.is_dismissed),
        ActionKind::Dismissed => (true, true),
        ActionKind::Clicked => (notification.is_read, notification.is_dismissed),
    };

    state.repos.notifications.apply_action_flags(notification_id, is_read, is_dismissed).await?;
    state.repos.action_records.create(notification_id, device_id, action).await?;

    let status = NotificationStatus { id: notification_id, is_read, is_dismissed, updated_at: Utc::now() };
    if let Err(e) = state.redis.set_status(&status).await {
        tracing::warn!(%notification_id, "status cache write failed: {e}");
    }
    if let Err(e) = state.redis.heartbeat(device_id).await {
        tracing::debug!(%device_id, "heartbeat refresh failed: {e}");
    }

    let data = serde_json::json!({
        "notification_id": notification_id,
        "is_read": is_read,
        "is_dismissed": is_dismissed,
        "source_device": device_id,
    });
    let message = BusMessage {
        kind: EnvelopeKind::NotificationSync,
        user_id,
        device_id: Some(device_id),
        data,
        timestamp: Utc::now(),
    };
    if let Err(e) = state.bus.publish(&message).await {
        tracing::debug!("notification_sync publish failed (best-effort): {e}");
    }

    Ok(())
}

/// Presence helper used by the device-heartbeat HTTP and hub paths.
pub async fn refresh_presence(state: &Arc<AppState>, device_id: Uuid) -> Result<()> {
    state.redis.heartbeat(device_id).await.map_err(|e| {
        tracing::warn!(%device_id, "presence refresh failed: {e}");
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_str_covers_every_variant() {
        assert_eq!(category_str(Category::Work), "work");
        assert_eq!(category_str(Category::Personal), "personal");
        assert_eq!(category_str(Category::Junk), "junk");
    }

    #[test]
    fn envelope_kind_str_covers_every_variant() {
        assert_eq!(envelope_kind_str(EnvelopeKind::Ping), "ping");
        assert_eq!(envelope_kind_str(EnvelopeKind::Pong), "pong");
        assert_eq!(envelope_kind_str(EnvelopeKind::NewNotification), "new_notification");
        assert_eq!(envelope_kind_str(EnvelopeKind::NotificationSync), "notification_sync");
        assert_eq!(envelope_kind_str(EnvelopeKind::NotificationUpdate), "notification_update");
        assert_eq!(envelope_kind_str(EnvelopeKind::DeviceStatus), "device_status");
        assert_eq!(envelope_kind_str(EnvelopeKind::NotificationAction), "notification_action");
    }
}
