use crate::types::push::{
    CLOSE_ACTION, DEFAULT_BADGE, DEFAULT_ICON, DEFAULT_URL, DisplayNotification, FALLBACK_BODY,
    FALLBACK_TITLE, InboundPush, NotificationAction, NotificationContent, NotificationPayload,
    PageMessage, VIBRATION_PATTERN, VIEW_ACTION, WindowClient,
};

/// Classifies the raw body of a push event. Never fails.
pub fn parse_push(data: Option<&[u8]>) -> InboundPush {
    let Some(data) = data.filter(|data| !data.is_empty()) else {
        return InboundPush::Empty;
    };

    match serde_json::from_slice::<NotificationPayload>(data) {
        Ok(payload) => InboundPush::Payload(resolve_payload(payload)),
        Err(err) => InboundPush::Malformed {
            reason: err.to_string(),
        },
    }
}

fn resolve_payload(payload: NotificationPayload) -> NotificationContent {
    NotificationContent {
        title: non_empty(payload.title).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        body: non_empty(payload.body).unwrap_or_else(|| FALLBACK_BODY.to_string()),
        icon: non_empty(payload.icon).unwrap_or_else(|| DEFAULT_ICON.to_string()),
        badge: non_empty(payload.badge).unwrap_or_else(|| DEFAULT_BADGE.to_string()),
        url: non_empty(payload.data.and_then(|data| data.url))
            .unwrap_or_else(|| DEFAULT_URL.to_string()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn display_notification(id: u64, content: &NotificationContent) -> DisplayNotification {
    DisplayNotification {
        id,
        title: content.title.clone(),
        body: content.body.clone(),
        icon: content.icon.clone(),
        badge: content.badge.clone(),
        vibrate: VIBRATION_PATTERN.to_vec(),
        require_interaction: true,
        actions: vec![
            NotificationAction {
                action: VIEW_ACTION.to_string(),
                title: "View Request".to_string(),
            },
            NotificationAction {
                action: CLOSE_ACTION.to_string(),
                title: "Close".to_string(),
            },
        ],
        url: content.url.clone(),
    }
}

pub fn page_message(content: &NotificationContent) -> PageMessage {
    PageMessage::Notification {
        title: content.title.clone(),
        body: content.body.clone(),
        url: content.url.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickRoute {
    Dismiss,
    Focus { client_id: String, url: String },
    Open { url: String },
}

/// Decides where a notification click leads. `close` only dismisses; any
/// other action (or a click on the body) reuses the first window whose URL
/// contains `segment`, else opens a new one.
pub fn route_click(
    action: Option<&str>,
    url: &str,
    clients: &[WindowClient],
    segment: &str,
) -> ClickRoute {
    if action == Some(CLOSE_ACTION) {
        return ClickRoute::Dismiss;
    }

    match clients.iter().find(|client| client.url.contains(segment)) {
        Some(client) => ClickRoute::Focus {
            client_id: client.id.clone(),
            url: url.to_string(),
        },
        None => ClickRoute::Open {
            url: url.to_string(),
        },
    }
}
