use serde::{Deserialize, Serialize};

pub const FALLBACK_TITLE: &str = "New Property Request";
pub const FALLBACK_BODY: &str = "You have a new property request";
pub const DEFAULT_ICON: &str = "/logo192.png";
pub const DEFAULT_BADGE: &str = "/logo192.png";
pub const DEFAULT_URL: &str = "/agent-pannel/property-requests";
pub const VIBRATION_PATTERN: [u32; 3] = [200, 100, 200];

pub const VIEW_ACTION: &str = "view";
pub const CLOSE_ACTION: &str = "close";

/// Push subscription as issued by the platform and mirrored on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

/// Platform-level notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Default,
    Granted,
    Denied,
}

/// Permission as reported to callers, including the unsupported case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Unsupported,
    Default,
    Granted,
    Denied,
}

impl From<Permission> for PermissionStatus {
    fn from(permission: Permission) -> Self {
        match permission {
            Permission::Default => PermissionStatus::Default,
            Permission::Granted => PermissionStatus::Granted,
            Permission::Denied => PermissionStatus::Denied,
        }
    }
}

impl PermissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionStatus::Unsupported => "unsupported",
            PermissionStatus::Default => "default",
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionResult {
    pub supported: bool,
    pub granted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub script_url: String,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    pub application_server_key: Vec<u8>,
}

/// Wire shape of a push payload. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Notification content after boundary validation; every field is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub url: String,
}

impl NotificationContent {
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            body: FALLBACK_BODY.to_string(),
            icon: DEFAULT_ICON.to_string(),
            badge: DEFAULT_BADGE.to_string(),
            url: DEFAULT_URL.to_string(),
        }
    }
}

/// An inbound push event, classified at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPush {
    Payload(NotificationContent),
    Empty,
    Malformed { reason: String },
}

impl InboundPush {
    pub fn content(self) -> NotificationContent {
        match self {
            InboundPush::Payload(content) => content,
            InboundPush::Empty | InboundPush::Malformed { .. } => NotificationContent::fallback(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A system notification as handed to the worker host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayNotification {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focused: bool,
}

/// Messages the worker posts to open pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMessage {
    Notification {
        title: String,
        body: String,
        url: String,
    },
    Sync {
        tag: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl SubscribeOutcome {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            subscription: None,
            message: message.into(),
            warning: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevokeOutcome {
    pub success: bool,
    pub message: String,
}
