use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceSignal {
    Active,
    Offline,
}

impl PresenceSignal {
    pub fn label(self) -> &'static str {
        match self {
            PresenceSignal::Active => "activity",
            PresenceSignal::Offline => "offline",
        }
    }
}

/// Page interaction events that count as admin activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    PointerDown,
    KeyDown,
    TouchStart,
    Scroll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub admin_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active_at: OffsetDateTime,
    pub online: bool,
}
