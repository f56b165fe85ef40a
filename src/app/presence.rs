use crate::state;
use crate::types::presence::PresenceRecord;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use time::OffsetDateTime;

pub(crate) async fn mark_active(
    State(state): State<state::AppState>,
    Path(admin_id): Path<String>,
) -> StatusCode {
    let now = OffsetDateTime::now_utc();
    let mut presence = state.presence();
    presence.insert(
        admin_id.clone(),
        PresenceRecord {
            admin_id: admin_id.clone(),
            last_active_at: now,
            online: true,
        },
    );
    tracing::debug!(%admin_id, "admin active");
    StatusCode::NO_CONTENT
}

pub(crate) async fn mark_offline(
    State(state): State<state::AppState>,
    Path(admin_id): Path<String>,
) -> StatusCode {
    let mut presence = state.presence();
    presence
        .entry(admin_id.clone())
        .and_modify(|record| record.online = false)
        .or_insert_with(|| PresenceRecord {
            admin_id: admin_id.clone(),
            last_active_at: OffsetDateTime::now_utc(),
            online: false,
        });
    tracing::debug!(%admin_id, "admin offline");
    StatusCode::NO_CONTENT
}

pub(crate) async fn presence_debug(
    State(state): State<state::AppState>,
) -> Json<Vec<PresenceRecord>> {
    let records = state.presence().values().cloned().collect();
    Json(records)
}
