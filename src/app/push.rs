use crate::adapters::WebPushSender;
use crate::push as push_service;
use crate::push::DeliveryReport;
use crate::state;
use crate::types::push::{NotificationData, NotificationPayload, Subscription};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

fn error(status: StatusCode, error: &'static str) -> (StatusCode, Json<ErrorResponse>) {
    (status, Json(ErrorResponse { error }))
}

fn ready_vapid(state: &state::AppState) -> ApiResult<crate::types::push::VapidConfig> {
    match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => Ok(vapid),
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            Err(error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Push notifications are not configured.",
            ))
        }
    }
}

/// The client expects the bare key as the response body, not JSON.
pub(crate) async fn vapid_public_key(State(state): State<state::AppState>) -> ApiResult<String> {
    Ok(ready_vapid(&state)?.public_key)
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SaveResponse {
    pub(crate) status: String,
}

fn validate(subscription: &Subscription) -> ApiResult<()> {
    if subscription.endpoint.trim().is_empty()
        || subscription.keys.p256dh.trim().is_empty()
        || subscription.keys.auth.trim().is_empty()
    {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "endpoint, keys.p256dh, and keys.auth are required.",
        ));
    }
    Ok(())
}

pub(crate) async fn save_subscription(
    State(state): State<state::AppState>,
    Json(subscription): Json<Subscription>,
) -> ApiResult<(StatusCode, Json<SaveResponse>)> {
    validate(&subscription)?;
    let endpoint = subscription.endpoint.clone();
    let replaced = state
        .subscriptions()
        .insert(endpoint.clone(), subscription)
        .is_some();
    tracing::info!(%endpoint, replaced, "subscription saved");
    Ok((
        StatusCode::CREATED,
        Json(SaveResponse {
            status: "saved".to_string(),
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DeleteResponse {
    pub(crate) status: String,
    pub(crate) removed: bool,
}

pub(crate) async fn delete_subscription(
    State(state): State<state::AppState>,
    Json(subscription): Json<Subscription>,
) -> ApiResult<Json<DeleteResponse>> {
    if subscription.endpoint.trim().is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "endpoint is required."));
    }
    let removed = state
        .subscriptions()
        .remove(&subscription.endpoint)
        .is_some();
    tracing::info!(endpoint = %subscription.endpoint, removed, "subscription deleted");
    Ok(Json(DeleteResponse {
        status: "deleted".to_string(),
        removed,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TestPushRequest {
    pub(crate) title: Option<String>,
    pub(crate) body: Option<String>,
    pub(crate) url: Option<String>,
}

pub(crate) async fn push_test(
    State(state): State<state::AppState>,
    Json(request): Json<TestPushRequest>,
) -> ApiResult<Json<DeliveryReport>> {
    let vapid = ready_vapid(&state)?;

    let payload = NotificationPayload {
        title: Some(
            request
                .title
                .unwrap_or_else(|| "Test notification".to_string()),
        ),
        body: request.body,
        icon: None,
        badge: None,
        data: request.url.map(|url| NotificationData { url: Some(url) }),
    };
    let payload = serde_json::to_string(&payload).map_err(|err| {
        tracing::error!(error = %err, "failed to encode test payload");
        error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode notification.",
        )
    })?;

    let sender = WebPushSender::new(vapid).map_err(|err| {
        tracing::error!(error = %err, "failed to init web-push");
        error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to initialize push sender.",
        )
    })?;

    let subscriptions: Vec<Subscription> = state.subscriptions().values().cloned().collect();
    let report = push_service::deliver_all(&sender, &subscriptions, &payload).await;
    tracing::info!(sent = report.sent, failed = report.failed, "test push delivered");
    Ok(Json(report))
}

pub(crate) async fn subscriptions_debug(
    State(state): State<state::AppState>,
) -> Json<Vec<Subscription>> {
    let subscriptions = state.subscriptions().values().cloned().collect();
    Json(subscriptions)
}
