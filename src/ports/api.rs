use crate::types::push::Subscription;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    InvalidBody(String),
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Push endpoints of the back-office API.
pub trait PushApi: Clone + Send + Sync + 'static {
    fn vapid_public_key(&self) -> impl Future<Output = Result<String, ApiError>> + Send;
    fn save_subscription(
        &self,
        subscription: &Subscription,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn delete_subscription(
        &self,
        subscription: &Subscription,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Admin presence endpoints. Neither call carries a body.
pub trait PresenceApi: Clone + Send + Sync + 'static {
    fn mark_active(&self, admin_id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn mark_offline(&self, admin_id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}
