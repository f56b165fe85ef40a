use crate::types::push::{
    DisplayNotification, Permission, Registration, SubscribeOptions, Subscription, WindowClient,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("not supported by this platform: {0}")]
    Unsupported(&'static str),
    #[error("no active worker registration")]
    NoRegistration,
    #[error("invalid application server key")]
    InvalidApplicationServerKey,
    #[error("not allowed: {0}")]
    NotAllowed(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("unknown window client '{0}'")]
    UnknownClient(String),
    #[error("{0}")]
    Other(String),
}

/// Page-side view of the platform: permission, worker registration and the
/// push manager of the active registration.
pub trait PushPlatform: Clone + Send + Sync + 'static {
    fn supports_worker(&self) -> bool;
    fn supports_push(&self) -> bool;
    fn permission(&self) -> Permission;

    /// Shows the consent prompt when the permission is still undecided.
    fn request_permission(&self) -> impl Future<Output = Result<Permission, PlatformError>> + Send;
    fn register_worker(
        &self,
        script_url: &str,
        scope: &str,
    ) -> impl Future<Output = Result<Registration, PlatformError>> + Send;
    fn worker_ready(&self) -> impl Future<Output = Result<Registration, PlatformError>> + Send;
    fn subscription(
        &self,
    ) -> impl Future<Output = Result<Option<Subscription>, PlatformError>> + Send;
    fn subscribe(
        &self,
        options: &SubscribeOptions,
    ) -> impl Future<Output = Result<Subscription, PlatformError>> + Send;
    /// Returns `false` when there was nothing to unsubscribe.
    fn unsubscribe(&self) -> impl Future<Output = Result<bool, PlatformError>> + Send;
}

/// Worker-side view of the platform: system notifications and window clients.
pub trait WorkerHost: Clone + Send + Sync + 'static {
    fn show_notification(
        &self,
        notification: &DisplayNotification,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
    fn close_notification(&self, id: u64) -> impl Future<Output = Result<(), PlatformError>> + Send;
    fn window_clients(&self)
    -> impl Future<Output = Result<Vec<WindowClient>, PlatformError>> + Send;
    fn focus_and_navigate(
        &self,
        client_id: &str,
        url: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
    fn open_window(&self, url: &str) -> impl Future<Output = Result<(), PlatformError>> + Send;
    fn claim_clients(&self) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

/// Named caches available to the worker.
pub trait CacheStorage: Clone + Send + Sync + 'static {
    fn cache_names(&self) -> impl Future<Output = Result<Vec<String>, PlatformError>> + Send;
    /// Fetches every path into `cache`; all or nothing.
    fn add_all(
        &self,
        cache: &str,
        paths: &[String],
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
    fn delete(&self, cache: &str) -> impl Future<Output = Result<bool, PlatformError>> + Send;
}
