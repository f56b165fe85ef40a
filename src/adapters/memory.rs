use crate::ports::{PlatformError, PushPlatform, WorkerHost};
use crate::types::push::{
    DisplayNotification, Permission, Registration, SubscribeOptions, Subscription,
    SubscriptionKeys, WindowClient,
};

use base64::{URL_SAFE_NO_PAD, encode_config};
use rand::RngCore;
use rand::rngs::OsRng;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A simulated browser profile: one permission, at most one worker
/// registration and at most one push subscription.
#[derive(Debug, Clone)]
pub struct InMemoryPlatform {
    push_service: String,
    inner: Arc<Mutex<ProfileState>>,
}

#[derive(Debug)]
struct ProfileState {
    worker_supported: bool,
    push_supported: bool,
    permission: Permission,
    consent: Permission,
    prompts: usize,
    registration: Option<Registration>,
    subscription: Option<StoredSubscription>,
    subscribe_calls: usize,
    notifications: Vec<DisplayNotification>,
    windows: Vec<WindowClient>,
    next_window: u64,
    claimed: bool,
}

#[derive(Debug, Clone)]
struct StoredSubscription {
    subscription: Subscription,
    application_server_key: Vec<u8>,
}

impl InMemoryPlatform {
    pub fn new(push_service: impl Into<String>) -> Self {
        Self {
            push_service: push_service.into().trim_end_matches('/').to_string(),
            inner: Arc::new(Mutex::new(ProfileState {
                worker_supported: true,
                push_supported: true,
                permission: Permission::Default,
                consent: Permission::Granted,
                prompts: 0,
                registration: None,
                subscription: None,
                subscribe_calls: 0,
                notifications: Vec::new(),
                windows: Vec::new(),
                next_window: 1,
                claimed: false,
            })),
        }
    }

    pub fn with_support(self, worker: bool, push: bool) -> Self {
        {
            let mut state = self.state();
            state.worker_supported = worker;
            state.push_supported = push;
        }
        self
    }

    pub fn with_permission(self, permission: Permission) -> Self {
        self.state().permission = permission;
        self
    }

    /// The answer the simulated user gives to the next consent prompt.
    pub fn with_consent(self, consent: Permission) -> Self {
        self.state().consent = consent;
        self
    }

    pub fn with_window(self, url: impl Into<String>) -> Self {
        self.add_window(url);
        self
    }

    pub fn add_window(&self, url: impl Into<String>) -> String {
        let mut state = self.state();
        let id = format!("window-{}", state.next_window);
        state.next_window += 1;
        state.windows.push(WindowClient {
            id: id.clone(),
            url: url.into(),
            focused: false,
        });
        id
    }

    /// Drops the subscription the way a browser does on permission revocation.
    pub fn invalidate_subscription(&self) {
        self.state().subscription = None;
    }

    pub fn prompts(&self) -> usize {
        self.state().prompts
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state().subscribe_calls
    }

    pub fn current_subscription(&self) -> Option<Subscription> {
        self.state()
            .subscription
            .as_ref()
            .map(|stored| stored.subscription.clone())
    }

    pub fn shown_notifications(&self) -> Vec<DisplayNotification> {
        self.state().notifications.clone()
    }

    pub fn windows(&self) -> Vec<WindowClient> {
        self.state().windows.clone()
    }

    pub fn is_claimed(&self) -> bool {
        self.state().claimed
    }

    fn state(&self) -> MutexGuard<'_, ProfileState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue_subscription(&self) -> Subscription {
        let mut token = [0u8; 16];
        let mut p256dh = [0u8; 65];
        let mut auth = [0u8; 16];
        let mut rng = OsRng;
        rng.fill_bytes(&mut token);
        rng.fill_bytes(&mut p256dh);
        rng.fill_bytes(&mut auth);
        p256dh[0] = 0x04;

        Subscription {
            endpoint: format!(
                "{}/{}",
                self.push_service,
                encode_config(token, URL_SAFE_NO_PAD)
            ),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: encode_config(p256dh, URL_SAFE_NO_PAD),
                auth: encode_config(auth, URL_SAFE_NO_PAD),
            },
        }
    }
}

fn is_uncompressed_p256_point(key: &[u8]) -> bool {
    key.len() == 65 && key[0] == 0x04
}

impl PushPlatform for InMemoryPlatform {
    fn supports_worker(&self) -> bool {
        self.state().worker_supported
    }

    fn supports_push(&self) -> bool {
        self.state().push_supported
    }

    fn permission(&self) -> Permission {
        self.state().permission
    }

    async fn request_permission(&self) -> Result<Permission, PlatformError> {
        let mut state = self.state();
        if !state.push_supported {
            return Err(PlatformError::Unsupported("notifications"));
        }
        if state.permission == Permission::Default {
            state.prompts += 1;
            state.permission = state.consent;
        }
        Ok(state.permission)
    }

    async fn register_worker(
        &self,
        script_url: &str,
        scope: &str,
    ) -> Result<Registration, PlatformError> {
        let mut state = self.state();
        if !state.worker_supported {
            return Err(PlatformError::Unsupported("background worker"));
        }
        let registration = Registration {
            script_url: script_url.to_string(),
            scope: scope.to_string(),
        };
        state.registration = Some(registration.clone());
        Ok(registration)
    }

    async fn worker_ready(&self) -> Result<Registration, PlatformError> {
        self.state()
            .registration
            .clone()
            .ok_or(PlatformError::NoRegistration)
    }

    async fn subscription(&self) -> Result<Option<Subscription>, PlatformError> {
        let state = self.state();
        if state.registration.is_none() {
            return Err(PlatformError::NoRegistration);
        }
        Ok(state
            .subscription
            .as_ref()
            .map(|stored| stored.subscription.clone()))
    }

    async fn subscribe(&self, options: &SubscribeOptions) -> Result<Subscription, PlatformError> {
        {
            let mut state = self.state();
            state.subscribe_calls += 1;
            if state.registration.is_none() {
                return Err(PlatformError::NoRegistration);
            }
            if state.permission != Permission::Granted {
                return Err(PlatformError::NotAllowed(
                    "notification permission not granted".to_string(),
                ));
            }
            if !options.user_visible_only {
                return Err(PlatformError::NotAllowed(
                    "silent push is not supported; user_visible_only must be set".to_string(),
                ));
            }
            if !is_uncompressed_p256_point(&options.application_server_key) {
                return Err(PlatformError::InvalidApplicationServerKey);
            }
            if let Some(stored) = state.subscription.as_ref() {
                if stored.application_server_key != options.application_server_key {
                    return Err(PlatformError::InvalidState(
                        "a subscription with a different application server key exists"
                            .to_string(),
                    ));
                }
                return Ok(stored.subscription.clone());
            }
        }

        let subscription = self.issue_subscription();
        self.state().subscription = Some(StoredSubscription {
            subscription: subscription.clone(),
            application_server_key: options.application_server_key.clone(),
        });
        Ok(subscription)
    }

    async fn unsubscribe(&self) -> Result<bool, PlatformError> {
        Ok(self.state().subscription.take().is_some())
    }
}

impl WorkerHost for InMemoryPlatform {
    async fn show_notification(
        &self,
        notification: &DisplayNotification,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        if state.permission != Permission::Granted {
            return Err(PlatformError::NotAllowed(
                "notification permission not granted".to_string(),
            ));
        }
        state.notifications.push(notification.clone());
        Ok(())
    }

    async fn close_notification(&self, id: u64) -> Result<(), PlatformError> {
        self.state()
            .notifications
            .retain(|notification| notification.id != id);
        Ok(())
    }

    async fn window_clients(&self) -> Result<Vec<WindowClient>, PlatformError> {
        Ok(self.state().windows.clone())
    }

    async fn focus_and_navigate(&self, client_id: &str, url: &str) -> Result<(), PlatformError> {
        let mut state = self.state();
        if !state.windows.iter().any(|window| window.id == client_id) {
            return Err(PlatformError::UnknownClient(client_id.to_string()));
        }
        for window in state.windows.iter_mut() {
            window.focused = window.id == client_id;
            if window.focused {
                window.url = url.to_string();
            }
        }
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), PlatformError> {
        let id = self.add_window(url);
        let mut state = self.state();
        for window in state.windows.iter_mut() {
            window.focused = window.id == id;
        }
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        self.state().claimed = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    fn server_key() -> Vec<u8> {
        let mut key = vec![7u8; 65];
        key[0] = 0x04;
        key
    }

    async fn registered_platform() -> InMemoryPlatform {
        let platform =
            InMemoryPlatform::new("https://push.example/").with_permission(Permission::Granted);
        platform
            .register_worker("/sw.js", "/")
            .await
            .expect("register worker");
        platform
    }

    #[tokio::test]
    async fn subscribe__should_reuse_existing_subscription_for_same_key() {
        // Given
        let platform = registered_platform().await;
        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key: server_key(),
        };

        // When
        let first = platform.subscribe(&options).await.expect("first subscribe");
        let second = platform.subscribe(&options).await.expect("second subscribe");

        // Then
        assert_eq!(first, second);
        assert!(first.endpoint.starts_with("https://push.example/"));
        assert_eq!(platform.current_subscription(), Some(first));
    }

    #[tokio::test]
    async fn subscribe__should_reject_silent_push() {
        let platform = registered_platform().await;
        let options = SubscribeOptions {
            user_visible_only: false,
            application_server_key: server_key(),
        };

        let result = platform.subscribe(&options).await;

        assert!(matches!(result, Err(PlatformError::NotAllowed(_))));
    }

    #[tokio::test]
    async fn subscribe__should_reject_malformed_server_key() {
        let platform = registered_platform().await;
        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key: vec![4, 1, 2],
        };

        let result = platform.subscribe(&options).await;

        assert!(matches!(
            result,
            Err(PlatformError::InvalidApplicationServerKey)
        ));
    }

    #[tokio::test]
    async fn subscribe__should_require_registration() {
        let platform =
            InMemoryPlatform::new("https://push.example").with_permission(Permission::Granted);
        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key: server_key(),
        };

        let result = platform.subscribe(&options).await;

        assert!(matches!(result, Err(PlatformError::NoRegistration)));
    }

    #[tokio::test]
    async fn request_permission__should_not_prompt_after_decision() {
        // Given
        let platform =
            InMemoryPlatform::new("https://push.example").with_permission(Permission::Denied);

        // When
        let permission = platform.request_permission().await.expect("permission");

        // Then
        assert_eq!(permission, Permission::Denied);
        assert_eq!(platform.prompts(), 0);
    }

    #[tokio::test]
    async fn focus_and_navigate__should_focus_only_target_window() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example")
            .with_window("/")
            .with_window("/agent-pannel/dashboard");

        // When
        platform
            .focus_and_navigate("window-2", "/agent-pannel/property-requests")
            .await
            .expect("navigate");

        // Then
        let windows = platform.windows();
        assert!(!windows[0].focused);
        assert!(windows[1].focused);
        assert_eq!(windows[1].url, "/agent-pannel/property-requests");
    }
}
