use crate::config::WorkerConfig;
use crate::ports::{PushApi, PushPlatform};
use crate::push::key::url_base64_to_bytes;
use crate::push::{probe, registration};
use crate::settings::Settings;
use crate::types::push::{
    PermissionStatus, RevokeOutcome, SubscribeOptions, SubscribeOutcome, Subscription,
};

use std::sync::Arc;
use tokio::sync::Mutex;

/// Creates, reuses and revokes the browser's push subscription and mirrors it
/// on the server. Calls are serialized so two overlapping `ensure_subscribed`
/// calls cannot both create a subscription.
#[derive(Clone)]
pub struct SubscriptionManager<P, A> {
    platform: P,
    api: A,
    worker: WorkerConfig,
    in_flight: Arc<Mutex<()>>,
}

impl<P, A> SubscriptionManager<P, A>
where
    P: PushPlatform,
    A: PushApi,
{
    pub fn new(platform: P, api: A, worker: WorkerConfig) -> Self {
        Self {
            platform,
            api,
            worker,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    pub async fn ensure_subscribed(&self) -> SubscribeOutcome {
        let _guard = self.in_flight.lock().await;

        if !probe::is_supported(&self.platform) {
            return SubscribeOutcome::failed("Push notifications are not supported");
        }

        if probe::permission_status(&self.platform) != PermissionStatus::Granted {
            let result = probe::request_permission(&self.platform).await;
            if !result.granted {
                tracing::info!("notification permission not granted");
                return SubscribeOutcome::failed("Notification permission denied");
            }
        }

        if registration::register_worker(&self.platform, &self.worker)
            .await
            .is_none()
        {
            return SubscribeOutcome::failed("Failed to register background worker");
        }
        if let Err(err) = self.platform.worker_ready().await {
            tracing::warn!(error = %err, "background worker never became ready");
            return SubscribeOutcome::failed("Background worker is not ready");
        }

        let subscription = match self.platform.subscription().await {
            Ok(Some(existing)) => {
                tracing::debug!(endpoint = %existing.endpoint, "reusing existing push subscription");
                existing
            }
            Ok(None) => match self.create_subscription().await {
                Ok(created) => created,
                Err(message) => return SubscribeOutcome::failed(message),
            },
            Err(err) => {
                tracing::warn!(error = %err, "failed to read push subscription");
                return SubscribeOutcome::failed("Failed to read push subscription");
            }
        };

        self.deliver(subscription).await
    }

    async fn create_subscription(&self) -> Result<Subscription, String> {
        let public_key = self.api.vapid_public_key().await.map_err(|err| {
            tracing::warn!(error = %err, "failed to fetch VAPID public key");
            "Failed to fetch server public key".to_string()
        })?;
        let application_server_key = url_base64_to_bytes(&public_key).map_err(|err| {
            tracing::warn!(error = %err, "server public key could not be decoded");
            "Server public key is invalid".to_string()
        })?;

        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key,
        };
        let subscription = self.platform.subscribe(&options).await.map_err(|err| {
            tracing::warn!(error = %err, "push subscribe failed");
            format!("Failed to subscribe to push notifications: {err}")
        })?;
        tracing::info!(endpoint = %subscription.endpoint, "push subscription created");
        Ok(subscription)
    }

    async fn deliver(&self, subscription: Subscription) -> SubscribeOutcome {
        match self.api.save_subscription(&subscription).await {
            Ok(()) => SubscribeOutcome {
                success: true,
                subscription: Some(subscription),
                message: "Push notifications enabled".to_string(),
                warning: None,
            },
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    endpoint = %subscription.endpoint,
                    "failed to save subscription on server; keeping local subscription"
                );
                SubscribeOutcome {
                    success: true,
                    subscription: Some(subscription),
                    message: "Push notifications enabled".to_string(),
                    warning: Some(
                        "Subscription created locally but could not be saved on the server"
                            .to_string(),
                    ),
                }
            }
        }
    }

    /// Sends the current local subscription to the server again, without
    /// prompting or creating anything.
    pub async fn redeliver(&self) -> SubscribeOutcome {
        let _guard = self.in_flight.lock().await;

        match self.platform.subscription().await {
            Ok(Some(subscription)) => self.deliver(subscription).await,
            Ok(None) => SubscribeOutcome::failed("No push subscription to deliver"),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read push subscription");
                SubscribeOutcome::failed("Failed to read push subscription")
            }
        }
    }

    pub async fn revoke_subscription(&self) -> RevokeOutcome {
        let _guard = self.in_flight.lock().await;

        if !probe::is_supported(&self.platform) {
            return RevokeOutcome {
                success: true,
                message: "Push notifications are not supported".to_string(),
            };
        }

        let subscription = match self.platform.subscription().await {
            Ok(Some(subscription)) => subscription,
            Ok(None) => {
                return RevokeOutcome {
                    success: true,
                    message: "No active push subscription".to_string(),
                };
            }
            Err(err) => {
                tracing::debug!(error = %err, "no readable push subscription; nothing to revoke");
                return RevokeOutcome {
                    success: true,
                    message: "No active push subscription".to_string(),
                };
            }
        };

        if let Err(err) = self.api.delete_subscription(&subscription).await {
            tracing::warn!(
                error = %err,
                endpoint = %subscription.endpoint,
                "failed to delete subscription on server"
            );
        }

        match self.platform.unsubscribe().await {
            Ok(_) => {
                tracing::info!(endpoint = %subscription.endpoint, "push subscription revoked");
                RevokeOutcome {
                    success: true,
                    message: "Push notifications disabled".to_string(),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "local unsubscribe failed");
                RevokeOutcome {
                    success: false,
                    message: format!("Failed to unsubscribe: {err}"),
                }
            }
        }
    }

    /// Startup path: re-establishes the subscription only when the user opted
    /// in earlier and permission is already granted. Never prompts.
    pub async fn sync_with_settings(&self, settings: &Settings) -> Option<SubscribeOutcome> {
        if !settings.push_notifications_enabled {
            tracing::debug!("push notifications disabled in settings");
            return None;
        }
        if probe::permission_status(&self.platform) != PermissionStatus::Granted {
            tracing::info!("push notifications enabled in settings but permission not granted");
            return None;
        }
        Some(self.ensure_subscribed().await)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::InMemoryPlatform;
    use crate::ports::ApiError;
    use crate::types::push::Permission;
    use std::sync::Mutex as StdMutex;

    pub(crate) const VAPID_PUBLIC_KEY: &str =
        "BCRweRf_U5iQM4pKNucGRzM6OuLp8Hisa8yX0N2ePIf1oxKitvFT6qvuGgYoTxlMatMDaytXbZR3rVClc2w_p6U";

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum ApiCall {
        PublicKey,
        Save(String),
        Delete(String),
    }

    #[derive(Clone, Default)]
    pub(crate) struct TestPushApi {
        pub(crate) calls: Arc<StdMutex<Vec<ApiCall>>>,
        pub(crate) fail_save: bool,
        pub(crate) fail_delete: bool,
        pub(crate) public_key: Option<String>,
    }

    impl TestPushApi {
        pub(crate) fn calls(&self) -> Vec<ApiCall> {
            self.calls.lock().expect("calls lock").clone()
        }

        fn record(&self, call: ApiCall) {
            self.calls.lock().expect("calls lock").push(call);
        }
    }

    impl PushApi for TestPushApi {
        async fn vapid_public_key(&self) -> Result<String, ApiError> {
            self.record(ApiCall::PublicKey);
            tokio::task::yield_now().await;
            Ok(self
                .public_key
                .clone()
                .unwrap_or_else(|| VAPID_PUBLIC_KEY.to_string()))
        }

        async fn save_subscription(&self, subscription: &Subscription) -> Result<(), ApiError> {
            self.record(ApiCall::Save(subscription.endpoint.clone()));
            if self.fail_save {
                return Err(ApiError::Status(500));
            }
            Ok(())
        }

        async fn delete_subscription(&self, subscription: &Subscription) -> Result<(), ApiError> {
            self.record(ApiCall::Delete(subscription.endpoint.clone()));
            if self.fail_delete {
                return Err(ApiError::Status(502));
            }
            Ok(())
        }
    }

    fn manager(
        platform: &InMemoryPlatform,
        api: &TestPushApi,
    ) -> SubscriptionManager<InMemoryPlatform, TestPushApi> {
        SubscriptionManager::new(platform.clone(), api.clone(), WorkerConfig::default())
    }

    #[tokio::test]
    async fn ensure_subscribed__should_prompt_subscribe_and_save() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example");
        let api = TestPushApi::default();

        // When
        let outcome = manager(&platform, &api).ensure_subscribed().await;

        // Then
        assert!(outcome.success);
        assert!(outcome.warning.is_none());
        let subscription = outcome.subscription.expect("subscription");
        assert_eq!(platform.prompts(), 1);
        assert_eq!(
            api.calls(),
            vec![ApiCall::PublicKey, ApiCall::Save(subscription.endpoint)]
        );
    }

    #[tokio::test]
    async fn ensure_subscribed__should_be_idempotent() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example");
        let api = TestPushApi::default();
        let manager = manager(&platform, &api);

        // When
        let first = manager.ensure_subscribed().await;
        let second = manager.ensure_subscribed().await;

        // Then
        let first = first.subscription.expect("first subscription");
        let second = second.subscription.expect("second subscription");
        assert_eq!(first.endpoint, second.endpoint);
        assert_eq!(platform.subscribe_calls(), 1);
        let key_fetches = api
            .calls()
            .into_iter()
            .filter(|call| *call == ApiCall::PublicKey)
            .count();
        assert_eq!(key_fetches, 1);
    }

    #[tokio::test]
    async fn ensure_subscribed__should_serialize_concurrent_calls() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example");
        let api = TestPushApi::default();
        let manager = manager(&platform, &api);

        // When
        let (first, second) = tokio::join!(manager.ensure_subscribed(), manager.ensure_subscribed());

        // Then
        assert_eq!(platform.subscribe_calls(), 1);
        assert_eq!(
            first.subscription.expect("first").endpoint,
            second.subscription.expect("second").endpoint
        );
    }

    #[tokio::test]
    async fn ensure_subscribed__should_fail_when_permission_denied() {
        // Given
        let platform =
            InMemoryPlatform::new("https://push.example").with_consent(Permission::Denied);
        let api = TestPushApi::default();

        // When
        let outcome = manager(&platform, &api).ensure_subscribed().await;

        // Then
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Notification permission denied");
        assert!(api.calls().is_empty());
        assert_eq!(platform.subscribe_calls(), 0);
    }

    #[tokio::test]
    async fn ensure_subscribed__should_fail_softly_when_unsupported() {
        let platform = InMemoryPlatform::new("https://push.example").with_support(true, false);
        let api = TestPushApi::default();

        let outcome = manager(&platform, &api).ensure_subscribed().await;

        assert!(!outcome.success);
        assert_eq!(platform.prompts(), 0);
    }

    #[tokio::test]
    async fn ensure_subscribed__should_downgrade_save_failure_to_warning() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example");
        let api = TestPushApi {
            fail_save: true,
            ..Default::default()
        };

        // When
        let outcome = manager(&platform, &api).ensure_subscribed().await;

        // Then
        assert!(outcome.success);
        assert!(outcome.warning.is_some());
        assert_eq!(platform.current_subscription(), outcome.subscription);
    }

    #[tokio::test]
    async fn ensure_subscribed__should_fail_on_undecodable_server_key() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example");
        let api = TestPushApi {
            public_key: Some("A".to_string()),
            ..Default::default()
        };

        // When
        let outcome = manager(&platform, &api).ensure_subscribed().await;

        // Then
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Server public key is invalid");
        assert_eq!(platform.subscribe_calls(), 0);
    }

    #[tokio::test]
    async fn revoke_subscription__should_be_noop_without_subscription() {
        // Given
        let platform =
            InMemoryPlatform::new("https://push.example").with_permission(Permission::Granted);
        let api = TestPushApi::default();

        // When
        let outcome = manager(&platform, &api).revoke_subscription().await;

        // Then
        assert!(outcome.success);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn revoke_subscription__should_unsubscribe_even_when_server_delete_fails() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example");
        let api = TestPushApi {
            fail_delete: true,
            ..Default::default()
        };
        let manager = manager(&platform, &api);
        let endpoint = manager
            .ensure_subscribed()
            .await
            .subscription
            .expect("subscription")
            .endpoint;

        // When
        let outcome = manager.revoke_subscription().await;

        // Then
        assert!(outcome.success);
        assert!(platform.current_subscription().is_none());
        assert!(api.calls().contains(&ApiCall::Delete(endpoint)));
    }

    #[tokio::test]
    async fn redeliver__should_resend_existing_subscription() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example");
        let api = TestPushApi::default();
        let manager = manager(&platform, &api);
        let endpoint = manager
            .ensure_subscribed()
            .await
            .subscription
            .expect("subscription")
            .endpoint;

        // When
        let outcome = manager.redeliver().await;

        // Then
        assert!(outcome.success);
        let saves = api
            .calls()
            .into_iter()
            .filter(|call| *call == ApiCall::Save(endpoint.clone()))
            .count();
        assert_eq!(saves, 2);
        assert_eq!(platform.subscribe_calls(), 1);
    }

    #[tokio::test]
    async fn sync_with_settings__should_skip_when_disabled() {
        let platform =
            InMemoryPlatform::new("https://push.example").with_permission(Permission::Granted);
        let api = TestPushApi::default();

        let outcome = manager(&platform, &api)
            .sync_with_settings(&Settings::default())
            .await;

        assert!(outcome.is_none());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn sync_with_settings__should_not_prompt_at_startup() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example");
        let api = TestPushApi::default();
        let settings = Settings {
            push_notifications_enabled: true,
            ..Default::default()
        };

        // When
        let outcome = manager(&platform, &api).sync_with_settings(&settings).await;

        // Then
        assert!(outcome.is_none());
        assert_eq!(platform.prompts(), 0);
    }

    #[tokio::test]
    async fn sync_with_settings__should_restore_subscription_when_enabled_and_granted() {
        // Given
        let platform =
            InMemoryPlatform::new("https://push.example").with_permission(Permission::Granted);
        let api = TestPushApi::default();
        let settings = Settings {
            push_notifications_enabled: true,
            ..Default::default()
        };

        // When
        let outcome = manager(&platform, &api)
            .sync_with_settings(&settings)
            .await
            .expect("outcome");

        // Then
        assert!(outcome.success);
        assert!(platform.current_subscription().is_some());
    }
}
