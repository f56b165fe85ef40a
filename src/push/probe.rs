use crate::ports::PushPlatform;
use crate::types::push::{Permission, PermissionResult, PermissionStatus};

pub fn is_supported<P: PushPlatform>(platform: &P) -> bool {
    platform.supports_worker() && platform.supports_push()
}

pub fn permission_status<P: PushPlatform>(platform: &P) -> PermissionStatus {
    if !is_supported(platform) {
        return PermissionStatus::Unsupported;
    }
    platform.permission().into()
}

/// Asks the user for notification permission. Never fails; errors read as
/// "not granted".
pub async fn request_permission<P: PushPlatform>(platform: &P) -> PermissionResult {
    if !is_supported(platform) {
        tracing::debug!("push notifications not supported; skipping permission prompt");
        return PermissionResult {
            supported: false,
            granted: false,
        };
    }

    match platform.request_permission().await {
        Ok(permission) => PermissionResult {
            supported: true,
            granted: permission == Permission::Granted,
        },
        Err(err) => {
            tracing::warn!(error = %err, "notification permission request failed");
            PermissionResult {
                supported: true,
                granted: false,
            }
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryPlatform;

    #[test]
    fn permission_status__should_report_unsupported_without_push() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example").with_support(true, false);

        // Then
        assert!(!is_supported(&platform));
        assert_eq!(permission_status(&platform), PermissionStatus::Unsupported);
    }

    #[test]
    fn permission_status__should_mirror_platform_permission() {
        let platform =
            InMemoryPlatform::new("https://push.example").with_permission(Permission::Denied);

        assert_eq!(permission_status(&platform), PermissionStatus::Denied);
        assert_eq!(permission_status(&platform).as_str(), "denied");
    }

    #[tokio::test]
    async fn request_permission__should_prompt_once_and_report_consent() {
        // Given
        let platform =
            InMemoryPlatform::new("https://push.example").with_consent(Permission::Granted);

        // When
        let result = request_permission(&platform).await;

        // Then
        assert_eq!(
            result,
            PermissionResult {
                supported: true,
                granted: true
            }
        );
        assert_eq!(platform.prompts(), 1);
        assert_eq!(permission_status(&platform), PermissionStatus::Granted);
    }

    #[tokio::test]
    async fn request_permission__should_not_prompt_when_unsupported() {
        // Given
        let platform = InMemoryPlatform::new("https://push.example").with_support(false, true);

        // When
        let result = request_permission(&platform).await;

        // Then
        assert!(!result.supported);
        assert!(!result.granted);
        assert_eq!(platform.prompts(), 0);
    }

    #[tokio::test]
    async fn request_permission__should_report_declined_prompt() {
        let platform =
            InMemoryPlatform::new("https://push.example").with_consent(Permission::Denied);

        let result = request_permission(&platform).await;

        assert!(result.supported);
        assert!(!result.granted);
    }
}
