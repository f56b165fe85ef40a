use crate::config::WorkerConfig;
use crate::ports::PushPlatform;
use crate::push::probe;
use crate::types::push::Registration;

/// Registers the background worker for the whole origin. `None` means the
/// feature is unavailable, not that something fatal happened.
pub async fn register_worker<P: PushPlatform>(
    platform: &P,
    config: &WorkerConfig,
) -> Option<Registration> {
    if !probe::is_supported(platform) {
        tracing::info!("background worker or push messaging not supported");
        return None;
    }

    match platform
        .register_worker(&config.script_url, &config.scope)
        .await
    {
        Ok(registration) => {
            tracing::info!(
                script = %registration.script_url,
                scope = %registration.scope,
                "worker registered"
            );
            Some(registration)
        }
        Err(err) => {
            tracing::warn!(error = %err, script = %config.script_url, "worker registration failed");
            None
        }
    }
}
