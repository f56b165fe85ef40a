use crate::ports::PushSender;
use crate::types::push::Subscription;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends `payload` to every subscription; a failing endpoint does not stop
/// the others.
pub async fn deliver_all<S: PushSender>(
    sender: &S,
    subscriptions: &[Subscription],
    payload: &str,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for subscription in subscriptions {
        match sender.send(subscription, payload).await {
            Ok(()) => report.sent += 1,
            Err(err) => {
                tracing::warn!(error = %err, endpoint = %subscription.endpoint, "push delivery failed");
                report.failed += 1;
            }
        }
    }
    report
}
