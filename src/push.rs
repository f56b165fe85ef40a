//! Push notification lifecycle: the page-side probe, worker registration and
//! subscription manager, the worker-side relay, and server-side delivery.

mod delivery;
pub mod key;
pub mod probe;
pub mod registration;
pub mod relay;
pub mod subscription;
pub(crate) mod vapid;
pub mod worker;

pub use delivery::{DeliveryReport, deliver_all};
pub use key::{KeyDecodeError, url_base64_to_bytes};
pub use subscription::SubscriptionManager;
pub(crate) use vapid::{VapidConfigStatus, load_vapid_config};
pub use vapid::{VapidCredentials, generate_vapid_credentials};
pub use worker::{
    SUBSCRIPTION_SYNC_TAG, ServiceWorker, WorkerError, WorkerEvent, WorkerHandle, WorkerState,
};
