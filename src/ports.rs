pub mod api;
pub mod platform;
pub mod push;
pub mod time;

pub use api::{ApiError, PresenceApi, PushApi};
pub use platform::{CacheStorage, PlatformError, PushPlatform, WorkerHost};
pub use push::PushSender;
pub use time::TimeProvider;
