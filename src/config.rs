use std::path::PathBuf;
use std::time::Duration;

pub const WORKER_SCRIPT_URL: &str = "/sw.js";
pub const WORKER_SCOPE: &str = "/";
pub const DEFAULT_CACHE_NAME: &str = "property-app-v1";
pub const DEFAULT_PRECACHE: [&str; 3] = ["/", "/manifest.json", "/favicon.ico"];
pub const DEFAULT_CLIENT_PATH_SEGMENT: &str = "/agent-pannel";
pub const DEFAULT_SETTINGS_KEY: &str = "adminSettings";
pub const DEFAULT_ACTIVITY_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Where the back-office API lives and how requests authenticate.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    /// Sent as the `Cookie` header on every request.
    pub session_cookie: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            session_cookie: None,
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub script_url: String,
    pub scope: String,
    pub cache_name: String,
    pub precache: Vec<String>,
    /// Open windows whose URL contains this segment are reused on click.
    pub client_path_segment: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            script_url: WORKER_SCRIPT_URL.to_string(),
            scope: WORKER_SCOPE.to_string(),
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            precache: DEFAULT_PRECACHE.iter().map(|path| path.to_string()).collect(),
            client_path_segment: DEFAULT_CLIENT_PATH_SEGMENT.to_string(),
        }
    }
}

/// The two heartbeat paths are gated separately: interaction events by
/// `activity_interval`, the idle timer wakes every `check_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub activity_interval: Duration,
    pub check_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            activity_interval: DEFAULT_ACTIVITY_INTERVAL,
            check_interval: DEFAULT_ACTIVITY_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client: ClientConfig,
    pub worker: WorkerConfig,
    pub heartbeat: HeartbeatConfig,
    pub admin_id: String,
    pub settings_path: Option<PathBuf>,
    pub settings_key: String,
    pub start_url: String,
    pub push_service: String,
}

#[derive(Clone, Default)]
pub struct ServerConfig {
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
}
