use crate::config::ClientConfig;
use crate::ports::{ApiError, CacheStorage, PlatformError, PresenceApi, PushApi};
use crate::types::push::Subscription;

use reqwest::Url;
use reqwest::header::{COOKIE, HeaderValue};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Back-office API over HTTP. Cookies set by the server are replayed, and the
/// configured session cookie is attached to every request.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    session_cookie: Option<HeaderValue>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base = parse_base(&config.api_base)
            .map_err(|err| ApiError::InvalidConfig(format!("api base {}: {err}", config.api_base)))?;
        let session_cookie = config
            .session_cookie
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|err| ApiError::InvalidConfig(format!("session cookie: {err}")))?;

        let mut builder = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base,
            session_cookie,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint_url(&self.base, segments)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let request = match &self.session_cookie {
            Some(cookie) => request.header(COOKIE, cookie.clone()),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

fn parse_base(raw: &str) -> Result<Url, String> {
    let base = Url::parse(raw).map_err(|err| err.to_string())?;
    if base.cannot_be_a_base() {
        return Err("not a hierarchical URL".to_string());
    }
    Ok(base)
}

/// Appends `segments` to the path of `base`, escaping each one.
fn endpoint_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

impl PushApi for HttpBackend {
    async fn vapid_public_key(&self) -> Result<String, ApiError> {
        let url = self.url(&["api", "push", "vapid-public-key"]);
        let body = self.send(self.client.get(url)).await?.text().await?;
        let key = body.trim().trim_matches('"');
        if key.is_empty() {
            return Err(ApiError::InvalidBody("empty VAPID public key".to_string()));
        }
        Ok(key.to_string())
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<(), ApiError> {
        let url = self.url(&["api", "push", "save-subscription"]);
        self.send(self.client.post(url).json(subscription)).await?;
        Ok(())
    }

    async fn delete_subscription(&self, subscription: &Subscription) -> Result<(), ApiError> {
        let url = self.url(&["api", "push", "delete-subscription"]);
        self.send(self.client.post(url).json(subscription)).await?;
        Ok(())
    }
}

impl PresenceApi for HttpBackend {
    async fn mark_active(&self, admin_id: &str) -> Result<(), ApiError> {
        let url = self.url(&["api", admin_id, "activity"]);
        self.send(self.client.put(url)).await?;
        Ok(())
    }

    async fn mark_offline(&self, admin_id: &str) -> Result<(), ApiError> {
        let url = self.url(&["api", admin_id, "offline"]);
        self.send(self.client.put(url)).await?;
        Ok(())
    }
}

type CacheEntries = BTreeMap<String, Vec<u8>>;

/// Named caches filled by fetching asset paths from the app origin.
#[derive(Clone)]
pub struct HttpCacheStorage {
    client: reqwest::Client,
    origin: Url,
    caches: Arc<Mutex<BTreeMap<String, CacheEntries>>>,
}

impl HttpCacheStorage {
    pub fn new(origin: &str) -> Result<Self, ApiError> {
        let origin = parse_base(origin)
            .map_err(|err| ApiError::InvalidConfig(format!("origin {origin}: {err}")))?;
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            origin,
            caches: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    /// Paths stored in `cache`, or `None` when the cache does not exist.
    pub fn cached(&self, cache: &str) -> Option<Vec<String>> {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cache)
            .map(|entries| entries.keys().cloned().collect())
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, PlatformError> {
        let url = self
            .origin
            .join(path)
            .map_err(|err| PlatformError::Other(format!("invalid asset path {path}: {err}")))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| PlatformError::Other(format!("fetch {path}: {err}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| PlatformError::Other(format!("read {path}: {err}")))?;
        Ok(bytes.to_vec())
    }
}

impl CacheStorage for HttpCacheStorage {
    async fn cache_names(&self) -> Result<Vec<String>, PlatformError> {
        let caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(caches.keys().cloned().collect())
    }

    async fn add_all(&self, cache: &str, paths: &[String]) -> Result<(), PlatformError> {
        let mut fetched = CacheEntries::new();
        for path in paths {
            let body = self.fetch(path).await?;
            fetched.insert(path.clone(), body);
        }

        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        caches.entry(cache.to_string()).or_default().extend(fetched);
        Ok(())
    }

    async fn delete(&self, cache: &str) -> Result<bool, PlatformError> {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(caches.remove(cache).is_some())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::app::tests::{TEST_VAPID_PUBLIC_KEY, vapid_config};
    use crate::config::ServerConfig;
    use crate::state::AppState;
    use crate::types::push::SubscriptionKeys;

    async fn spawn_server(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let router = crate::app::router(state);
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}")
    }

    fn subscription() -> Subscription {
        Subscription {
            endpoint: "https://push.example/send/42".to_string(),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: "BPpSTK9D5iQ".to_string(),
                auth: "c2VjcmV0".to_string(),
            },
        }
    }

    #[test]
    fn endpoint_url__should_escape_segments_and_keep_base_path() {
        // Given
        let base = Url::parse("https://desk.example/backoffice/").expect("parse");

        // When
        let url = endpoint_url(&base, &["api", "ops/7", "activity"]);

        // Then
        assert_eq!(
            url.as_str(),
            "https://desk.example/backoffice/api/ops%2F7/activity"
        );
    }

    #[test]
    fn new__should_reject_relative_api_base() {
        let result = HttpBackend::new(&ClientConfig::new("/api"));

        assert!(matches!(result, Err(ApiError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn vapid_public_key__should_fetch_text_key() {
        // Given
        let base = spawn_server(AppState::new(vapid_config())).await;
        let backend = HttpBackend::new(&ClientConfig::new(base)).expect("backend");

        // When
        let key = backend.vapid_public_key().await.expect("public key");

        // Then
        assert_eq!(key, TEST_VAPID_PUBLIC_KEY);
    }

    #[tokio::test]
    async fn vapid_public_key__should_surface_status_when_unconfigured() {
        let base = spawn_server(AppState::new(ServerConfig::default())).await;
        let backend = HttpBackend::new(&ClientConfig::new(base)).expect("backend");

        let result = backend.vapid_public_key().await;

        assert!(matches!(result, Err(ApiError::Status(503))));
    }

    #[tokio::test]
    async fn save_and_delete_subscription__should_round_trip_through_server() {
        // Given
        let state = AppState::new(ServerConfig::default());
        let base = spawn_server(state.clone()).await;
        let backend = HttpBackend::new(&ClientConfig::new(base)).expect("backend");

        // When
        backend
            .save_subscription(&subscription())
            .await
            .expect("save");

        // Then
        assert_eq!(
            state.subscriptions().get("https://push.example/send/42"),
            Some(&subscription())
        );

        // When
        backend
            .delete_subscription(&subscription())
            .await
            .expect("delete");

        // Then
        assert!(state.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn presence_calls__should_update_server_record() {
        // Given
        let state = AppState::new(ServerConfig::default());
        let base = spawn_server(state.clone()).await;
        let config = ClientConfig {
            session_cookie: Some("session=abc".to_string()),
            ..ClientConfig::new(base)
        };
        let backend = HttpBackend::new(&config).expect("backend");

        // When
        backend.mark_active("ops/7").await.expect("active");

        // Then
        {
            let presence = state.presence();
            let record = presence.get("ops/7").expect("record");
            assert!(record.online);
        }

        // When
        backend.mark_offline("ops/7").await.expect("offline");

        // Then
        assert!(!state.presence()["ops/7"].online);
    }

    #[tokio::test]
    async fn add_all__should_store_every_asset() {
        // Given
        let origin = spawn_server(AppState::new(ServerConfig::default())).await;
        let caches = HttpCacheStorage::new(&origin).expect("caches");
        let paths: Vec<String> = crate::config::DEFAULT_PRECACHE
            .iter()
            .map(|path| path.to_string())
            .collect();

        // When
        caches
            .add_all("property-app-v1", &paths)
            .await
            .expect("add all");

        // Then
        let mut expected = paths.clone();
        expected.sort();
        assert_eq!(caches.cached("property-app-v1"), Some(expected));
        assert_eq!(
            caches.cache_names().await.expect("names"),
            vec!["property-app-v1".to_string()]
        );
    }

    #[tokio::test]
    async fn add_all__should_store_nothing_when_one_asset_fails() {
        // Given
        let origin = spawn_server(AppState::new(ServerConfig::default())).await;
        let caches = HttpCacheStorage::new(&origin).expect("caches");
        let paths = vec!["/manifest.json".to_string(), "/missing.png".to_string()];

        // When
        let result = caches.add_all("property-app-v1", &paths).await;

        // Then
        assert!(result.is_err());
        assert_eq!(caches.cached("property-app-v1"), None);
        assert!(!caches.delete("property-app-v1").await.expect("delete"));
    }
}
