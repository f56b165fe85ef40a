//! Headless run of one page and its background worker on the in-memory
//! platform, talking to a real back-office API. Driven by line commands.

use crate::adapters::{HttpBackend, HttpCacheStorage, InMemoryPlatform, TokioTimeProvider};
use crate::config::SessionConfig;
use crate::page::Page;
use crate::ports::ApiError;
use crate::presence::PresenceHeartbeat;
use crate::push::{
    SUBSCRIPTION_SYNC_TAG, ServiceWorker, SubscriptionManager, WorkerError, WorkerEvent,
    WorkerHandle, registration,
};
use crate::settings::{LocalStore, Settings, load_settings, save_settings};
use crate::types::presence::Interaction;
use crate::types::push::{CLOSE_ACTION, Permission, SubscribeOutcome, VIEW_ACTION};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use std::ops::ControlFlow;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error("failed to read commands: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Activity,
    Push(Option<Vec<u8>>),
    Click(Option<String>),
    View,
    Subscribe,
    Revoke,
    Sync,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    match (name, rest) {
        ("activity", "") => Ok(Command::Activity),
        ("push", "") => Ok(Command::Push(None)),
        ("push", payload) => Ok(Command::Push(Some(payload.as_bytes().to_vec()))),
        ("click", "") => Ok(Command::Click(None)),
        ("click", action @ (VIEW_ACTION | CLOSE_ACTION)) => {
            Ok(Command::Click(Some(action.to_string())))
        }
        ("click", other) => Err(format!("unknown notification action '{other}'")),
        ("view", "") => Ok(Command::View),
        ("subscribe", "") => Ok(Command::Subscribe),
        ("revoke", "") => Ok(Command::Revoke),
        ("sync", "") => Ok(Command::Sync),
        ("quit" | "exit", "") => Ok(Command::Quit),
        ("", _) => Err("empty command".to_string()),
        (name, _) => Err(format!("unknown command '{name}'")),
    }
}

pub struct Session {
    platform: InMemoryPlatform,
    worker: WorkerHandle,
    manager: SubscriptionManager<InMemoryPlatform, HttpBackend>,
    heartbeat: PresenceHeartbeat<TokioTimeProvider, HttpBackend>,
    page: Page,
    listener: JoinHandle<()>,
    store: Option<LocalStore>,
    settings_key: String,
    settings: Settings,
}

impl Session {
    /// Registers and activates the worker, restores the subscription from
    /// saved settings and starts the presence heartbeat.
    pub async fn start(config: SessionConfig) -> Result<Self, SessionError> {
        let backend = HttpBackend::new(&config.client)?;
        let caches = HttpCacheStorage::new(&config.client.api_base)?;
        let platform = InMemoryPlatform::new(config.push_service.as_str())
            .with_consent(Permission::Granted)
            .with_window(config.start_url.as_str());

        let worker = ServiceWorker::spawn(platform.clone(), caches, config.worker.clone());
        let manager =
            SubscriptionManager::new(platform.clone(), backend.clone(), config.worker.clone());

        let page = Page::new(config.start_url.as_str());
        let resync = manager.clone();
        let listener = page.listen(worker.subscribe_pages(), move || {
            let manager = resync.clone();
            tokio::spawn(async move {
                log_subscribe_outcome("redeliver", &manager.redeliver().await);
            });
        });

        registration::register_worker(&platform, &config.worker).await;
        worker.install_and_activate().await?;

        let store = config.settings_path.as_ref().map(LocalStore::open);
        let settings = match &store {
            Some(store) => load_settings(store, &config.settings_key),
            None => Settings::default(),
        };
        if let Some(outcome) = manager.sync_with_settings(&settings).await {
            log_subscribe_outcome("startup sync", &outcome);
        }

        let mut heartbeat = PresenceHeartbeat::new(TokioTimeProvider, backend, config.heartbeat);
        heartbeat.start(config.admin_id.as_str());

        Ok(Self {
            platform,
            worker,
            manager,
            heartbeat,
            page,
            listener,
            store,
            settings_key: config.settings_key,
            settings,
        })
    }

    pub async fn execute(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Activity => {
                let emitted = self.heartbeat.on_interaction(Interaction::PointerDown);
                tracing::info!(emitted, "activity");
            }
            Command::Push(data) => self.dispatch(WorkerEvent::Push { data }).await,
            Command::Click(action) => {
                let Some(notification) = self.platform.shown_notifications().pop() else {
                    tracing::warn!("no notification to click");
                    return ControlFlow::Continue(());
                };
                self.dispatch(WorkerEvent::NotificationClick {
                    notification,
                    action,
                })
                .await;
                for window in self.platform.windows() {
                    tracing::info!(id = %window.id, url = %window.url, focused = window.focused, "window");
                }
            }
            Command::View => match self.page.toasts().last() {
                Some(toast) => {
                    self.page.view(toast.id);
                    tracing::info!(location = %self.page.location(), "page navigated");
                }
                None => tracing::warn!("no toast to view"),
            },
            Command::Subscribe => {
                let outcome = self.manager.ensure_subscribed().await;
                log_subscribe_outcome("subscribe", &outcome);
                if outcome.success {
                    self.persist_enabled(true);
                }
            }
            Command::Revoke => {
                let outcome = self.manager.revoke_subscription().await;
                tracing::info!(success = outcome.success, message = %outcome.message, "revoke");
                if outcome.success {
                    self.persist_enabled(false);
                }
            }
            Command::Sync => {
                self.dispatch(WorkerEvent::Sync {
                    tag: SUBSCRIPTION_SYNC_TAG.to_string(),
                })
                .await
            }
            Command::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Page unload: one offline signal, then the worker and page listener stop.
    pub async fn finish(mut self) {
        self.heartbeat.unload().await;
        self.worker.shutdown().await;
        if let Err(err) = self.listener.await {
            tracing::warn!(error = %err, "page listener ended abnormally");
        }
    }

    async fn dispatch(&self, event: WorkerEvent) {
        if let Err(err) = self.worker.dispatch(event).await {
            tracing::error!(error = %err, "worker event not handled");
        }
    }

    fn persist_enabled(&mut self, enabled: bool) {
        self.settings.push_notifications_enabled = enabled;
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = save_settings(store, &self.settings_key, &self.settings) {
            tracing::warn!(error = %err, path = %store.path().display(), "failed to save settings");
        }
    }
}

fn log_subscribe_outcome(context: &'static str, outcome: &SubscribeOutcome) {
    match &outcome.warning {
        Some(warning) => tracing::warn!(context, message = %outcome.message, %warning, "subscription"),
        None if outcome.success => tracing::info!(context, message = %outcome.message, "subscription"),
        None => tracing::warn!(context, message = %outcome.message, "subscription failed"),
    }
}

/// Runs a session on stdin commands until `quit`, end of input or Ctrl-C.
pub async fn run(config: SessionConfig) -> Result<(), SessionError> {
    let mut session = Session::start(config).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                Ok(None)
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                session.finish().await;
                return Err(err.into());
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(command) => {
                if session.execute(command).await.is_break() {
                    break;
                }
            }
            Err(err) => tracing::warn!(%err, "ignoring command"),
        }
    }

    session.finish().await;
    Ok(())
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::app::tests::vapid_config;
    use crate::config::{ClientConfig, HeartbeatConfig, WorkerConfig};
    use crate::state::AppState;

    use std::path::PathBuf;

    #[test]
    fn parse_command__should_read_push_payload_verbatim() {
        // When
        let command = parse_command(r#"push {"title": "Open house"}"#).expect("parse");

        // Then
        assert_eq!(
            command,
            Command::Push(Some(br#"{"title": "Open house"}"#.to_vec()))
        );
    }

    #[test]
    fn parse_command__should_accept_known_click_actions() {
        assert_eq!(parse_command("click"), Ok(Command::Click(None)));
        assert_eq!(
            parse_command("click view"),
            Ok(Command::Click(Some("view".to_string())))
        );
        assert_eq!(
            parse_command(" click close "),
            Ok(Command::Click(Some("close".to_string())))
        );
        assert!(parse_command("click archive").is_err());
    }

    #[test]
    fn parse_command__should_reject_unknown_commands() {
        assert!(parse_command("").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("subscribe now").is_err());
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

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

    fn temp_settings_path(name: &str) -> (PathBuf, PathBuf) {
        let mut root = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        root.push(format!("propdesk-session-{name}-{nanos}"));
        std::fs::create_dir_all(&root).expect("create temp root");
        let path = root.join("local-storage.json");
        (root, path)
    }

    fn session_config(api_base: String, settings_path: PathBuf) -> SessionConfig {
        SessionConfig {
            client: ClientConfig::new(api_base),
            worker: WorkerConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            admin_id: "admin-1".to_string(),
            settings_path: Some(settings_path),
            settings_key: "adminSettings".to_string(),
            start_url: "/agent-pannel".to_string(),
            push_service: "https://push.example".to_string(),
        }
    }

    #[tokio::test]
    async fn session__should_subscribe_relay_click_and_go_offline() {
        // Given
        let (root, settings_path) = temp_settings_path("lifecycle");
        let state = AppState::new(vapid_config());
        let base = spawn_server(state.clone()).await;
        let mut session = Session::start(session_config(base, settings_path.clone()))
            .await
            .expect("start session");

        // When
        let subscribed = session.execute(Command::Subscribe).await;

        // Then
        assert!(subscribed.is_continue());
        assert_eq!(state.subscriptions().len(), 1);
        let store = LocalStore::open(&settings_path);
        assert!(load_settings(&store, "adminSettings").push_notifications_enabled);

        // When
        session
            .execute(Command::Push(Some(
                br#"{"title":"Viewing request","data":{"url":"/agent-pannel/property-requests/5"}}"#
                    .to_vec(),
            )))
            .await;
        session.execute(Command::Click(Some("view".to_string()))).await;

        // Then
        assert!(session.platform.shown_notifications().is_empty());
        let windows = session.platform.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].url, "/agent-pannel/property-requests/5");
        assert!(windows[0].focused);

        // When
        session.execute(Command::Revoke).await;
        let quit = session.execute(Command::Quit).await;
        session.finish().await;

        // Then
        assert!(quit.is_break());
        assert!(state.subscriptions().is_empty());
        assert!(!load_settings(&store, "adminSettings").push_notifications_enabled);
        assert!(!state.presence()["admin-1"].online);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn session__should_restore_subscription_from_saved_settings_without_prompt() {
        // Given
        let (root, settings_path) = temp_settings_path("restore");
        let store = LocalStore::open(&settings_path);
        store
            .set_item("adminSettings", r#"{"pushNotificationsEnabled":true}"#)
            .expect("seed settings");
        let state = AppState::new(vapid_config());
        let base = spawn_server(state.clone()).await;

        // When
        let session = Session::start(session_config(base, settings_path))
            .await
            .expect("start session");

        // Then
        assert_eq!(session.platform.prompts(), 0);
        assert!(state.subscriptions().is_empty());

        session.finish().await;
        std::fs::remove_dir_all(&root).expect("cleanup");
    }
}
