use crate::config::WorkerConfig;
use crate::ports::{CacheStorage, WorkerHost};
use crate::push::relay::{self, ClickRoute};
use crate::types::push::{DisplayNotification, InboundPush, PageMessage};

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Sync tag the page answers by re-delivering its subscription to the server.
pub const SUBSCRIPTION_SYNC_TAG: &str = "push-subscription-sync";

const EVENT_QUEUE_CAPACITY: usize = 64;
const PAGE_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Install,
    Activate,
    Push {
        data: Option<Vec<u8>>,
    },
    NotificationClick {
        notification: DisplayNotification,
        action: Option<String>,
    },
    Sync {
        tag: String,
    },
}

impl WorkerEvent {
    fn name(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Push { .. } => "push",
            WorkerEvent::NotificationClick { .. } => "notificationclick",
            WorkerEvent::Sync { .. } => "sync",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installed,
    Activated,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker is no longer running")]
    Stopped,
}

struct Envelope {
    event: WorkerEvent,
    done: oneshot::Sender<()>,
}

/// Page-side handle to a running worker task.
pub struct WorkerHandle {
    events: mpsc::Sender<Envelope>,
    pages: broadcast::Sender<PageMessage>,
    state: watch::Receiver<WorkerState>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Queues `event` and waits until the worker finished handling it.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<(), WorkerError> {
        let (done, handled) = oneshot::channel();
        self.events
            .send(Envelope { event, done })
            .await
            .map_err(|_| WorkerError::Stopped)?;
        handled.await.map_err(|_| WorkerError::Stopped)
    }

    /// Install never waits for older pages to close, so activation follows
    /// immediately.
    pub async fn install_and_activate(&self) -> Result<(), WorkerError> {
        self.dispatch(WorkerEvent::Install).await?;
        self.dispatch(WorkerEvent::Activate).await
    }

    pub fn subscribe_pages(&self) -> broadcast::Receiver<PageMessage> {
        self.pages.subscribe()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub async fn shutdown(self) {
        drop(self.events);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "worker task ended abnormally");
        }
    }
}

pub struct ServiceWorker<H, C> {
    host: H,
    caches: C,
    config: WorkerConfig,
    pages: broadcast::Sender<PageMessage>,
    state: watch::Sender<WorkerState>,
    next_notification_id: u64,
}

impl<H, C> ServiceWorker<H, C>
where
    H: WorkerHost,
    C: CacheStorage,
{
    pub fn spawn(host: H, caches: C, config: WorkerConfig) -> WorkerHandle {
        let (events, mut inbox) = mpsc::channel::<Envelope>(EVENT_QUEUE_CAPACITY);
        let (pages, _) = broadcast::channel(PAGE_CHANNEL_CAPACITY);
        let (state, state_rx) = watch::channel(WorkerState::Parsed);
        let mut worker = ServiceWorker {
            host,
            caches,
            config,
            pages: pages.clone(),
            state,
            next_notification_id: 1,
        };

        let task = tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                tracing::debug!(event = envelope.event.name(), "worker event");
                worker.handle(envelope.event).await;
                let _ = envelope.done.send(());
            }
            tracing::debug!("worker event queue closed");
        });

        WorkerHandle {
            events,
            pages,
            state: state_rx,
            task,
        }
    }

    async fn handle(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Install => self.install().await,
            WorkerEvent::Activate => self.activate().await,
            WorkerEvent::Push { data } => self.push(data.as_deref()).await,
            WorkerEvent::NotificationClick {
                notification,
                action,
            } => self.notification_click(&notification, action.as_deref()).await,
            WorkerEvent::Sync { tag } => self.sync(tag),
        }
    }

    async fn install(&mut self) {
        if let Err(err) = self
            .caches
            .add_all(&self.config.cache_name, &self.config.precache)
            .await
        {
            tracing::warn!(
                error = %err,
                cache = %self.config.cache_name,
                "precaching failed; installing without cached assets"
            );
        }
        self.state.send_replace(WorkerState::Installed);
    }

    async fn activate(&mut self) {
        match self.caches.cache_names().await {
            Ok(names) => {
                for name in names
                    .into_iter()
                    .filter(|name| *name != self.config.cache_name)
                {
                    match self.caches.delete(&name).await {
                        Ok(_) => tracing::info!(cache = %name, "deleted stale cache"),
                        Err(err) => {
                            tracing::warn!(error = %err, cache = %name, "failed to delete stale cache")
                        }
                    }
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to list caches"),
        }

        if let Err(err) = self.host.claim_clients().await {
            tracing::warn!(error = %err, "failed to claim open pages");
        }
        self.state.send_replace(WorkerState::Activated);
    }

    async fn push(&mut self, data: Option<&[u8]>) {
        if *self.state.borrow() != WorkerState::Activated {
            tracing::warn!("push event received before activation; ignoring");
            return;
        }

        let inbound = relay::parse_push(data);
        if let InboundPush::Malformed { reason } = &inbound {
            tracing::warn!(%reason, "malformed push payload; showing fallback notification");
        }
        let content = inbound.content();

        let notification = relay::display_notification(self.next_notification_id, &content);
        self.next_notification_id += 1;
        if let Err(err) = self.host.show_notification(&notification).await {
            tracing::warn!(error = %err, title = %notification.title, "failed to show notification");
        }

        // No open page is not an error.
        let _ = self.pages.send(relay::page_message(&content));
    }

    async fn notification_click(&mut self, notification: &DisplayNotification, action: Option<&str>) {
        if let Err(err) = self.host.close_notification(notification.id).await {
            tracing::warn!(error = %err, id = notification.id, "failed to close notification");
        }

        let clients = match self.host.window_clients().await {
            Ok(clients) => clients,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list window clients");
                Vec::new()
            }
        };

        match relay::route_click(
            action,
            &notification.url,
            &clients,
            &self.config.client_path_segment,
        ) {
            ClickRoute::Dismiss => {}
            ClickRoute::Focus { client_id, url } => {
                if let Err(err) = self.host.focus_and_navigate(&client_id, &url).await {
                    tracing::warn!(error = %err, client = %client_id, "failed to focus window");
                }
            }
            ClickRoute::Open { url } => {
                if let Err(err) = self.host.open_window(&url).await {
                    tracing::warn!(error = %err, %url, "failed to open window");
                }
            }
        }
    }

    fn sync(&mut self, tag: String) {
        tracing::debug!(%tag, "sync event");
        let _ = self.pages.send(PageMessage::Sync { tag });
    }
}
