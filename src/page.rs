//! The open page: renders in-page toasts for messages posted by the worker and
//! tracks where the page is navigated to.

use crate::push::SUBSCRIPTION_SYNC_TAG;
use crate::types::push::PageMessage;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastAction {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub action: Option<ToastAction>,
}

struct PageState {
    location: String,
    toasts: Vec<Toast>,
    next_id: u64,
}

#[derive(Clone)]
pub struct Page {
    state: Arc<Mutex<PageState>>,
}

impl Page {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState {
                location: location.into(),
                toasts: Vec::new(),
                next_id: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn location(&self) -> String {
        self.lock().location.clone()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().toasts.clone()
    }

    pub fn show_toast(&self, title: String, body: String, url: String) -> u64 {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        tracing::info!(toast = id, %title, %body, %url, "toast shown");
        state.toasts.push(Toast {
            id,
            title,
            body,
            action: Some(ToastAction {
                label: "View".to_string(),
                url,
            }),
        });
        id
    }

    /// Follows the toast's action and dismisses it. Returns the new location.
    pub fn view(&self, toast_id: u64) -> Option<String> {
        let mut state = self.lock();
        let index = state.toasts.iter().position(|toast| toast.id == toast_id)?;
        let toast = state.toasts.remove(index);
        let url = toast.action?.url;
        tracing::info!(toast = toast_id, %url, "navigating from toast");
        state.location = url.clone();
        Some(url)
    }

    pub fn dismiss(&self, toast_id: u64) -> bool {
        let mut state = self.lock();
        let before = state.toasts.len();
        state.toasts.retain(|toast| toast.id != toast_id);
        state.toasts.len() != before
    }

    /// Consumes worker messages until the worker goes away. `on_subscription_sync`
    /// runs for every sync request tagged for subscription re-delivery.
    pub fn listen<F>(
        &self,
        mut messages: broadcast::Receiver<PageMessage>,
        mut on_subscription_sync: F,
    ) -> JoinHandle<()>
    where
        F: FnMut() + Send + 'static,
    {
        let page = self.clone();
        tokio::spawn(async move {
            loop {
                match messages.recv().await {
                    Ok(PageMessage::Notification { title, body, url }) => {
                        page.show_toast(title, body, url);
                    }
                    Ok(PageMessage::Sync { tag }) if tag == SUBSCRIPTION_SYNC_TAG => {
                        on_subscription_sync();
                    }
                    Ok(PageMessage::Sync { tag }) => {
                        tracing::debug!(%tag, "ignoring sync message");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "page fell behind worker messages");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
