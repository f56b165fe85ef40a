use crate::config::ServerConfig;
use crate::types::presence::PresenceRecord;
use crate::types::push::Subscription;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    /// Keyed by endpoint; one entry per browser profile.
    pub subscriptions: Arc<Mutex<BTreeMap<String, Subscription>>>,
    /// Keyed by admin id.
    pub presence: Arc<Mutex<BTreeMap<String, PresenceRecord>>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            subscriptions: Arc::new(Mutex::new(BTreeMap::new())),
            presence: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub(crate) fn subscriptions(&self) -> MutexGuard<'_, BTreeMap<String, Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn presence(&self) -> MutexGuard<'_, BTreeMap<String, PresenceRecord>> {
        self.presence.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
