use crate::config::HeartbeatConfig;
use crate::ports::{PresenceApi, TimeProvider};
use crate::types::presence::{Interaction, PresenceSignal};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use tokio::task::JoinHandle;

#[derive(Debug)]
enum Phase {
    Idle,
    Running {
        admin_id: String,
        last_signal_at: OffsetDateTime,
    },
    Stopped,
}

/// Tells the server a signed-in admin is active, throttled to one signal per
/// `activity_interval`, and marks them offline once when the page goes away.
///
/// Every instance owns its own clock state and timer; network calls are
/// fire-and-forget and only logged on failure.
pub struct PresenceHeartbeat<T, A> {
    time: T,
    emitter: Emitter<A>,
    config: HeartbeatConfig,
    phase: Arc<Mutex<Phase>>,
    ticker: Option<JoinHandle<()>>,
}

#[derive(Clone)]
struct Emitter<A> {
    api: A,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl<A: PresenceApi> Emitter<A> {
    fn emit(&self, admin_id: String, signal: PresenceSignal) {
        let api = self.api.clone();
        let handle = tokio::spawn(async move {
            let result = match signal {
                PresenceSignal::Active => api.mark_active(&admin_id).await,
                PresenceSignal::Offline => api.mark_offline(&admin_id).await,
            };
            match result {
                Ok(()) => tracing::debug!(%admin_id, signal = signal.label(), "presence signal sent"),
                Err(err) => tracing::warn!(
                    error = %err,
                    %admin_id,
                    signal = signal.label(),
                    "presence signal failed"
                ),
            }
        });
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.retain(|handle| !handle.is_finished());
        in_flight.push(handle);
    }

    async fn flush(&self) {
        let pending: Vec<JoinHandle<()>> = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight.drain(..).collect()
        };
        for handle in pending {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "presence call task ended abnormally");
            }
        }
    }
}

fn lock_phase(phase: &Mutex<Phase>) -> MutexGuard<'_, Phase> {
    phase.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Emits `Active` when the activity window has passed, restarting the window.
fn emit_if_due<T, A>(
    time: &T,
    emitter: &Emitter<A>,
    phase: &Mutex<Phase>,
    activity_interval: std::time::Duration,
) -> bool
where
    T: TimeProvider,
    A: PresenceApi,
{
    let mut phase = lock_phase(phase);
    let Phase::Running {
        admin_id,
        last_signal_at,
    } = &mut *phase
    else {
        return false;
    };
    if time.elapsed_since(*last_signal_at) < activity_interval {
        return false;
    }
    *last_signal_at = time.now();
    emitter.emit(admin_id.clone(), PresenceSignal::Active);
    true
}

impl<T, A> PresenceHeartbeat<T, A>
where
    T: TimeProvider,
    A: PresenceApi,
{
    pub fn new(time: T, api: A, config: HeartbeatConfig) -> Self {
        Self {
            time,
            emitter: Emitter {
                api,
                in_flight: Arc::new(Mutex::new(Vec::new())),
            },
            config,
            phase: Arc::new(Mutex::new(Phase::Idle)),
            ticker: None,
        }
    }

    /// Emits one `Active` signal, starts listening for interactions and starts
    /// the idle timer. A second call while running is ignored.
    pub fn start(&mut self, admin_id: impl Into<String>) {
        let admin_id = admin_id.into();
        {
            let mut phase = lock_phase(&self.phase);
            if let Phase::Running { admin_id: current, .. } = &*phase {
                tracing::warn!(%current, "presence heartbeat already running");
                return;
            }
            *phase = Phase::Running {
                admin_id: admin_id.clone(),
                last_signal_at: self.time.now(),
            };
        }
        tracing::info!(%admin_id, "presence heartbeat started");
        self.emitter.emit(admin_id, PresenceSignal::Active);

        let time = self.time.clone();
        let emitter = self.emitter.clone();
        let phase = Arc::clone(&self.phase);
        let config = self.config;
        self.ticker = Some(tokio::spawn(async move {
            loop {
                time.sleep(config.check_interval).await;
                if !matches!(*lock_phase(&phase), Phase::Running { .. }) {
                    break;
                }
                emit_if_due(&time, &emitter, &phase, config.activity_interval);
            }
        }));
    }

    /// Returns `true` when the interaction produced an `Active` signal.
    pub fn on_interaction(&self, interaction: Interaction) -> bool {
        let emitted = emit_if_due(
            &self.time,
            &self.emitter,
            &self.phase,
            self.config.activity_interval,
        );
        if emitted {
            tracing::debug!(?interaction, "activity signal after interaction");
        }
        emitted
    }

    pub fn is_running(&self) -> bool {
        matches!(*lock_phase(&self.phase), Phase::Running { .. })
    }

    /// Page unload: one `Offline` signal, timer stopped. Waits for in-flight
    /// calls so the signal has a chance to leave before the process exits.
    pub async fn unload(&mut self) {
        self.stop("page unload");
        self.flush().await;
    }

    /// Explicit teardown: stops listening, stops the timer and sends a final
    /// `Offline` unless unload already did.
    pub async fn cleanup(&mut self) {
        self.stop("cleanup");
        self.flush().await;
    }

    /// Waits for every presence call issued so far.
    pub async fn flush(&self) {
        self.emitter.flush().await;
    }

    fn stop(&mut self, reason: &'static str) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let previous = std::mem::replace(&mut *lock_phase(&self.phase), Phase::Stopped);
        if let Phase::Running { admin_id, .. } = previous {
            tracing::info!(%admin_id, reason, "presence heartbeat stopped");
            self.emitter.emit(admin_id, PresenceSignal::Offline);
        }
    }
}

impl<T, A> Drop for PresenceHeartbeat<T, A> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
