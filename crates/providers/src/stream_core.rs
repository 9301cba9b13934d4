//! Shared stream lifecycle bookkeeping
//!
//! Both stream variants carry the same state machine, metrics, and health
//! view; only their transports differ. [`StreamCore`] is the shared part,
//! owned behind an `Arc` by the public handle and its worker task.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use speech_bridge_core::{
    StreamEventSender, StreamHealth, StreamMetrics, StreamMetricsSnapshot, StreamState,
};

use crate::health::ProviderHealthTracker;

pub(crate) struct StreamCore {
    pub stream_id: String,
    pub subscription_key: String,
    state: RwLock<StreamState>,
    pub metrics: Mutex<StreamMetrics>,
    pub events: StreamEventSender,
    pub provider_health: Arc<ProviderHealthTracker>,
    last_activity: Mutex<Option<Instant>>,
}

impl StreamCore {
    pub fn new(
        stream_id: String,
        subscription_key: String,
        events: StreamEventSender,
        provider_health: Arc<ProviderHealthTracker>,
    ) -> Arc<Self> {
        Arc::new(Self {
            stream_id,
            subscription_key,
            state: RwLock::new(StreamState::Initializing),
            metrics: Mutex::new(StreamMetrics::new()),
            events,
            provider_health,
            last_activity: Mutex::new(None),
        })
    }

    pub fn state(&self) -> StreamState {
        *self.state.read()
    }

    /// Transition to `next` unless the stream already reached a terminal
    /// state.
    pub fn set_state(&self, next: StreamState) {
        let mut state = self.state.write();
        if !state.is_terminal() {
            tracing::debug!("Stream {} state {} -> {}", self.stream_id, *state, next);
            *state = next;
        }
    }

    /// Atomically enter `Closing`. Returns false when the stream is already
    /// closing or terminal, which makes `close()` idempotent.
    pub fn begin_close(&self) -> bool {
        let mut state = self.state.write();
        if matches!(
            *state,
            StreamState::Closing | StreamState::Closed | StreamState::Error
        ) {
            return false;
        }
        *state = StreamState::Closing;
        true
    }

    pub fn touch(&self) {
        *self.last_activity.lock() = Some(Instant::now());
    }

    pub fn snapshot(&self) -> StreamMetricsSnapshot {
        self.metrics.lock().snapshot()
    }

    pub fn health(&self) -> StreamHealth {
        let snapshot = self.snapshot();
        StreamHealth {
            is_alive: self.state().is_alive(),
            last_activity: *self.last_activity.lock(),
            consecutive_failures: snapshot.consecutive_failures,
            last_successful_write: snapshot.last_successful_write,
            provider_health: self.provider_health.status(),
        }
    }
}
