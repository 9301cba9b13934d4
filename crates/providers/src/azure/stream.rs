//! Continuous-recognizer translation stream
//!
//! The recognizer SDK owns the transport and emits recognition events; this
//! stream translates them into normalized translation events, selecting the
//! configured target from the vendor's per-language translation map.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use speech_bridge_core::{
    normalize, StreamEventSender, StreamHealth, StreamMetricsSnapshot, StreamState,
    TranslationEvent,
};

use crate::azure::messages::RecognitionResult;
use crate::azure::recognizer::{ContinuousRecognizer, RecognizerConfig, RecognizerEvent};
use crate::health::ProviderHealthTracker;
use crate::provider::TranslationStream;
use crate::stream_core::StreamCore;

/// Public handle to a continuous-recognizer translation stream.
pub struct AzureTranslationStream {
    core: Arc<StreamCore>,
    recognizer: ContinuousRecognizer,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AzureTranslationStream {
    pub(crate) fn spawn(
        stream_id: String,
        subscription_key: String,
        source_language: &str,
        target_language: &str,
        recognizer_config: RecognizerConfig,
        events: StreamEventSender,
        provider_health: Arc<ProviderHealthTracker>,
    ) -> Self {
        let core = StreamCore::new(stream_id, subscription_key, events, provider_health);

        let (recognizer, recognizer_rx) = ContinuousRecognizer::start(recognizer_config);

        let worker = StreamWorker {
            core: core.clone(),
            recognizer_rx,
            source_language: normalize(source_language),
            target_language: normalize(target_language),
            started_at: Instant::now(),
        };

        let handle = tokio::spawn(worker.run());

        Self {
            core,
            recognizer,
            worker: Mutex::new(Some(handle)),
        }
    }
}

#[async_trait]
impl TranslationStream for AzureTranslationStream {
    fn stream_id(&self) -> &str {
        &self.core.stream_id
    }

    fn state(&self) -> StreamState {
        self.core.state()
    }

    async fn write_audio(&self, chunk: &[u8]) -> bool {
        // The recognizer buffers pending audio internally, so writes during
        // Initializing are accepted rather than dropped.
        if !self.core.state().accepts_audio() {
            self.core.metrics.lock().record_drop();
            return false;
        }

        self.core.metrics.lock().record_chunk_received();
        self.core.touch();

        if self.recognizer.write_audio(chunk) {
            self.core.metrics.lock().record_write();
            true
        } else {
            self.core.metrics.lock().record_write_failure();
            false
        }
    }

    async fn close(&self) {
        if !self.core.begin_close() {
            return;
        }

        self.recognizer.stop();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn metrics(&self) -> StreamMetricsSnapshot {
        self.core.snapshot()
    }

    fn health(&self) -> StreamHealth {
        self.core.health()
    }
}

struct StreamWorker {
    core: Arc<StreamCore>,
    recognizer_rx: mpsc::UnboundedReceiver<RecognizerEvent>,
    source_language: String,
    target_language: String,
    started_at: Instant,
}

impl StreamWorker {
    async fn run(mut self) {
        while let Some(event) = self.recognizer_rx.recv().await {
            match event {
                RecognizerEvent::SessionStarted => {
                    if self.core.state() == StreamState::Initializing {
                        self.core.set_state(StreamState::Ready);
                    }
                    self.core.events.ready();
                }
                RecognizerEvent::Recognizing(result) => {
                    self.mark_active();
                    self.forward(result, false);
                }
                RecognizerEvent::Recognized(result) => {
                    self.mark_active();
                    self.forward(result, true);
                }
                RecognizerEvent::Canceled { reason } => {
                    if self.core.state() == StreamState::Closing {
                        // Teardown racing a stop request still closes cleanly
                        break;
                    }
                    self.core.provider_health.record_failure(&reason);
                    self.core.metrics.lock().record_error();
                    self.core.set_state(StreamState::Error);
                    tracing::error!("Stream {} failed: {}", self.core.stream_id, reason);
                    self.core.events.error(reason);
                    return;
                }
                RecognizerEvent::SessionStopped => break,
            }
        }

        self.core.set_state(StreamState::Closed);
        tracing::info!(
            "Stream {} closed (subscription {})",
            self.core.stream_id,
            self.core.subscription_key
        );
        self.core.events.closed();
    }

    fn mark_active(&self) {
        self.core.touch();
        if self.core.state() == StreamState::Ready {
            self.core.set_state(StreamState::Active);
        }
    }

    /// Map one vendor event to a normalized translation event.
    ///
    /// The vendor delivers a per-language translation map; an event with no
    /// entry for the configured target is logged and dropped rather than
    /// emitted degenerate.
    fn forward(&self, result: RecognitionResult, is_final: bool) {
        let translated = result
            .translations
            .iter()
            .find(|(language, _)| normalize(language) == self.target_language)
            .map(|(_, text)| text.clone());

        let Some(text) = translated else {
            tracing::debug!(
                "Stream {} vendor event has no '{}' translation, dropping",
                self.core.stream_id,
                self.target_language
            );
            return;
        };

        let event = TranslationEvent {
            text,
            original_text: Some(result.text),
            is_final,
            start_time_ms: result.offset_ms,
            end_time_ms: result.offset_ms + result.duration_ms,
            transcribe_language: self.source_language.clone(),
            translate_language: self.target_language.clone(),
            provider: "azure".to_string(),
            confidence: result.confidence,
        };

        if is_final {
            let elapsed_ms = self.started_at.elapsed().as_millis() as f64;
            let latency_ms = (elapsed_ms - event.end_time_ms as f64).max(0.0);
            self.core.metrics.lock().record_latency_ms(latency_ms);
        }

        self.core.metrics.lock().record_translation();
        self.core.touch();
        self.core.events.data(event);
    }
}
