//! Token-stream translation stream
//!
//! One duplex websocket per stream. A single worker task owns the socket,
//! the utterance assembler, and every per-language timer, so no assembler
//! state is ever touched from two tasks. The public handle only moves audio
//! and control messages into the worker's channels.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use speech_bridge_core::{
    StreamEventSender, StreamHealth, StreamMetricsSnapshot, StreamState, TranslationEvent,
};

use crate::health::ProviderHealthTracker;
use crate::provider::TranslationStream;
use crate::soniox::assembler::{AssemblerAction, FlushReason, UtteranceAssembler};
use crate::soniox::protocol::{convert_tokens, ConfigMessage, ResponseMessage, TranslationDirective};
use crate::stream_core::StreamCore;
use crate::ProviderError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection parameters resolved by the provider at stream creation.
#[derive(Clone)]
pub(crate) struct ConnectionParams {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub directive: TranslationDirective,
    pub end_token: String,
    pub translation_wait: Duration,
    pub ready_settle: Duration,
    pub max_reconnect_attempts: u32,
    pub reconnect_backoff: Duration,
}

enum Control {
    Close,
}

enum LoopExit {
    /// close() was called or the handle was dropped
    Closed,
    /// The socket died while the stream was supposed to stay up
    ConnectionLost(String),
    /// Unrecoverable upstream fault
    Fatal(String),
}

enum Wake {
    Audio(Option<Vec<u8>>),
    Ws(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
    Timer(Option<(String, u64)>),
    Control(Option<Control>),
}

/// Public handle to a token-stream translation stream.
pub struct SonioxTranslationStream {
    core: Arc<StreamCore>,
    audio_tx: mpsc::UnboundedSender<Vec<u8>>,
    control_tx: mpsc::UnboundedSender<Control>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SonioxTranslationStream {
    pub(crate) fn spawn(
        stream_id: String,
        subscription_key: String,
        target_language: &str,
        params: ConnectionParams,
        events: StreamEventSender,
        provider_health: Arc<ProviderHealthTracker>,
    ) -> Self {
        let core = StreamCore::new(stream_id, subscription_key, events, provider_health);

        let (audio_tx, audio_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (timeout_tx, timeout_rx) = mpsc::unbounded_channel();

        let assembler = UtteranceAssembler::new("soniox", target_language, &params.end_token);

        let worker = StreamWorker {
            core: core.clone(),
            params,
            assembler,
            audio_rx,
            control_rx,
            timeout_tx,
            timeout_rx,
            timers: HashMap::new(),
        };

        let handle = tokio::spawn(worker.run());

        Self {
            core,
            audio_tx,
            control_tx,
            worker: Mutex::new(Some(handle)),
        }
    }
}

#[async_trait]
impl TranslationStream for SonioxTranslationStream {
    fn stream_id(&self) -> &str {
        &self.core.stream_id
    }

    fn state(&self) -> StreamState {
        self.core.state()
    }

    async fn write_audio(&self, chunk: &[u8]) -> bool {
        if !self.core.state().accepts_audio() {
            self.core.metrics.lock().record_drop();
            return false;
        }

        self.core.metrics.lock().record_chunk_received();
        self.core.touch();

        // Audio written while initializing or reconnecting queues here and
        // is drained in order once the worker has a live socket.
        if self.audio_tx.send(chunk.to_vec()).is_err() {
            self.core.metrics.lock().record_drop();
            return false;
        }
        true
    }

    async fn close(&self) {
        if !self.core.begin_close() {
            return;
        }

        let _ = self.control_tx.send(Control::Close);

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
    params: ConnectionParams,
    assembler: UtteranceAssembler,
    audio_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    timeout_tx: mpsc::UnboundedSender<(String, u64)>,
    timeout_rx: mpsc::UnboundedReceiver<(String, u64)>,
    timers: HashMap<String, JoinHandle<()>>,
}

impl StreamWorker {
    async fn run(mut self) {
        let mut ws = match self.connect_once().await {
            Ok(ws) => {
                self.core.provider_health.record_success();
                ws
            }
            Err(e) => {
                tracing::error!(
                    "Stream {} failed to connect upstream: {}",
                    self.core.stream_id,
                    e
                );
                self.core.provider_health.record_failure(&e.to_string());
                self.teardown_error(e.to_string());
                return;
            }
        };

        self.mark_ready();

        loop {
            match self.drive(&mut ws).await {
                LoopExit::Closed => {
                    let _ = ws.close(None).await;
                    self.teardown_closed();
                    return;
                }
                LoopExit::Fatal(reason) => {
                    let _ = ws.close(None).await;
                    self.teardown_error(reason);
                    return;
                }
                LoopExit::ConnectionLost(reason) => {
                    tracing::warn!(
                        "Stream {} lost upstream connection: {}",
                        self.core.stream_id,
                        reason
                    );
                    match self.reconnect().await {
                        Some(new_ws) => {
                            ws = new_ws;
                            self.mark_ready();
                        }
                        None => {
                            // The caller did not ask for this, so the stream
                            // closes rather than erroring.
                            self.teardown_closed();
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn connect_once(&self) -> Result<WsStream, ProviderError> {
        let (mut ws, _) = connect_async(self.params.endpoint.as_str())
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        let config = ConfigMessage::new(
            &self.params.api_key,
            &self.params.model,
            &self.params.directive,
        );
        let payload =
            serde_json::to_string(&config).map_err(|e| ProviderError::Runtime(e.to_string()))?;
        ws.send(Message::Text(payload))
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        // The protocol has no ready acknowledgment; give the upstream a
        // moment to apply the config before audio flows.
        tokio::time::sleep(self.params.ready_settle).await;

        Ok(ws)
    }

    async fn drive(&mut self, ws: &mut WsStream) -> LoopExit {
        if !self.audio_rx.is_empty() {
            tracing::debug!(
                "Stream {} flushing {} buffered audio chunks",
                self.core.stream_id,
                self.audio_rx.len()
            );
        }

        loop {
            let wake = tokio::select! {
                chunk = self.audio_rx.recv() => Wake::Audio(chunk),
                msg = ws.next() => Wake::Ws(msg),
                timer = self.timeout_rx.recv() => Wake::Timer(timer),
                ctrl = self.control_rx.recv() => Wake::Control(ctrl),
            };

            match wake {
                Wake::Audio(Some(chunk)) => {
                    if let Err(e) = ws.send(Message::Binary(chunk)).await {
                        self.core.metrics.lock().record_write_failure();
                        return LoopExit::ConnectionLost(e.to_string());
                    }
                    self.core.metrics.lock().record_write();
                }
                Wake::Audio(None) | Wake::Control(_) => return LoopExit::Closed,
                Wake::Ws(Some(Ok(Message::Text(text)))) => {
                    if let Some(exit) = self.handle_text(&text) {
                        return exit;
                    }
                }
                Wake::Ws(Some(Ok(Message::Close(_)))) | Wake::Ws(None) => {
                    return LoopExit::ConnectionLost("socket closed by upstream".to_string());
                }
                Wake::Ws(Some(Ok(_))) => {}
                Wake::Ws(Some(Err(e))) => return LoopExit::ConnectionLost(e.to_string()),
                Wake::Timer(Some((language, generation))) => {
                    self.handle_timer(&language, generation);
                }
                Wake::Timer(None) => {}
            }
        }
    }

    fn handle_text(&mut self, text: &str) -> Option<LoopExit> {
        let msg: ResponseMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                // Individual unparseable messages are skipped, never fatal
                tracing::warn!(
                    "Stream {} skipping unparseable upstream message: {}",
                    self.core.stream_id,
                    e
                );
                return None;
            }
        };

        if msg.is_error() {
            let reason = msg
                .error_message
                .unwrap_or_else(|| format!("upstream error code {}", msg.error_code.unwrap_or(-1)));
            return Some(LoopExit::Fatal(reason));
        }

        if msg.finished == Some(true) {
            return Some(LoopExit::ConnectionLost(
                "upstream finished session".to_string(),
            ));
        }

        if msg.tokens.is_empty() {
            return None;
        }

        self.mark_active();
        let tokens = convert_tokens(msg.tokens, &self.params.end_token);
        let actions = self.assembler.ingest(&tokens);
        self.apply_actions(actions);
        None
    }

    fn apply_actions(&mut self, actions: Vec<AssemblerAction>) {
        for action in actions {
            match action {
                AssemblerAction::Emit(event, reason) => self.emit(event, reason),
                AssemblerAction::ArmTimeout {
                    language,
                    generation,
                } => {
                    let tx = self.timeout_tx.clone();
                    let wait = self.params.translation_wait;
                    let key = language.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(wait).await;
                        let _ = tx.send((language, generation));
                    });
                    if let Some(previous) = self.timers.insert(key, handle) {
                        previous.abort();
                    }
                }
                AssemblerAction::CancelTimeout { language } => {
                    if let Some(timer) = self.timers.remove(&language) {
                        timer.abort();
                    }
                }
            }
        }
    }

    fn handle_timer(&mut self, language: &str, generation: u64) {
        self.timers.remove(language);
        if let Some((event, reason)) = self.assembler.handle_timeout(language, generation) {
            tracing::debug!(
                "Stream {} translation wait expired for '{}', flushing untranslated utterance",
                self.core.stream_id,
                language
            );
            self.emit(event, reason);
        }
    }

    fn emit(&self, event: TranslationEvent, reason: FlushReason) {
        tracing::trace!(
            "Stream {} emitting {} event ({} -> {}, reason {})",
            self.core.stream_id,
            if event.is_final { "final" } else { "partial" },
            event.transcribe_language,
            event.translate_language,
            reason
        );
        self.core.metrics.lock().record_translation();
        self.core.touch();
        self.core.events.data(event);
    }

    fn mark_ready(&self) {
        if self.core.state() == StreamState::Initializing {
            self.core.set_state(StreamState::Ready);
        }
        self.core.events.ready();
    }

    fn mark_active(&self) {
        self.core.touch();
        if self.core.state() == StreamState::Ready {
            self.core.set_state(StreamState::Active);
        }
    }

    /// Sequential reconnects with linear backoff. Returns `None` when the
    /// attempt limit is exhausted or the stream started closing.
    async fn reconnect(&mut self) -> Option<WsStream> {
        for attempt in 1..=self.params.max_reconnect_attempts {
            if self.core.state() == StreamState::Closing {
                return None;
            }

            let backoff = self.params.reconnect_backoff * attempt;
            tracing::info!(
                "Stream {} reconnect attempt {}/{} in {:?}",
                self.core.stream_id,
                attempt,
                self.params.max_reconnect_attempts,
                backoff
            );

            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = self.control_rx.recv() => return None,
            }

            match self.connect_once().await {
                Ok(ws) => {
                    self.core.provider_health.record_success();
                    tracing::info!("Stream {} reconnected", self.core.stream_id);
                    return Some(ws);
                }
                Err(e) => {
                    self.core.provider_health.record_failure(&e.to_string());
                    tracing::warn!(
                        "Stream {} reconnect attempt {} failed: {}",
                        self.core.stream_id,
                        attempt,
                        e
                    );
                }
            }
        }

        tracing::warn!(
            "Stream {} exhausted reconnect attempts, closing",
            self.core.stream_id
        );
        None
    }

    fn cancel_timers(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }

    /// Flush buffered utterances as final events, then close. Exactly one
    /// terminal event is delivered.
    fn teardown_closed(&mut self) {
        self.cancel_timers();
        for (event, reason) in self.assembler.flush_all() {
            self.emit(event, reason);
        }
        self.core.set_state(StreamState::Closed);
        tracing::info!(
            "Stream {} closed (subscription {})",
            self.core.stream_id,
            self.core.subscription_key
        );
        self.core.events.closed();
    }

    fn teardown_error(&mut self, reason: String) {
        self.cancel_timers();
        let buffered = self.assembler.buffered_languages();
        if buffered > 0 {
            tracing::warn!(
                "Stream {} erroring with {} buffered utterances",
                self.core.stream_id,
                buffered
            );
        }
        self.core.metrics.lock().record_error();
        self.core.set_state(StreamState::Error);
        tracing::error!("Stream {} failed: {}", self.core.stream_id, reason);
        self.core.events.error(reason);
    }
}
