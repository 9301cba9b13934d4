//! Stream events and the ordered event channel
//!
//! Streams communicate with the session layer over a single mpsc channel so
//! that event ordering is a property of the transport, not of call-site
//! discipline. [`StreamEventSender`] additionally enforces the lifecycle
//! contract: `Ready` at most once and before the first `Data`, and exactly
//! one terminal event (`Error` or `Closed`, never both), after which all
//! sends are no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Normalized translation/transcription output event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationEvent {
    /// Translated text (or transcription text for transcription streams)
    pub text: String,
    /// Original-language text, when the provider delivers both sides
    pub original_text: Option<String>,
    /// Final events never change; non-final events may be revised
    pub is_final: bool,
    /// Start offset in ms from stream start
    pub start_time_ms: u64,
    /// End offset in ms from stream start
    pub end_time_ms: u64,
    /// Language the speech was recognized in
    pub transcribe_language: String,
    /// Language of `text`
    pub translate_language: String,
    /// Name of the provider that produced this event
    pub provider: String,
    /// Recognition confidence (0.0 - 1.0), when the provider reports one
    pub confidence: Option<f32>,
}

impl TranslationEvent {
    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }
}

/// Lifecycle and data events emitted by a translation stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Upstream handshake complete, the stream accepts audio
    Ready,
    /// A normalized translation event
    Data(TranslationEvent),
    /// Unrecoverable fault; terminal
    Error(String),
    /// Teardown complete; terminal
    Closed,
}

/// Sending half of a stream event channel.
///
/// Cheap to clone; clones share the ordering state, so the contract holds
/// across every task that holds a handle.
#[derive(Clone)]
pub struct StreamEventSender {
    tx: mpsc::UnboundedSender<StreamEvent>,
    ready_sent: Arc<AtomicBool>,
    terminal_sent: Arc<AtomicBool>,
}

impl StreamEventSender {
    /// Signal that the stream is ready. At most one `Ready` is delivered.
    pub fn ready(&self) {
        if self.terminal_sent.load(Ordering::Acquire) {
            return;
        }
        if self
            .ready_sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = self.tx.send(StreamEvent::Ready);
        }
    }

    /// Deliver a translation event. Guarantees `Ready` was delivered first.
    pub fn data(&self, event: TranslationEvent) {
        if self.terminal_sent.load(Ordering::Acquire) {
            return;
        }
        self.ready();
        let _ = self.tx.send(StreamEvent::Data(event));
    }

    /// Deliver the terminal `Error` event. No-op if a terminal event was
    /// already delivered.
    pub fn error(&self, message: impl Into<String>) {
        if self.claim_terminal() {
            let _ = self.tx.send(StreamEvent::Error(message.into()));
        }
    }

    /// Deliver the terminal `Closed` event. No-op if a terminal event was
    /// already delivered.
    pub fn closed(&self) {
        if self.claim_terminal() {
            let _ = self.tx.send(StreamEvent::Closed);
        }
    }

    /// Whether a terminal event has been delivered.
    pub fn is_terminal(&self) -> bool {
        self.terminal_sent.load(Ordering::Acquire)
    }

    fn claim_terminal(&self) -> bool {
        self.terminal_sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Create a stream event channel.
pub fn stream_event_channel() -> (StreamEventSender, mpsc::UnboundedReceiver<StreamEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sender = StreamEventSender {
        tx,
        ready_sent: Arc::new(AtomicBool::new(false)),
        terminal_sent: Arc::new(AtomicBool::new(false)),
    };
    (sender, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> TranslationEvent {
        TranslationEvent {
            text: "hello".to_string(),
            original_text: Some("hola".to_string()),
            is_final: true,
            start_time_ms: 0,
            end_time_ms: 500,
            transcribe_language: "es".to_string(),
            translate_language: "en".to_string(),
            provider: "test".to_string(),
            confidence: Some(0.9),
        }
    }

    #[tokio::test]
    async fn test_ready_fires_at_most_once() {
        let (tx, mut rx) = stream_event_channel();
        tx.ready();
        tx.ready();
        tx.closed();
        drop(tx);

        assert!(matches!(rx.recv().await, Some(StreamEvent::Ready)));
        assert!(matches!(rx.recv().await, Some(StreamEvent::Closed)));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_ready_precedes_first_data() {
        let (tx, mut rx) = stream_event_channel();
        // Data without an explicit ready() still delivers Ready first
        tx.data(event());

        assert!(matches!(rx.recv().await, Some(StreamEvent::Ready)));
        assert!(matches!(rx.recv().await, Some(StreamEvent::Data(_))));
    }

    #[tokio::test]
    async fn test_error_and_closed_are_mutually_exclusive() {
        let (tx, mut rx) = stream_event_channel();
        tx.ready();
        tx.error("boom");
        tx.closed();
        tx.error("again");
        drop(tx);

        assert!(matches!(rx.recv().await, Some(StreamEvent::Ready)));
        assert!(matches!(rx.recv().await, Some(StreamEvent::Error(_))));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_nothing_after_closed() {
        let (tx, mut rx) = stream_event_channel();
        tx.closed();
        tx.data(event());
        tx.ready();
        drop(tx);

        assert!(matches!(rx.recv().await, Some(StreamEvent::Closed)));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_duration() {
        assert_eq!(event().duration_ms(), 500);
    }
}
