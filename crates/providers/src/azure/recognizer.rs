//! Continuous recognizer client
//!
//! Wraps the vendor's translation websocket behind an SDK-like surface: the
//! client owns the transport, accepts audio from the moment it is created
//! (buffering until the session is up), and delivers recognition events on a
//! channel. The stream layer never sees the socket.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::azure::messages::{RecognitionResult, VendorMessage};

/// Connection settings for one recognizer session.
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub key: String,
    pub region: String,
    /// Full source locale, e.g. "es-ES"
    pub source_locale: String,
    /// Target language codes for the per-language translation map
    pub target_languages: Vec<String>,
}

impl RecognizerConfig {
    fn endpoint(&self) -> String {
        format!(
            "wss://{}.s2s.speech.microsoft.com/speech/translation/cognitiveservices/v1?from={}&to={}&subscription-key={}",
            self.region,
            self.source_locale,
            self.target_languages.join(","),
            self.key,
        )
    }
}

/// Events delivered by the recognizer.
#[derive(Debug)]
pub enum RecognizerEvent {
    /// The session is up and consuming audio
    SessionStarted,
    /// Partial recognition
    Recognizing(RecognitionResult),
    /// Final recognition for one phrase
    Recognized(RecognitionResult),
    /// The session died; terminal
    Canceled { reason: String },
    /// The session ended after a stop request; terminal
    SessionStopped,
}

/// SDK-like continuous recognizer handle.
pub struct ContinuousRecognizer {
    audio_tx: mpsc::UnboundedSender<Vec<u8>>,
    stop_tx: mpsc::UnboundedSender<()>,
}

impl ContinuousRecognizer {
    /// Start a recognizer session. Audio written before the session is up is
    /// buffered and drained in order once the transport connects.
    pub fn start(config: RecognizerConfig) -> (Self, mpsc::UnboundedReceiver<RecognizerEvent>) {
        let (audio_tx, audio_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(transport(config, audio_rx, stop_rx, event_tx));

        (Self { audio_tx, stop_tx }, event_rx)
    }

    /// Hand one audio chunk to the session. Returns false once the session
    /// is gone.
    pub fn write_audio(&self, chunk: &[u8]) -> bool {
        self.audio_tx.send(chunk.to_vec()).is_ok()
    }

    /// Request a graceful stop. The session answers with `SessionStopped`.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }
}

async fn transport(
    config: RecognizerConfig,
    mut audio_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    mut stop_rx: mpsc::UnboundedReceiver<()>,
    event_tx: mpsc::UnboundedSender<RecognizerEvent>,
) {
    let endpoint = config.endpoint();
    let mut ws = match connect_async(endpoint.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            let _ = event_tx.send(RecognizerEvent::Canceled {
                reason: format!("connect failed: {}", e),
            });
            return;
        }
    };

    let _ = event_tx.send(RecognizerEvent::SessionStarted);

    loop {
        tokio::select! {
            chunk = audio_rx.recv() => match chunk {
                Some(chunk) => {
                    if let Err(e) = ws.send(Message::Binary(chunk)).await {
                        let _ = event_tx.send(RecognizerEvent::Canceled {
                            reason: format!("audio send failed: {}", e),
                        });
                        return;
                    }
                }
                // Handle dropped without an explicit stop
                None => {
                    let _ = ws.close(None).await;
                    let _ = event_tx.send(RecognizerEvent::SessionStopped);
                    return;
                }
            },
            _ = stop_rx.recv() => {
                let _ = ws.close(None).await;
                let _ = event_tx.send(RecognizerEvent::SessionStopped);
                return;
            }
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<VendorMessage>(&text) {
                        Ok(VendorMessage::Hypothesis(h)) => {
                            let _ = event_tx.send(RecognizerEvent::Recognizing(h.into()));
                        }
                        Ok(VendorMessage::Phrase(p)) => {
                            if p.is_success() {
                                let _ = event_tx.send(RecognizerEvent::Recognized(p.into()));
                            } else {
                                tracing::debug!(
                                    "Recognizer phrase with status {}, skipping",
                                    p.recognition_status
                                );
                            }
                        }
                        Ok(VendorMessage::TurnStart) | Ok(VendorMessage::TurnEnd) => {}
                        Err(e) => {
                            // Individual unparseable messages are skipped
                            tracing::warn!("Skipping unparseable recognizer message: {}", e);
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    let _ = event_tx.send(RecognizerEvent::Canceled {
                        reason: "session closed by service".to_string(),
                    });
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = event_tx.send(RecognizerEvent::Canceled {
                        reason: e.to_string(),
                    });
                    return;
                }
            },
        }
    }
}
