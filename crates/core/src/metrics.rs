//! Per-stream metrics
//!
//! Streams mutate a [`StreamMetrics`] behind a lock and hand out
//! [`StreamMetricsSnapshot`]s for external reads, so monitoring never
//! contends with the audio path for longer than a field copy.

use std::collections::VecDeque;
use std::time::Instant;

use crate::ProviderHealthStatus;

/// Number of latency samples kept for the rolling average.
const LATENCY_WINDOW: usize = 100;

/// Mutable per-stream counters.
#[derive(Debug)]
pub struct StreamMetrics {
    pub chunks_received: u64,
    pub chunks_written: u64,
    pub audio_dropped: u64,
    pub write_failures: u64,
    pub consecutive_failures: u64,
    pub translations_emitted: u64,
    pub error_count: u64,
    pub last_successful_write: Option<Instant>,
    pub last_error: Option<Instant>,
    latency_samples_ms: VecDeque<f64>,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self {
            chunks_received: 0,
            chunks_written: 0,
            audio_dropped: 0,
            write_failures: 0,
            consecutive_failures: 0,
            translations_emitted: 0,
            error_count: 0,
            last_successful_write: None,
            last_error: None,
            latency_samples_ms: VecDeque::with_capacity(LATENCY_WINDOW),
        }
    }

    /// An audio chunk arrived from the session layer.
    pub fn record_chunk_received(&mut self) {
        self.chunks_received += 1;
    }

    /// An audio chunk reached the transport.
    pub fn record_write(&mut self) {
        self.chunks_written += 1;
        self.consecutive_failures = 0;
        self.last_successful_write = Some(Instant::now());
    }

    /// A transport write failed. Transient: counted, never state-changing.
    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
        self.consecutive_failures += 1;
    }

    /// An audio chunk was dropped without reaching the transport.
    pub fn record_drop(&mut self) {
        self.audio_dropped += 1;
    }

    /// A translation event was emitted downstream.
    pub fn record_translation(&mut self) {
        self.translations_emitted += 1;
    }

    /// An upstream error surfaced.
    pub fn record_error(&mut self) {
        self.error_count += 1;
        self.last_error = Some(Instant::now());
    }

    /// Push a latency sample into the rolling window.
    pub fn record_latency_ms(&mut self, latency_ms: f64) {
        if self.latency_samples_ms.len() == LATENCY_WINDOW {
            self.latency_samples_ms.pop_front();
        }
        self.latency_samples_ms.push_back(latency_ms);
    }

    /// Rolling average latency over the last [`LATENCY_WINDOW`] samples.
    pub fn average_latency_ms(&self) -> f64 {
        if self.latency_samples_ms.is_empty() {
            return 0.0;
        }
        self.latency_samples_ms.iter().sum::<f64>() / self.latency_samples_ms.len() as f64
    }

    /// Copy-out snapshot for external monitoring.
    pub fn snapshot(&self) -> StreamMetricsSnapshot {
        StreamMetricsSnapshot {
            chunks_received: self.chunks_received,
            chunks_written: self.chunks_written,
            audio_dropped: self.audio_dropped,
            write_failures: self.write_failures,
            consecutive_failures: self.consecutive_failures,
            translations_emitted: self.translations_emitted,
            error_count: self.error_count,
            average_latency_ms: self.average_latency_ms(),
            last_successful_write: self.last_successful_write,
            last_error: self.last_error,
        }
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a stream's metrics.
#[derive(Debug, Clone)]
pub struct StreamMetricsSnapshot {
    pub chunks_received: u64,
    pub chunks_written: u64,
    pub audio_dropped: u64,
    pub write_failures: u64,
    pub consecutive_failures: u64,
    pub translations_emitted: u64,
    pub error_count: u64,
    pub average_latency_ms: f64,
    pub last_successful_write: Option<Instant>,
    pub last_error: Option<Instant>,
}

/// Health view of one stream, combining stream and provider state.
#[derive(Debug, Clone)]
pub struct StreamHealth {
    /// True only in `Ready`/`Active`
    pub is_alive: bool,
    /// Most recent activity of any kind on the stream
    pub last_activity: Option<Instant>,
    /// Consecutive transport write failures
    pub consecutive_failures: u64,
    /// Most recent successful transport write
    pub last_successful_write: Option<Instant>,
    /// Owning provider's health
    pub provider_health: ProviderHealthStatus,
}
