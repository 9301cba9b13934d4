//! Stream lifecycle states

use serde::{Deserialize, Serialize};

/// Lifecycle state of a translation stream.
///
/// `Initializing -> Ready -> Active -> Closing -> Closed`, with `Error`
/// reachable from any non-terminal state. `Closed` and `Error` are terminal:
/// a failed stream is replaced, never revived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    /// Upstream handshake in progress
    Initializing,
    /// Handshake complete, transport accepts audio
    Ready,
    /// First session-active signal confirmed
    Active,
    /// `close()` called, teardown in progress
    Closing,
    /// Teardown complete
    Closed,
    /// Unrecoverable upstream fault
    Error,
}

impl StreamState {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }

    /// A stream is alive only while the transport accepts audio.
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }

    /// Whether audio writes are accepted (possibly buffered) in this state.
    pub fn accepts_audio(self) -> bool {
        matches!(self, Self::Initializing | Self::Ready | Self::Active)
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}
