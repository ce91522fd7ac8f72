//! error.rs — failure taxonomy for the client core.
//!
//! One enum per failure domain. Nothing here is fatal to the process:
//! every variant has a bounded recovery path in the component that owns it.

use thiserror::Error;

/// Backend Gateway request failures (ask / transcribe / logs / stats).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {preview}")]
    Status {
        status: reqwest::StatusCode,
        /// First 300 bytes of the error body.
        preview: String,
    },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Microphone capture lifecycle failures.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Device refused or absent. User-visible; the session stays idle.
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    /// A capture handle is already live; a second one must not replace it.
    #[error("capture already running")]
    AlreadyRecording,

    /// `start()` before a successful `acquire()`.
    #[error("capture device not acquired")]
    NotAcquired,

    /// `stop()` found no buffered samples.
    #[error("no audio captured")]
    EmptyCapture,

    #[error("audio encode failed: {0}")]
    Encode(String),
}

/// Synthesized-speech failures. Logged, never surfaced to the user.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis request failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("cannot decode synthesized audio: {0}")]
    Decode(String),
}
