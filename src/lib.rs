//! Eduline — client core for an AI education call-centre.
//!
//! Two halves: a conversational session surface (text/voice question-answer
//! with synthesized speech) and a telemetry engine that turns the shared log
//! store into the derived views the operator dashboard renders. The Backend
//! Gateway (ask / transcribe / synthesize / log query) is an external HTTP
//! service; chat and dashboard UIs consume this crate.

pub mod aggregate;
pub mod audio_capture;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod poller;
pub mod session;
pub mod settings;
pub mod speech;

pub use audio_capture::{AudioCapture, MicCapture};
pub use error::{CaptureError, GatewayError, SynthesisError};
pub use gateway::{
    AdminStatsResponse, Gateway, HttpGateway, LogEntry, StatsResponse, VoiceAnswer,
};
pub use logging::init_logging;
pub use poller::{LogSnapshot, SnapshotStatus, TelemetryPoller};
pub use session::{Message, Role, SessionController, SessionState};
pub use settings::ClientSettings;
pub use speech::{AudioOutput, ReleaseGuard, RodioOutput, Speaker, SynthesisPlayer};
