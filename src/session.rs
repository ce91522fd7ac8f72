//! session.rs — conversational session state machine.
//! One controller per chat surface: text/voice turn-taking, message history,
//! and handoff of answers to the speech player. The state machine itself is
//! the concurrency control — only `Idle` accepts a new turn.

use std::sync::Arc;

use crate::audio_capture::AudioCapture;
use crate::error::CaptureError;
use crate::gateway::Gateway;
use crate::logging::{client_info, client_warn};
use crate::speech::Speaker;

// ── Messages ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    fn user(text: impl Into<String>) -> Self {
        Message { role: Role::User, text: text.into() }
    }

    fn ai(text: impl Into<String>) -> Self {
        Message { role: Role::Ai, text: text.into() }
    }
}

// ── Session state ────────────────────────────────────

/// Turn lifecycle. `Idle` is both the initial state and the only one from
/// which a new submission or recording may begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Transcribing,
    AwaitingAnswer,
    Synthesizing,
    Playing,
    Error,
}

/// Greeting seeded into every fresh session.
pub const GREETING: &str =
    "Assalomu alaykum! Maktabgacha va maktab ta'limi bo'yicha qanday savolingiz bor?";

/// Fixed answer appended when the gateway is unreachable. No retry.
pub const FALLBACK_ANSWER: &str = "Xatolik: Backend bilan aloqa yo'q!";

/// Marker prefixed to transcribed voice input in the history.
pub const VOICE_PREFIX: &str = "🎤: ";

// ── Controller ───────────────────────────────────────

pub struct SessionController<G: Gateway, C: AudioCapture, S: Speaker> {
    gateway: Arc<G>,
    capture: C,
    speaker: S,
    state: SessionState,
    messages: Vec<Message>,
}

impl<G: Gateway, C: AudioCapture, S: Speaker> SessionController<G, C, S> {
    pub fn new(gateway: Arc<G>, capture: C, speaker: S) -> Self {
        SessionController {
            gateway,
            capture,
            speaker,
            state: SessionState::Idle,
            messages: vec![Message::ai(GREETING)],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Ordered history; insertion order is display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn speaker(&self) -> &S {
        &self.speaker
    }

    /// Submit a typed question. No-op on empty input or outside `Idle`.
    pub async fn submit_text(&mut self, input: &str) {
        if self.state != SessionState::Idle {
            client_warn(format!(
                "submit_text rejected: session busy ({:?})",
                self.state
            ));
            return;
        }
        if input.trim().is_empty() {
            return;
        }

        self.messages.push(Message::user(input));
        self.state = SessionState::AwaitingAnswer;

        match self.gateway.ask(input).await {
            Ok(answer) => self.deliver_answer(answer).await,
            Err(e) => self.fail_turn(e.to_string()),
        }
    }

    /// Begin a voice turn. No-op outside `Idle`; a refused device is
    /// returned to the caller and the session stays `Idle`.
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.state != SessionState::Idle {
            client_warn(format!(
                "start_recording rejected: session busy ({:?})",
                self.state
            ));
            return Ok(());
        }

        self.capture.acquire()?;
        if let Err(e) = self.capture.start() {
            // Release the device rather than leaving a half-open capture.
            let _ = self.capture.stop();
            return Err(e);
        }

        self.state = SessionState::Recording;
        client_info("Voice turn started");
        Ok(())
    }

    /// Finish the voice turn: finalize capture, transcribe-and-ask, then
    /// proceed as a text turn. No-op unless `Recording`.
    pub async fn stop_recording(&mut self) {
        if self.state != SessionState::Recording {
            client_warn(format!(
                "stop_recording rejected: not recording ({:?})",
                self.state
            ));
            return;
        }

        let payload = match self.capture.stop() {
            Ok(payload) => payload,
            Err(e) => {
                // Device already released by stop(); nothing to send.
                client_warn(format!("Capture yielded no payload: {e}"));
                self.state = SessionState::Idle;
                return;
            }
        };

        self.state = SessionState::Transcribing;

        match self.gateway.ask_voice(payload).await {
            Ok(voice) => {
                self.messages
                    .push(Message::user(format!("{VOICE_PREFIX}{}", voice.user_text)));
                self.state = SessionState::AwaitingAnswer;
                self.deliver_answer(voice.answer).await;
            }
            Err(e) => self.fail_turn(e.to_string()),
        }
    }

    /// Success path shared by text and voice turns: append the answer,
    /// voice it, return to `Idle`. Synthesis failures stay silent.
    async fn deliver_answer(&mut self, answer: String) {
        self.messages.push(Message::ai(answer.clone()));
        self.state = SessionState::Synthesizing;

        match self.speaker.speak(&answer).await {
            Ok(()) => self.state = SessionState::Playing,
            Err(e) => {
                client_warn(format!("Answer delivered without audio: {e}"));
            }
        }

        self.state = SessionState::Idle;
    }

    /// Failure path shared by text and voice turns: one fallback answer,
    /// back to `Idle`, no retry.
    fn fail_turn(&mut self, why: String) {
        client_warn(format!("Turn failed: {why}"));
        self.state = SessionState::Error;
        self.messages.push(Message::ai(FALLBACK_ANSWER));
        self.state = SessionState::Idle;
    }
}
