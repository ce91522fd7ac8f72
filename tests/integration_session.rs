//! Integration tests for the conversational session controller.
//! The gateway, capture device, and audio output are mocked so full
//! text/voice turns run on a plain test runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eduline::{
    AdminStatsResponse, AudioCapture, AudioOutput, CaptureError, Gateway, GatewayError, LogEntry,
    Message, ReleaseGuard, Role, SessionController, SessionState, Speaker, StatsResponse,
    SynthesisError, SynthesisPlayer, VoiceAnswer,
};

// ── Mocks ────────────────────────────────────────────

#[derive(Default)]
struct MockGateway {
    ask_answer: Mutex<String>,
    ask_fails: AtomicBool,
    voice_answer: Mutex<Option<VoiceAnswer>>,
    tts_fails: AtomicBool,
    asked: Mutex<Vec<String>>,
    synthesized: Mutex<Vec<String>>,
}

impl MockGateway {
    fn answering(answer: &str) -> Self {
        let gw = MockGateway::default();
        *gw.ask_answer.lock().unwrap() = answer.to_string();
        gw
    }

    fn unreachable() -> Self {
        let gw = MockGateway::default();
        gw.ask_fails.store(true, Ordering::SeqCst);
        gw
    }

    fn with_voice(user_text: &str, answer: &str) -> Self {
        let gw = MockGateway::default();
        *gw.voice_answer.lock().unwrap() = Some(VoiceAnswer {
            user_text: user_text.to_string(),
            answer: answer.to_string(),
        });
        gw
    }

    fn synthesized_texts(&self) -> Vec<String> {
        self.synthesized.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn ask(&self, input: &str) -> Result<String, GatewayError> {
        if self.ask_fails.load(Ordering::SeqCst) {
            return Err(GatewayError::Decode("backend down".into()));
        }
        self.asked.lock().unwrap().push(input.to_string());
        Ok(self.ask_answer.lock().unwrap().clone())
    }

    async fn ask_voice(&self, _audio: Vec<u8>) -> Result<VoiceAnswer, GatewayError> {
        if self.ask_fails.load(Ordering::SeqCst) {
            return Err(GatewayError::Decode("backend down".into()));
        }
        self.voice_answer
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| GatewayError::Decode("no voice response scripted".into()))
    }

    async fn text_to_speech(&self, input: &str) -> Result<Vec<u8>, GatewayError> {
        if self.tts_fails.load(Ordering::SeqCst) {
            return Err(GatewayError::Decode("tts down".into()));
        }
        self.synthesized.lock().unwrap().push(input.to_string());
        Ok(vec![0u8; 64])
    }

    async fn logs(&self) -> Result<Vec<LogEntry>, GatewayError> {
        Ok(Vec::new())
    }

    async fn stats(&self) -> Result<StatsResponse, GatewayError> {
        Err(GatewayError::Decode("not scripted".into()))
    }

    async fn admin_stats(&self) -> Result<AdminStatsResponse, GatewayError> {
        Err(GatewayError::Decode("not scripted".into()))
    }
}

/// Canned microphone: yields a fixed payload, or scripted failures.
#[derive(Default)]
struct MockCapture {
    deny: bool,
    empty: bool,
    acquired: bool,
    started: bool,
}

impl MockCapture {
    fn denied() -> Self {
        MockCapture { deny: true, ..Default::default() }
    }

    fn silent() -> Self {
        MockCapture { empty: true, ..Default::default() }
    }
}

impl AudioCapture for MockCapture {
    fn acquire(&mut self) -> Result<(), CaptureError> {
        if self.deny {
            return Err(CaptureError::PermissionDenied("mock denied".into()));
        }
        if self.acquired {
            return Err(CaptureError::AlreadyRecording);
        }
        self.acquired = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if !self.acquired {
            return Err(CaptureError::NotAcquired);
        }
        if self.started {
            return Err(CaptureError::AlreadyRecording);
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<u8>, CaptureError> {
        let was_acquired = self.acquired;
        self.acquired = false;
        self.started = false;
        if !was_acquired {
            return Err(CaptureError::NotAcquired);
        }
        if self.empty {
            return Err(CaptureError::EmptyCapture);
        }
        Ok(vec![1u8; 320])
    }
}

/// Output whose playback completes immediately, releasing the resource.
struct InstantOutput;

impl AudioOutput for InstantOutput {
    fn play(&self, _audio: Vec<u8>, _volume: f32, guard: ReleaseGuard) -> Result<(), SynthesisError> {
        drop(guard);
        Ok(())
    }
}

type TestController = SessionController<MockGateway, MockCapture, SynthesisPlayer<MockGateway>>;

fn controller(gateway: MockGateway, capture: MockCapture) -> TestController {
    controller_with_handle(gateway, capture).0
}

fn controller_with_handle(
    gateway: MockGateway,
    capture: MockCapture,
) -> (TestController, Arc<MockGateway>) {
    let gateway = Arc::new(gateway);
    let player = SynthesisPlayer::with_output(Arc::clone(&gateway), Box::new(InstantOutput));
    (
        SessionController::new(Arc::clone(&gateway), capture, player),
        gateway,
    )
}

fn roles(messages: &[Message]) -> Vec<(Role, &str)> {
    messages.iter().map(|m| (m.role, m.text.as_str())).collect()
}

// ── Text turns ───────────────────────────────────────

#[tokio::test]
async fn text_turn_appends_question_answer_and_speaks_once() {
    let (mut session, gateway) =
        controller_with_handle(MockGateway::answering("Test javobi"), MockCapture::default());

    session.submit_text("Test savoli").await;

    let history = roles(session.messages());
    assert_eq!(history.len(), 3); // greeting + user + ai
    assert_eq!(history[1], (Role::User, "Test savoli"));
    assert_eq!(history[2], (Role::Ai, "Test javobi"));
    assert_eq!(session.state(), SessionState::Idle);

    assert_eq!(gateway.synthesized_texts(), vec!["Test javobi".to_string()]);
    assert_eq!(session.speaker().completed_releases(), 1);
}

#[tokio::test]
async fn blank_input_is_a_noop() {
    let mut session = controller(MockGateway::answering("javob"), MockCapture::default());
    let before = session.messages().len();

    session.submit_text("").await;
    session.submit_text("   \t\n").await;

    assert_eq!(session.messages().len(), before);
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn unreachable_backend_appends_exactly_one_fallback() {
    let mut session = controller(MockGateway::unreachable(), MockCapture::default());

    session.submit_text("Savol").await;

    let history = roles(session.messages());
    assert_eq!(history.len(), 3);
    assert_eq!(history[1], (Role::User, "Savol"));
    assert_eq!(history[2], (Role::Ai, eduline::session::FALLBACK_ANSWER));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.speaker().completed_releases(), 0);
}

#[tokio::test]
async fn synthesis_failure_is_silent_and_keeps_the_answer() {
    let gateway = MockGateway::answering("Ovozsiz javob");
    gateway.tts_fails.store(true, Ordering::SeqCst);
    let mut session = controller(gateway, MockCapture::default());

    session.submit_text("Savol").await;

    let history = roles(session.messages());
    assert_eq!(history.last().unwrap(), &(Role::Ai, "Ovozsiz javob"));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.speaker().completed_releases(), 0);
}

#[tokio::test]
async fn releases_match_completed_speak_calls() {
    let mut session = controller(MockGateway::answering("javob"), MockCapture::default());

    for i in 0..3 {
        session.submit_text(&format!("savol {i}")).await;
    }

    assert_eq!(session.speaker().completed_releases(), 3);
}

// ── Voice turns ──────────────────────────────────────

#[tokio::test]
async fn voice_turn_appends_marked_transcript_then_answer() {
    let gateway = MockGateway::with_voice("salom", "salom!");
    let mut session = controller(gateway, MockCapture::default());

    session.start_recording().unwrap();
    assert_eq!(session.state(), SessionState::Recording);

    session.stop_recording().await;

    let history = roles(session.messages());
    assert_eq!(history[1], (Role::User, "🎤: salom"));
    assert_eq!(history[2], (Role::Ai, "salom!"));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.speaker().completed_releases(), 1);
}

#[tokio::test]
async fn denied_microphone_surfaces_and_stays_idle() {
    let mut session = controller(MockGateway::answering("javob"), MockCapture::denied());
    let before = session.messages().len();

    let result = session.start_recording();
    assert!(matches!(result, Err(CaptureError::PermissionDenied(_))));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.messages().len(), before);
}

#[tokio::test]
async fn empty_capture_returns_to_idle_without_messages() {
    let mut session = controller(MockGateway::answering("javob"), MockCapture::silent());
    let before = session.messages().len();

    session.start_recording().unwrap();
    session.stop_recording().await;

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.messages().len(), before);
}

#[tokio::test]
async fn voice_backend_failure_appends_fallback() {
    let gateway = MockGateway::with_voice("salom", "salom!");
    gateway.ask_fails.store(true, Ordering::SeqCst);
    let mut session = controller(gateway, MockCapture::default());

    session.start_recording().unwrap();
    session.stop_recording().await;

    let history = roles(session.messages());
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], (Role::Ai, eduline::session::FALLBACK_ANSWER));
    assert_eq!(session.state(), SessionState::Idle);
}

// ── State guards ─────────────────────────────────────

#[tokio::test]
async fn busy_session_rejects_new_submissions() {
    let mut session = controller(
        MockGateway::with_voice("salom", "salom!"),
        MockCapture::default(),
    );

    session.start_recording().unwrap();
    let while_recording = session.messages().len();

    // Not Idle: both entry points are no-ops and the history is untouched.
    session.submit_text("yangi savol").await;
    assert_eq!(session.messages().len(), while_recording);

    session.start_recording().unwrap();
    assert_eq!(session.state(), SessionState::Recording);

    session.stop_recording().await;
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn stop_recording_outside_recording_is_a_noop() {
    let mut session = controller(MockGateway::answering("javob"), MockCapture::default());
    let before = session.messages().len();

    session.stop_recording().await;

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.messages().len(), before);
}

#[tokio::test]
async fn greeting_seeds_every_fresh_session() {
    let session = controller(MockGateway::default(), MockCapture::default());
    let history = roles(session.messages());
    assert_eq!(history, vec![(Role::Ai, eduline::session::GREETING)]);
}
