//! speech.rs — synthesized-speech playback with guaranteed release.
//! Fetches audio for an answer from the Backend Gateway and plays it through
//! rodio; the synthesized buffer is released exactly once on every exit path.

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};
use std::io::{BufReader, Cursor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::SynthesisError;
use crate::gateway::Gateway;
use crate::logging::{client_info, client_warn};

// ── Release accounting ───────────────────────────────

/// Travels with one synthesized payload; its Drop is the release.
/// Whoever ends up owning the guard — the playback thread on completion,
/// an error path inside the output, or the output itself — drops it once.
pub struct ReleaseGuard {
    counter: Arc<AtomicUsize>,
}

impl ReleaseGuard {
    pub(crate) fn new(counter: Arc<AtomicUsize>) -> Self {
        ReleaseGuard { counter }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Output seam ──────────────────────────────────────

/// Playback backend. `RodioOutput` is the production implementation; tests
/// substitute an output that completes immediately.
pub trait AudioOutput: Send + Sync {
    /// Begin playback of one synthesized payload at the given volume.
    /// The guard must accompany the payload until playback ends.
    fn play(&self, audio: Vec<u8>, volume: f32, guard: ReleaseGuard) -> Result<(), SynthesisError>;
}

/// Plays through the default audio device on a detached thread, so the
/// session returns to idle while audio is still audible.
pub struct RodioOutput;

impl AudioOutput for RodioOutput {
    fn play(&self, audio: Vec<u8>, volume: f32, guard: ReleaseGuard) -> Result<(), SynthesisError> {
        std::thread::spawn(move || {
            // Owns the guard for the rest of playback; dropped on every
            // return path below.
            let _guard = guard;

            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    client_warn(format!("Cannot open audio output: {e}"));
                    return;
                }
            };

            let sink = match Sink::try_new(&handle) {
                Ok(sink) => sink,
                Err(e) => {
                    client_warn(format!("Cannot create audio sink: {e}"));
                    return;
                }
            };

            sink.set_volume(volume.clamp(0.0, 1.0));

            let source = match Decoder::new(BufReader::new(Cursor::new(audio))) {
                Ok(source) => source,
                Err(e) => {
                    client_warn(format!("Cannot decode synthesized audio: {e}"));
                    return;
                }
            };

            sink.append(source);
            sink.sleep_until_end();
            drop(stream);
        });

        Ok(())
    }
}

// ── Speaker ──────────────────────────────────────────

/// Seam the session controller talks to when an answer should be voiced.
#[async_trait]
pub trait Speaker: Send {
    async fn speak(&mut self, text: &str) -> Result<(), SynthesisError>;
}

/// Production speaker: `/text-to-speech` → binary audio → playback at full,
/// normalized volume.
pub struct SynthesisPlayer<G: Gateway> {
    gateway: Arc<G>,
    output: Box<dyn AudioOutput>,
    volume: f32,
    releases: Arc<AtomicUsize>,
}

impl<G: Gateway> SynthesisPlayer<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_output(gateway, Box::new(RodioOutput))
    }

    pub fn with_output(gateway: Arc<G>, output: Box<dyn AudioOutput>) -> Self {
        SynthesisPlayer {
            gateway,
            output,
            volume: 1.0,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many synthesized-audio resources have been released so far.
    /// Equals the number of completed `speak` calls.
    pub fn completed_releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<G: Gateway> Speaker for SynthesisPlayer<G> {
    async fn speak(&mut self, text: &str) -> Result<(), SynthesisError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let audio = self.gateway.text_to_speech(text).await.map_err(|e| {
            client_warn(format!("Synthesis request failed: {e}"));
            SynthesisError::from(e)
        })?;

        if audio.is_empty() {
            return Err(SynthesisError::Decode("empty audio payload".into()));
        }

        client_info(format!(
            "Playing synthesized answer ({} KB)",
            audio.len() / 1024
        ));

        let guard = ReleaseGuard::new(Arc::clone(&self.releases));
        self.output.play(audio, self.volume, guard)
    }
}
