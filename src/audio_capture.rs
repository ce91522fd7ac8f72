//! audio_capture.rs — Microphone capture lifecycle via cpal.
//! One live capture per owner: acquire the device, buffer samples, finalize
//! everything into a single WAV payload on stop.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use hound::{WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use crate::error::CaptureError;
use crate::logging::{client_info, client_warn};

/// Capture lifecycle seam. `MicCapture` is the production implementation;
/// tests substitute a canned payload.
pub trait AudioCapture {
    /// Open the input device and build the (paused) stream.
    fn acquire(&mut self) -> Result<(), CaptureError>;
    /// Begin buffering. Valid only after a successful `acquire()`.
    fn start(&mut self) -> Result<(), CaptureError>;
    /// Finalize the buffer into one encoded WAV payload. The device handle
    /// is released unconditionally, even when this returns an error.
    fn stop(&mut self) -> Result<Vec<u8>, CaptureError>;
}

struct CaptureBuffer {
    samples: Vec<i16>,
    recording: bool,
    sample_rate: u32,
    channels: u16,
}

/// Native microphone capture. Samples accumulate as 16-bit mono PCM;
/// a 16 kHz config is preferred when the device offers one.
pub struct MicCapture {
    shared: Arc<Mutex<CaptureBuffer>>,
    stream: Option<cpal::Stream>,
}

impl MicCapture {
    pub fn new() -> Self {
        MicCapture {
            shared: Arc::new(Mutex::new(CaptureBuffer {
                samples: Vec::new(),
                recording: false,
                sample_rate: 16000,
                channels: 1,
            })),
            stream: None,
        }
    }
}

impl Default for MicCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCapture for MicCapture {
    fn acquire(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::PermissionDenied("no input device found".into()))?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".into());
        let config = preferred_input_config(&device)?;
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        {
            let mut b = lock_buffer(&self.shared);
            b.samples.clear();
            b.recording = false;
            b.sample_rate = sample_rate;
            b.channels = channels;
        }

        let shared = Arc::clone(&self.shared);
        let err_fn = |err| client_warn(format!("Capture stream error: {err}"));

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut b = lock_buffer(&shared);
                    if !b.recording {
                        return;
                    }
                    // Average channels to mono, convert f32 → i16.
                    let channels = b.channels.max(1) as usize;
                    for chunk in data.chunks(channels) {
                        let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
                        let sample =
                            (mono * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                        b.samples.push(sample);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| CaptureError::PermissionDenied(format!("cannot open input stream: {e}")))?;

        client_info(format!(
            "Capture device acquired: {device_name} ({sample_rate}Hz, {channels}ch)"
        ));
        self.stream = Some(stream);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let stream = self.stream.as_ref().ok_or(CaptureError::NotAcquired)?;

        {
            let mut b = lock_buffer(&self.shared);
            if b.recording {
                return Err(CaptureError::AlreadyRecording);
            }
            b.samples.clear();
            b.recording = true;
        }

        stream
            .play()
            .map_err(|e| CaptureError::PermissionDenied(format!("cannot start capture: {e}")))?;
        client_info("Microphone capture started");
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<u8>, CaptureError> {
        // Dropping the stream releases the device handle before anything
        // else can fail.
        let had_stream = self.stream.take().is_some();

        let (samples, sample_rate) = {
            let mut b = lock_buffer(&self.shared);
            b.recording = false;
            (std::mem::take(&mut b.samples), b.sample_rate)
        };

        if !had_stream {
            return Err(CaptureError::NotAcquired);
        }
        if samples.is_empty() {
            return Err(CaptureError::EmptyCapture);
        }

        let duration_secs = samples.len() as f32 / sample_rate as f32;
        client_info(format!(
            "Capture finalized: {:.1}s ({} samples)",
            duration_secs,
            samples.len()
        ));

        encode_wav(&samples, sample_rate)
    }
}

fn lock_buffer(shared: &Arc<Mutex<CaptureBuffer>>) -> std::sync::MutexGuard<'_, CaptureBuffer> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Encode mono i16 samples as 16-bit PCM WAV, in memory.
fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, CaptureError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| CaptureError::Encode(format!("WAV writer error: {e}")))?;
        for sample in samples {
            writer
                .write_sample(*sample)
                .map_err(|e| CaptureError::Encode(format!("WAV write error: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| CaptureError::Encode(format!("WAV finalize error: {e}")))?;
    }

    Ok(cursor.into_inner())
}

/// Prefer a 16 kHz config (speech-friendly), fall back to the device default.
fn preferred_input_config(device: &cpal::Device) -> Result<StreamConfig, CaptureError> {
    if let Ok(configs) = device.supported_input_configs() {
        for cfg in configs {
            if cfg.channels() <= 2 {
                let rate = SampleRate(16000);
                if cfg.min_sample_rate() <= rate && rate <= cfg.max_sample_rate() {
                    return Ok(cfg.with_sample_rate(rate).into());
                }
            }
        }
    }

    device
        .default_input_config()
        .map(|c| c.into())
        .map_err(|e| CaptureError::PermissionDenied(format!("no input config available: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_wav_produces_riff_header_and_data() {
        let samples: Vec<i16> = (0..160).map(|i| (i * 50) as i16).collect();
        let wav = encode_wav(&samples, 16000).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header + 2 bytes per sample.
        assert_eq!(wav.len(), 44 + samples.len() * 2);
    }

    #[test]
    fn stop_without_acquire_reports_not_acquired() {
        let mut capture = MicCapture::new();
        assert!(matches!(capture.stop(), Err(CaptureError::NotAcquired)));
    }

    #[test]
    fn start_without_acquire_reports_not_acquired() {
        let mut capture = MicCapture::new();
        assert!(matches!(capture.start(), Err(CaptureError::NotAcquired)));
    }
}
