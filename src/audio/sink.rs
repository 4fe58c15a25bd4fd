//! Hardware audio sink
//!
//! The receiver writes raw PCM into an [`AudioSink`]. The production
//! implementation drives the default cpal output device: `configure` tears
//! down any previous stream before building the new one (the device is never
//! double-opened), and `write` converts the wire's signed little-endian PCM
//! to f32 pushed through a lock-free ring that the stream callback drains.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam::queue::ArrayQueue;
use crossbeam_channel::bounded;
use parking_lot::Mutex;

use crate::error::SinkError;
use crate::protocol::AudioConfig;

/// A configurable PCM sink
pub trait AudioSink {
    /// Apply a session configuration, releasing any previous session first.
    /// On failure the sink is left unconfigured.
    fn configure(&mut self, config: &AudioConfig) -> Result<(), SinkError>;

    /// Write one chunk of raw signed little-endian PCM at the active bit
    /// depth. Fails if no configuration has been applied.
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError>;

    fn is_configured(&self) -> bool;
}

/// Reject formats the sink can never render
fn validate_config(config: &AudioConfig) -> Result<(), SinkError> {
    if config.sample_rate_hz == 0 {
        return Err(SinkError::Configure("sample rate must be positive".into()));
    }
    if config.channel_count == 0 {
        return Err(SinkError::Configure("channel count must be positive".into()));
    }
    if !matches!(config.bits_per_sample, 8 | 16 | 24 | 32) {
        return Err(SinkError::Configure(format!(
            "unsupported bit depth: {}",
            config.bits_per_sample
        )));
    }
    Ok(())
}

/// Convert signed little-endian PCM at `bits` depth to f32 in [-1, 1).
/// Trailing bytes that do not form a whole sample are ignored.
pub(crate) fn pcm_to_f32(bytes: &[u8], bits: u16, out: &mut Vec<f32>) {
    match bits {
        8 => {
            for &b in bytes {
                out.push(b as i8 as f32 / 128.0);
            }
        }
        16 => {
            for pair in bytes.chunks_exact(2) {
                out.push(i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0);
            }
        }
        24 => {
            for triple in bytes.chunks_exact(3) {
                let raw = i32::from_le_bytes([triple[0], triple[1], triple[2], 0]);
                // sign-extend from 24 bits
                let sample = (raw << 8) >> 8;
                out.push(sample as f32 / 8_388_608.0);
            }
        }
        32 => {
            for quad in bytes.chunks_exact(4) {
                let sample = i32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
                out.push(sample as f32 / 2_147_483_648.0);
            }
        }
        _ => {}
    }
}

struct SinkSession {
    config: AudioConfig,
    ring: Arc<ArrayQueue<f32>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    stream_error: Arc<Mutex<Option<String>>>,
    dropped_samples: Arc<AtomicUsize>,
}

impl SinkSession {
    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Sink backed by the default cpal output device
pub struct CpalSink {
    session: Option<SinkSession>,
}

impl CpalSink {
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Sample format of the active session, if any
    pub fn active_config(&self) -> Option<AudioConfig> {
        self.session.as_ref().map(|s| s.config)
    }

    /// Samples dropped on ring overflow since the session opened
    pub fn dropped_samples(&self) -> usize {
        self.session
            .as_ref()
            .map_or(0, |s| s.dropped_samples.load(Ordering::Relaxed))
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            tracing::info!("Releasing sink session ({})", session.config);
            session.shutdown();
        }
    }
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for CpalSink {
    fn configure(&mut self, config: &AudioConfig) -> Result<(), SinkError> {
        validate_config(config)?;

        // Release the previous hardware session before acquiring a new one.
        self.teardown();

        // One second of audio at the session rate.
        let ring_capacity =
            (config.sample_rate_hz as usize * config.channel_count as usize).max(4096);
        let ring = Arc::new(ArrayQueue::<f32>::new(ring_capacity));
        let running = Arc::new(AtomicBool::new(true));
        let stream_error = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = bounded::<Result<(), SinkError>>(1);

        let thread_ring = ring.clone();
        let thread_running = running.clone();
        let thread_error = stream_error.clone();
        let stream_config = cpal::StreamConfig {
            channels: config.channel_count,
            sample_rate: cpal::SampleRate(config.sample_rate_hz),
            buffer_size: cpal::BufferSize::Default,
        };

        let handle = thread::Builder::new()
            .name("sink-output".to_string())
            .spawn(move || {
                let host = cpal::default_host();
                let device = match host.default_output_device() {
                    Some(device) => device,
                    None => {
                        let _ = ready_tx.send(Err(SinkError::DeviceNotFound(
                            "no default output device".into(),
                        )));
                        return;
                    }
                };

                let callback_ring = thread_ring;
                let callback_error = thread_error;
                let stream = device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for slot in data.iter_mut() {
                            // zero-fill on underrun
                            *slot = callback_ring.pop().unwrap_or(0.0);
                        }
                    },
                    move |err| {
                        *callback_error.lock() = Some(err.to_string());
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx.send(Err(SinkError::StreamError(e.to_string())));
                            return;
                        }
                        let _ = ready_tx.send(Ok(()));

                        // Keep the stream alive until the session is released.
                        while thread_running.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(SinkError::StreamError(e.to_string())));
                    }
                }
            })
            .map_err(|e| SinkError::StreamError(e.to_string()))?;

        match ready_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(Ok(())) => {
                tracing::info!("Sink configured: {}", config);
                self.session = Some(SinkSession {
                    config: *config,
                    ring,
                    running,
                    thread: Some(handle),
                    stream_error,
                    dropped_samples: Arc::new(AtomicUsize::new(0)),
                });
                Ok(())
            }
            Ok(Err(e)) => {
                running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                running.store(false, Ordering::SeqCst);
                Err(SinkError::Configure("stream startup timed out".into()))
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let session = self.session.as_ref().ok_or(SinkError::NotConfigured)?;

        if let Some(error) = session.stream_error.lock().take() {
            tracing::warn!("Output stream reported: {}", error);
        }

        let mut samples = Vec::with_capacity(bytes.len() / 2);
        pcm_to_f32(bytes, session.config.bits_per_sample, &mut samples);

        let mut dropped = 0usize;
        for sample in samples {
            if session.ring.push(sample).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            session.dropped_samples.fetch_add(dropped, Ordering::Relaxed);
        }
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// In-memory sink for tests
#[cfg(test)]
pub struct MockSink {
    pub configured_with: Vec<AudioConfig>,
    pub writes: Vec<Vec<u8>>,
    /// Refuse this many configure calls before accepting
    pub fail_times: usize,
    active: Option<AudioConfig>,
}

#[cfg(test)]
impl MockSink {
    pub fn new() -> Self {
        Self {
            configured_with: Vec::new(),
            writes: Vec::new(),
            fail_times: 0,
            active: None,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.writes.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
impl AudioSink for MockSink {
    fn configure(&mut self, config: &AudioConfig) -> Result<(), SinkError> {
        validate_config(config)?;
        // Previous session is released even when the new one fails to open.
        self.active = None;
        if self.fail_times > 0 {
            self.fail_times -= 1;
            return Err(SinkError::Configure("mock refusal".into()));
        }
        self.configured_with.push(*config);
        self.active = Some(*config);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        if self.active.is_none() {
            return Err(SinkError::NotConfigured);
        }
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.active.is_some()
    }
}
