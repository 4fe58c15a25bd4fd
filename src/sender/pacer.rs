//! Pacing worker
//!
//! One worker thread per audio session: read a chunk, scale it, transmit it,
//! then sleep for the chunk's nominal playback duration so the long-run send
//! rate matches the sink's consumption rate. The worker owns the open
//! [`WaveSource`]; dropping the worker closes the track.
//!
//! Cancellation is cooperative and bounded: the engine sets the stop flag,
//! waits up to [`PACER_STOP_TIMEOUT_MS`](crate::constants::PACER_STOP_TIMEOUT_MS)
//! on the completion channel, and logs a warning instead of hanging if the
//! worker overruns the budget.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};

use crate::audio::scaler::scale_chunk;
use crate::constants::{PACER_IDLE_POLL_MS, PACER_STOP_TIMEOUT_MS};
use crate::network::AudioLink;
use crate::tracks::WaveSource;

struct PacerFlags {
    stop: AtomicBool,
    paused: AtomicBool,
    finished: AtomicBool,
}

/// Handle to the single live pacing worker
pub struct PacerHandle {
    flags: Arc<PacerFlags>,
    done_rx: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl PacerHandle {
    /// Start a worker streaming `source` over `link`, scaling each chunk by
    /// the shared volume level.
    pub fn spawn<L: AudioLink>(
        mut source: WaveSource,
        link: L,
        volume: Arc<AtomicU8>,
        chunk_frames: usize,
    ) -> std::io::Result<Self> {
        let flags = Arc::new(PacerFlags {
            stop: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        });
        let (done_tx, done_rx) = bounded::<()>(1);

        let worker_flags = flags.clone();
        let thread = thread::Builder::new()
            .name("pacer".to_string())
            .spawn(move || {
                let config = source.config();
                if config.sample_rate_hz == 0 {
                    tracing::warn!("Refusing to pace a zero-rate track");
                    worker_flags.finished.store(true, Ordering::SeqCst);
                    let _ = done_tx.send(());
                    return;
                }
                let chunk_duration =
                    Duration::from_secs_f64(chunk_frames as f64 / config.sample_rate_hz as f64);
                let idle = Duration::from_millis(PACER_IDLE_POLL_MS);

                loop {
                    if worker_flags.stop.load(Ordering::SeqCst) {
                        break;
                    }
                    if worker_flags.paused.load(Ordering::SeqCst) {
                        thread::sleep(idle);
                        continue;
                    }

                    let chunk = match source.read_chunk(chunk_frames) {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            tracing::warn!("Track read failed, halting stream: {}", e);
                            worker_flags.finished.store(true, Ordering::SeqCst);
                            break;
                        }
                    };
                    if chunk.is_empty() {
                        tracing::info!("End of track");
                        worker_flags.finished.store(true, Ordering::SeqCst);
                        break;
                    }

                    let level = volume.load(Ordering::Relaxed);
                    let scaled = scale_chunk(chunk, level, config.bits_per_sample);

                    if let Err(e) = link.send(&scaled) {
                        tracing::warn!("Audio send failed, halting stream: {}", e);
                        worker_flags.finished.store(true, Ordering::SeqCst);
                        break;
                    }

                    thread::sleep(chunk_duration);
                }
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            flags,
            done_rx,
            thread: Some(thread),
        })
    }

    /// Gate the worker's output without ending the session
    pub fn pause(&self) {
        self.flags.paused.store(true, Ordering::SeqCst);
    }

    /// Lift the output gate
    pub fn resume(&self) {
        self.flags.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    /// True when the worker exited on its own (end of track, read or send
    /// failure) rather than by request.
    pub fn is_finished(&self) -> bool {
        self.flags.finished.load(Ordering::SeqCst)
    }

    /// Request a stop and wait out the join budget
    pub fn stop(mut self) {
        self.flags.stop.store(true, Ordering::SeqCst);
        match self
            .done_rx
            .recv_timeout(Duration::from_millis(PACER_STOP_TIMEOUT_MS))
        {
            Ok(()) => {
                if let Some(handle) = self.thread.take() {
                    let _ = handle.join();
                }
            }
            Err(_) => {
                tracing::warn!("Pacing worker did not stop within budget, detaching");
                self.thread.take();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::time::Instant;

    struct FakeLink {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl AudioLink for FakeLink {
        fn send(&self, chunk: &[u8]) -> Result<(), NetworkError> {
            if self.fail {
                return Err(NetworkError::SendFailed("down".into()));
            }
            self.sent.lock().push(chunk.to_vec());
            Ok(())
        }
    }

    fn write_wav(dir: &Path, frames: usize) -> PathBuf {
        let path = dir.join("t.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample((i % 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_streams_to_end_and_finishes() {
        let dir = tempfile::tempdir().unwrap();
        // 3 chunks of 64 frames at 8kHz: ~24ms of pacing.
        let source = WaveSource::open(&write_wav(dir.path(), 192)).unwrap();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let link = FakeLink {
            sent: sent.clone(),
            fail: false,
        };

        let pacer =
            PacerHandle::spawn(source, link, Arc::new(AtomicU8::new(100)), 64).unwrap();
        assert!(wait_until(Duration::from_secs(2), || pacer.is_finished()));
        assert_eq!(sent.lock().len(), 3);
        assert_eq!(sent.lock()[0].len(), 64 * 2);
        pacer.stop();
    }

    #[test]
    fn test_pause_gates_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = WaveSource::open(&write_wav(dir.path(), 8000)).unwrap();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let link = FakeLink {
            sent: sent.clone(),
            fail: false,
        };

        let pacer =
            PacerHandle::spawn(source, link, Arc::new(AtomicU8::new(100)), 64).unwrap();
        assert!(wait_until(Duration::from_secs(2), || !sent.lock().is_empty()));

        pacer.pause();
        // Let the in-flight chunk drain, then the count must hold still.
        thread::sleep(Duration::from_millis(120));
        let frozen = sent.lock().len();
        thread::sleep(Duration::from_millis(120));
        assert_eq!(sent.lock().len(), frozen);
        assert!(!pacer.is_finished());

        pacer.resume();
        assert!(wait_until(Duration::from_secs(2), || sent.lock().len() > frozen));
        pacer.stop();
    }

    #[test]
    fn test_send_failure_halts() {
        let dir = tempfile::tempdir().unwrap();
        let source = WaveSource::open(&write_wav(dir.path(), 8000)).unwrap();
        let link = FakeLink {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        };

        let pacer =
            PacerHandle::spawn(source, link, Arc::new(AtomicU8::new(100)), 64).unwrap();
        assert!(wait_until(Duration::from_secs(2), || pacer.is_finished()));
        pacer.stop();
    }

    #[test]
    fn test_stop_within_budget() {
        let dir = tempfile::tempdir().unwrap();
        let source = WaveSource::open(&write_wav(dir.path(), 80000)).unwrap();
        let link = FakeLink {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        };

        let pacer =
            PacerHandle::spawn(source, link, Arc::new(AtomicU8::new(100)), 64).unwrap();
        let started = Instant::now();
        pacer.stop();
        assert!(started.elapsed() < Duration::from_millis(PACER_STOP_TIMEOUT_MS + 200));
    }

    #[test]
    fn test_volume_is_applied_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let source = WaveSource::open(&write_wav(dir.path(), 64)).unwrap();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let link = FakeLink {
            sent: sent.clone(),
            fail: false,
        };

        let pacer = PacerHandle::spawn(source, link, Arc::new(AtomicU8::new(0)), 64).unwrap();
        assert!(wait_until(Duration::from_secs(2), || pacer.is_finished()));
        let chunks = sent.lock();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].iter().all(|&b| b == 0));
        drop(chunks);
        pacer.stop();
    }
}
