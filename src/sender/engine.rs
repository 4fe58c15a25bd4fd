//! Streaming engine state machine
//!
//! Owns the playlist position, the playback state, the shared volume level
//! and the single pacing worker. All mutation funnels through
//! [`StreamEngine::handle_command`]; the stop-before-start discipline on the
//! one `Option<PacerHandle>` is what guarantees two workers never write to
//! the same socket or track at once.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::command::TransportCommand;
use crate::constants::CONFIG_REPEAT_COUNT;
use crate::network::{AudioLink, ControlLink};
use crate::protocol::ControlMessage;
use crate::sender::pacer::PacerHandle;
use crate::tracks::{Playlist, WaveSource};

/// Sender-side transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

pub struct StreamEngine<C: ControlLink, A: AudioLink + Sync> {
    playlist: Playlist,
    index: usize,
    state: PlaybackState,
    volume: Arc<AtomicU8>,
    control: C,
    audio: Arc<A>,
    pacer: Option<PacerHandle>,
    chunk_frames: usize,
}

impl<C: ControlLink, A: AudioLink + Sync> StreamEngine<C, A> {
    /// `playlist` is non-empty by construction ([`Playlist`] refuses empty
    /// scans), so the active index is always valid.
    pub fn new(
        playlist: Playlist,
        control: C,
        audio: A,
        initial_volume: u8,
        chunk_frames: usize,
    ) -> Self {
        Self {
            playlist,
            index: 0,
            state: PlaybackState::Stopped,
            volume: Arc::new(AtomicU8::new(initial_volume.min(100))),
            control,
            audio: Arc::new(audio),
            pacer: None,
            chunk_frames,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn track_index(&self) -> usize {
        self.index
    }

    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::Relaxed)
    }

    /// Apply one transport command to the state machine
    pub fn handle_command(&mut self, command: TransportCommand) {
        self.reap_finished();
        match command {
            TransportCommand::Play => self.play(),
            TransportCommand::Pause => self.pause(),
            TransportCommand::Next => {
                self.index = self.playlist.wrap_next(self.index);
                tracing::info!("Skipping forward to track {}", self.index);
                self.send_control(&ControlMessage::Next);
                self.start_session();
            }
            TransportCommand::Prev => {
                self.index = self.playlist.wrap_prev(self.index);
                tracing::info!("Skipping back to track {}", self.index);
                self.send_control(&ControlMessage::Prev);
                self.start_session();
            }
            TransportCommand::StopFull => self.stop_full(),
            TransportCommand::Volume(level) => self.set_volume(level),
        }
    }

    /// Notice a worker that halted on its own (end of track, dead link) and
    /// move the machine to Stopped so it never stays Playing over a dead
    /// session. Safe to call from the main loop on every tick.
    pub fn reap_finished(&mut self) {
        if self.pacer.as_ref().map_or(false, PacerHandle::is_finished) {
            if let Some(pacer) = self.pacer.take() {
                pacer.stop();
            }
            tracing::info!("Stream session ended, transport stopped");
            self.state = PlaybackState::Stopped;
        }
    }

    /// Send the current volume over the control channel (startup announce)
    pub fn announce_volume(&self) {
        self.send_control(&ControlMessage::Vol(self.volume()));
    }

    fn play(&mut self) {
        // Resume in place: the worker is alive, the track position is kept.
        if self.state == PlaybackState::Paused {
            if let Some(pacer) = &self.pacer {
                pacer.resume();
                self.send_control(&ControlMessage::Play);
                self.state = PlaybackState::Playing;
                return;
            }
        }
        self.start_session();
    }

    /// Full PLAY sequence: stop any worker, open the active track, announce
    /// the session config with redundancy, start pacing, announce PLAY.
    fn start_session(&mut self) {
        if let Some(pacer) = self.pacer.take() {
            pacer.stop();
        }

        let path = match self.playlist.get(self.index) {
            Some(path) => path,
            None => return,
        };
        let source = match WaveSource::open(path) {
            Ok(source) => source,
            Err(e) => {
                // PLAY aborts; whatever state we were in stands.
                tracing::warn!("Cannot open track {}: {}", self.index, e);
                return;
            }
        };
        let config = source.config();

        // CONFIG is fatal to lose, so it goes out three times with small
        // increasing gaps between the repeats.
        let announce = ControlMessage::Config(config);
        for attempt in 0..CONFIG_REPEAT_COUNT {
            self.send_control(&announce);
            thread::sleep(Duration::from_millis(50 + attempt as u64 * 20));
        }

        match PacerHandle::spawn(
            source,
            self.audio.clone(),
            self.volume.clone(),
            self.chunk_frames,
        ) {
            Ok(pacer) => {
                self.pacer = Some(pacer);
                self.send_control(&ControlMessage::Play);
                self.state = PlaybackState::Playing;
            }
            Err(e) => {
                tracing::error!("Failed to start pacing worker: {}", e);
                self.state = PlaybackState::Stopped;
            }
        }
    }

    fn pause(&mut self) {
        if let Some(pacer) = &self.pacer {
            pacer.pause();
        }
        // Always announced, even without a session (receiver self-corrects).
        self.send_control(&ControlMessage::Pause);
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    fn stop_full(&mut self) {
        if let Some(pacer) = self.pacer.take() {
            pacer.stop();
        }
        self.send_control(&ControlMessage::Stop);
        self.state = PlaybackState::Stopped;
    }

    fn set_volume(&mut self, level: u8) {
        let level = level.min(100);
        self.volume.store(level, Ordering::Relaxed);
        self.send_control(&ControlMessage::Vol(level));
    }

    fn send_control(&self, message: &ControlMessage) {
        if let Err(e) = self.control.send(message) {
            tracing::warn!("Control send failed ({}): {}", message.encode(), e);
        }
    }
}

impl<C: ControlLink, A: AudioLink + Sync> Drop for StreamEngine<C, A> {
    fn drop(&mut self) {
        if let Some(pacer) = self.pacer.take() {
            pacer.stop();
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

    #[derive(Clone, Default)]
    struct FakeControl {
        sent: Arc<Mutex<Vec<ControlMessage>>>,
    }

    impl ControlLink for FakeControl {
        fn send(&self, message: &ControlMessage) -> Result<(), NetworkError> {
            self.sent.lock().push(*message);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeAudio {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        fail: bool,
    }

    impl AudioLink for FakeAudio {
        fn send(&self, chunk: &[u8]) -> Result<(), NetworkError> {
            if self.fail {
                return Err(NetworkError::SendFailed("down".into()));
            }
            self.sent.lock().push(chunk.to_vec());
            Ok(())
        }
    }

    fn write_wav(dir: &Path, name: &str, frames: usize) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample((i % 50) as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn engine_with_tracks(
        dir: &Path,
        frames_per_track: &[usize],
    ) -> (StreamEngine<FakeControl, FakeAudio>, FakeControl, FakeAudio) {
        let paths: Vec<PathBuf> = frames_per_track
            .iter()
            .enumerate()
            .map(|(i, &frames)| write_wav(dir, &format!("{i}.wav"), frames))
            .collect();
        let playlist = Playlist::from_paths(paths).unwrap();
        let control = FakeControl::default();
        let audio = FakeAudio::default();
        let engine = StreamEngine::new(playlist, control.clone(), audio.clone(), 75, 64);
        (engine, control, audio)
    }

    fn config_count(control: &FakeControl) -> usize {
        control
            .sent
            .lock()
            .iter()
            .filter(|m| matches!(m, ControlMessage::Config(_)))
            .count()
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
    fn test_play_from_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, control, audio) = engine_with_tracks(dir.path(), &[8000]);

        engine.handle_command(TransportCommand::Play);
        assert_eq!(engine.state(), PlaybackState::Playing);

        let messages = control.sent.lock().clone();
        assert_eq!(config_count(&control), 3);
        assert_eq!(*messages.last().unwrap(), ControlMessage::Play);

        assert!(wait_until(Duration::from_secs(2), || {
            !audio.sent.lock().is_empty()
        }));
        engine.handle_command(TransportCommand::StopFull);
    }

    #[test]
    fn test_config_announces_track_format() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, control, _) = engine_with_tracks(dir.path(), &[64]);

        engine.handle_command(TransportCommand::Play);
        let messages = control.sent.lock().clone();
        match messages[0] {
            ControlMessage::Config(config) => {
                assert_eq!(config.sample_rate_hz, 8000);
                assert_eq!(config.bits_per_sample, 16);
                assert_eq!(config.channel_count, 1);
            }
            ref other => panic!("expected CONFIG first, got {:?}", other),
        }
        engine.handle_command(TransportCommand::StopFull);
    }

    #[test]
    fn test_pause_and_resume_keep_session() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, control, _) = engine_with_tracks(dir.path(), &[80000]);

        engine.handle_command(TransportCommand::Play);
        engine.handle_command(TransportCommand::Pause);
        assert_eq!(engine.state(), PlaybackState::Paused);
        assert!(control.sent.lock().contains(&ControlMessage::Pause));

        // Resume must not re-announce CONFIG: same session, same position.
        engine.handle_command(TransportCommand::Play);
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(config_count(&control), 3);
        engine.handle_command(TransportCommand::StopFull);
    }

    #[test]
    fn test_pause_from_stopped_is_state_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, control, _) = engine_with_tracks(dir.path(), &[64]);

        engine.handle_command(TransportCommand::Pause);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        // The transport message still goes out.
        assert_eq!(control.sent.lock().as_slice(), &[ControlMessage::Pause]);
    }

    #[test]
    fn test_next_advances_and_restreams() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, control, _) = engine_with_tracks(dir.path(), &[80000, 80000]);

        engine.handle_command(TransportCommand::Play);
        engine.handle_command(TransportCommand::Next);
        assert_eq!(engine.track_index(), 1);
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert!(control.sent.lock().contains(&ControlMessage::Next));
        // Two full sessions announced.
        assert_eq!(config_count(&control), 6);

        // Wraps around.
        engine.handle_command(TransportCommand::Next);
        assert_eq!(engine.track_index(), 0);
        engine.handle_command(TransportCommand::StopFull);
    }

    #[test]
    fn test_prev_wraps_backwards() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, control, _) = engine_with_tracks(dir.path(), &[64, 64, 64]);

        engine.handle_command(TransportCommand::Prev);
        assert_eq!(engine.track_index(), 2);
        assert!(control.sent.lock().contains(&ControlMessage::Prev));
        engine.handle_command(TransportCommand::StopFull);
    }

    #[test]
    fn test_stop_full_tears_down() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, control, _) = engine_with_tracks(dir.path(), &[80000]);

        engine.handle_command(TransportCommand::Play);
        engine.handle_command(TransportCommand::StopFull);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(*control.sent.lock().last().unwrap(), ControlMessage::Stop);
    }

    #[test]
    fn test_unreadable_track_aborts_play() {
        let playlist = Playlist::from_paths(vec![PathBuf::from("/no/such/track.wav")]).unwrap();
        let control = FakeControl::default();
        let mut engine =
            StreamEngine::new(playlist, control.clone(), FakeAudio::default(), 75, 64);

        engine.handle_command(TransportCommand::Play);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        // No CONFIG, no PLAY: the transition aborted before announcing.
        assert!(control.sent.lock().is_empty());
    }

    #[test]
    fn test_end_of_track_reaps_to_stopped() {
        let dir = tempfile::tempdir().unwrap();
        // Single 64-frame track: one chunk and the stream is done.
        let (mut engine, _, _) = engine_with_tracks(dir.path(), &[64]);

        engine.handle_command(TransportCommand::Play);
        assert!(wait_until(Duration::from_secs(2), || {
            engine.reap_finished();
            engine.state() == PlaybackState::Stopped
        }));
    }

    #[test]
    fn test_dead_link_reaps_to_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "t.wav", 80000);
        let playlist = Playlist::from_paths(vec![path]).unwrap();
        let audio = FakeAudio {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        };
        let mut engine = StreamEngine::new(playlist, FakeControl::default(), audio, 75, 64);

        engine.handle_command(TransportCommand::Play);
        assert!(wait_until(Duration::from_secs(2), || {
            engine.reap_finished();
            engine.state() == PlaybackState::Stopped
        }));
    }

    #[test]
    fn test_volume_clamped_stored_and_announced() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, control, _) = engine_with_tracks(dir.path(), &[64]);

        engine.handle_command(TransportCommand::Volume(150));
        assert_eq!(engine.volume(), 100);
        assert_eq!(*control.sent.lock().last().unwrap(), ControlMessage::Vol(100));

        engine.handle_command(TransportCommand::Volume(42));
        assert_eq!(engine.volume(), 42);
    }
}
