//! Waveform source
//!
//! Opens one WAV track and yields raw sample chunks for transmission. The
//! wire carries signed little-endian PCM at the track's bit depth; 8-bit WAV
//! data (unsigned on disk) is recentered to signed by the reader.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bytes::Bytes;
use hound::{SampleFormat, WavReader};

use crate::error::TrackError;
use crate::protocol::AudioConfig;

/// A lazy, finite reader over one open track
pub struct WaveSource {
    reader: WavReader<BufReader<File>>,
    config: AudioConfig,
}

impl WaveSource {
    /// Open a track. Fails if the path does not exist, is not parseable as
    /// WAV, or uses a sample format outside {8,16,24,32}-bit integer PCM.
    /// The read position starts at the first frame.
    pub fn open(path: &Path) -> Result<Self, TrackError> {
        if !path.is_file() {
            return Err(TrackError::NotFound(path.display().to_string()));
        }

        let reader = WavReader::open(path)
            .map_err(|e| TrackError::OpenFailed(format!("{}: {}", path.display(), e)))?;
        let spec = reader.spec();

        if spec.sample_format != SampleFormat::Int {
            return Err(TrackError::UnsupportedFormat(format!(
                "{}: float PCM",
                path.display()
            )));
        }
        if !matches!(spec.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(TrackError::UnsupportedFormat(format!(
                "{}: {}-bit",
                path.display(),
                spec.bits_per_sample
            )));
        }

        let config = AudioConfig::new(spec.sample_rate, spec.bits_per_sample, spec.channels);
        tracing::info!("Opened '{}': {}", path.display(), config);

        Ok(Self { reader, config })
    }

    /// Sample format of the open track
    pub fn config(&self) -> AudioConfig {
        self.config
    }

    /// Read up to `max_frames` frames of raw little-endian sample data.
    ///
    /// Returns an empty chunk at end-of-stream. The last non-empty chunk of
    /// a track may be shorter than `max_frames`.
    pub fn read_chunk(&mut self, max_frames: usize) -> Result<Bytes, TrackError> {
        let wanted = max_frames * self.config.channel_count as usize;
        let bytes_per_sample = self.config.bits_per_sample as usize / 8;
        let mut out = Vec::with_capacity(wanted * bytes_per_sample);

        let bits = self.config.bits_per_sample;
        let mut samples = self.reader.samples::<i32>();
        for _ in 0..wanted {
            match samples.next() {
                Some(Ok(sample)) => match bits {
                    8 => out.push(sample as i8 as u8),
                    16 => out.extend_from_slice(&(sample as i16).to_le_bytes()),
                    24 => out.extend_from_slice(&sample.to_le_bytes()[..3]),
                    _ => out.extend_from_slice(&sample.to_le_bytes()),
                },
                Some(Err(e)) => return Err(TrackError::ReadFailed(e.to_string())),
                None => break,
            }
        }

        Ok(Bytes::from(out))
    }
}
