//! Control channel protocol
//!
//! A compact text protocol carried one command per UDP datagram. The wire
//! grammar is case-insensitive and colon-separated:
//!
//! ```text
//! CONFIG:<sampleRateHz>:<bitsPerSample>:<channelCount>
//! VOL:<level>
//! PLAY | PAUSE | NEXT | PREV | STOP
//! ```
//!
//! Messages are parsed exactly once at this boundary into [`ControlMessage`];
//! everything downstream matches on the enum. The channel is unacknowledged:
//! parse failures are reported to the caller, logged there, and discarded.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Sample format of one audio session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub bits_per_sample: u16,
    pub channel_count: u16,
}

impl AudioConfig {
    pub fn new(sample_rate_hz: u32, bits_per_sample: u16, channel_count: u16) -> Self {
        Self {
            sample_rate_hz,
            bits_per_sample,
            channel_count,
        }
    }

    /// Bytes per frame (one sample per channel)
    pub fn frame_bytes(&self) -> usize {
        (self.bits_per_sample as usize / 8) * self.channel_count as usize
    }
}

impl std::fmt::Display for AudioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Hz/{}-bit/{}ch",
            self.sample_rate_hz, self.bits_per_sample, self.channel_count
        )
    }
}

/// One control command, parsed from or encoded to the text wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    Config(AudioConfig),
    Vol(u8),
    Play,
    Pause,
    Next,
    Prev,
    Stop,
}

impl ControlMessage {
    /// Parse a raw control datagram.
    ///
    /// `VOL` levels are clamped into `[0, 100]` here so that no out-of-range
    /// value ever reaches the rest of the receiver.
    pub fn parse(raw: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(raw).map_err(|_| ProtocolError::NotUtf8)?;
        let text = text.trim().to_ascii_uppercase();

        match text.as_str() {
            "PLAY" => return Ok(Self::Play),
            "PAUSE" => return Ok(Self::Pause),
            "NEXT" => return Ok(Self::Next),
            "PREV" => return Ok(Self::Prev),
            "STOP" => return Ok(Self::Stop),
            _ => {}
        }

        if let Some(rest) = text.strip_prefix("CONFIG:") {
            let fields: Vec<&str> = rest.split(':').collect();
            if fields.len() != 3 {
                return Err(ProtocolError::Malformed(text.clone()));
            }
            let rate: u32 = fields[0]
                .parse()
                .map_err(|_| ProtocolError::InvalidField(text.clone()))?;
            let bits: u16 = fields[1]
                .parse()
                .map_err(|_| ProtocolError::InvalidField(text.clone()))?;
            let channels: u16 = fields[2]
                .parse()
                .map_err(|_| ProtocolError::InvalidField(text.clone()))?;
            return Ok(Self::Config(AudioConfig::new(rate, bits, channels)));
        }

        if let Some(rest) = text.strip_prefix("VOL:") {
            let level: i64 = rest
                .parse()
                .map_err(|_| ProtocolError::InvalidField(text.clone()))?;
            return Ok(Self::Vol(level.clamp(0, 100) as u8));
        }

        Err(ProtocolError::UnknownCommand(text))
    }

    /// Encode for transmission
    pub fn encode(&self) -> String {
        match self {
            Self::Config(c) => format!(
                "CONFIG:{}:{}:{}",
                c.sample_rate_hz, c.bits_per_sample, c.channel_count
            ),
            Self::Vol(level) => format!("VOL:{}", level),
            Self::Play => "PLAY".to_string(),
            Self::Pause => "PAUSE".to_string(),
            Self::Next => "NEXT".to_string(),
            Self::Prev => "PREV".to_string(),
            Self::Stop => "STOP".to_string(),
        }
    }
}
