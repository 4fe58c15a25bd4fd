//! # Wavecast
//!
//! Gesture-driven low-latency audio streaming over LAN to a DAC-backed receiver.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            SENDER PC                             │
//! │  ┌──────────────┐      ┌───────────────────────────────────┐     │
//! │  │ Command      │      │  Stream Engine (sender::engine)   │     │
//! │  │ Source       │─────▶│  STOPPED / PLAYING / PAUSED       │     │
//! │  │ (gestures,   │      │  active track index, volume       │     │
//! │  │  console)    │      └──────┬──────────────────┬─────────┘     │
//! │  └──────────────┘             │                  │               │
//! │                               ▼                  ▼               │
//! │                    ┌──────────────────┐  ┌───────────────┐       │
//! │                    │ Pacing Worker    │  │ Control Link  │       │
//! │                    │ (sender::pacer)  │  │ CONFIG / VOL /│       │
//! │                    │ read→scale→send  │  │ PLAY / PAUSE /│       │
//! │                    │ →sleep per chunk │  │ NEXT/PREV/STOP│       │
//! │                    └────────┬─────────┘  └───────┬───────┘       │
//! └─────────────────────────────┼────────────────────┼───────────────┘
//!                    audio UDP  │                    │  control UDP
//!                               ▼                    ▼
//! ┌─────────────────────────────┼────────────────────┼───────────────┐
//! │                           RECEIVER                               │
//! │                    ┌────────────────────────────────────┐        │
//! │                    │  Receive Loop (receiver)           │        │
//! │                    │  wait CONFIG → poll ctrl + audio   │        │
//! │                    └───┬──────────────┬───────────┬─────┘        │
//! │                        ▼              ▼           ▼              │
//! │              ┌───────────────┐ ┌────────────┐ ┌──────────────┐   │
//! │              │ Audio Sink    │ │ Volume LEDs│ │ Display Mux  │   │
//! │              │ (audio::sink) │ │ (panel::   │ │ (panel::     │   │
//! │              │ raw PCM → DAC │ │  indicator)│ │  display)    │   │
//! │              └───────────────┘ └────────────┘ └──────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod command;
pub mod config;
pub mod error;
pub mod network;
pub mod panel;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod tracks;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default UDP port for raw audio chunks
    pub const DEFAULT_AUDIO_PORT: u16 = 12345;

    /// Default UDP port for control commands
    pub const DEFAULT_CONTROL_PORT: u16 = 12346;

    /// Nominal audio chunk size in frames
    pub const DEFAULT_CHUNK_FRAMES: usize = 256;

    /// Largest control datagram the receiver will accept
    pub const MAX_CONTROL_PACKET: usize = 128;

    /// Largest audio datagram the receiver will accept
    pub const MAX_AUDIO_PACKET: usize = 2048;

    /// How many times a CONFIG announcement is repeated
    pub const CONFIG_REPEAT_COUNT: usize = 3;

    /// Volume level applied before the first VOL command arrives
    pub const DEFAULT_VOLUME: u8 = 75;

    /// Budget for stopping the pacing worker before giving up on the join
    pub const PACER_STOP_TIMEOUT_MS: u64 = 500;

    /// Sleep used by a paused pacing worker between gate checks
    pub const PACER_IDLE_POLL_MS: u64 = 50;

    /// Receiver poll timeout per channel once configured
    pub const POLL_TIMEOUT_MS: u64 = 10;

    /// Receiver wait-for-CONFIG timeout between liveness logs
    pub const CONFIG_WAIT_TIMEOUT_SECS: u64 = 15;

    /// Window without audio after which the arrival timestamp resets
    pub const SILENCE_TIMEOUT_SECS: u64 = 5;

    /// Display scan rate in Hz (one digit per tick)
    pub const DISPLAY_REFRESH_HZ: u32 = 240;

    /// Minimum interval between updates of the displayed volume value
    pub const DISPLAY_UPDATE_INTERVAL_MS: u64 = 500;

    /// Number of digits on the 7-segment display
    pub const DISPLAY_DIGITS: usize = 4;

    /// Cooldown between accepted gesture commands of the same class
    pub const GESTURE_COOLDOWN_SECS: f32 = 1.5;
}
