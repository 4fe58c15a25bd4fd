//! Receiver reassembly and sink driver
//!
//! Two binding phases. Pre-configured: only the control channel is read
//! (long blocking polls) until the first CONFIG opens the sink — audio is
//! never written before that. Configured: both channels are polled with
//! short timeouts so neither starves the other; transport status gates
//! whether arriving audio reaches the sink, and the panel bookkeeping
//! (LED pattern, displayed volume) rides along in the same loop.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::audio::sink::AudioSink;
use crate::config::ReceiverConfig;
use crate::constants::DEFAULT_VOLUME;
use crate::error::Result;
use crate::network::{AudioPoll, ControlPoll};
use crate::panel::display::DisplayCell;
use crate::panel::driver::LedDriver;
use crate::panel::indicator::pattern_for;
use crate::protocol::ControlMessage;

/// Receiver-side transport classification, independent of the sink session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportStatus {
    Play,
    Pause,
    #[default]
    Stop,
}

pub struct Receiver<C, A, S, L>
where
    C: ControlPoll,
    A: AudioPoll,
    S: AudioSink,
    L: LedDriver,
{
    control: C,
    audio: A,
    sink: S,
    leds: L,
    display: DisplayCell,
    settings: ReceiverConfig,
    status: TransportStatus,
    volume: u8,
    last_display_update: Instant,
    last_audio_at: Instant,
}

impl<C, A, S, L> Receiver<C, A, S, L>
where
    C: ControlPoll,
    A: AudioPoll,
    S: AudioSink,
    L: LedDriver,
{
    pub fn new(
        control: C,
        audio: A,
        sink: S,
        leds: L,
        display: DisplayCell,
        settings: ReceiverConfig,
    ) -> Self {
        let now = Instant::now();
        display.store(DEFAULT_VOLUME as u16, Ordering::Relaxed);
        Self {
            control,
            audio,
            sink,
            leds,
            display,
            settings,
            status: TransportStatus::Stop,
            volume: DEFAULT_VOLUME,
            last_display_update: now,
            last_audio_at: now,
        }
    }

    /// Pre-configured phase: block on the control channel (with periodic
    /// liveness logging) until one CONFIG opens the sink. Configuration
    /// failures are logged and the wait continues; VOL updates are applied
    /// so the indicator is live before any audio session exists.
    pub fn wait_for_config(&mut self) -> Result<()> {
        self.control.set_timeout(Duration::from_secs(
            self.settings.config_wait_timeout_secs,
        ))?;
        tracing::info!("Waiting for initial CONFIG command...");

        loop {
            match self.control.poll()? {
                Some(ControlMessage::Config(config)) => {
                    match self.sink.configure(&config) {
                        Ok(()) => break,
                        Err(e) => {
                            tracing::warn!("Initial sink configuration failed: {}. Waiting again.", e);
                        }
                    }
                }
                Some(ControlMessage::Vol(level)) => {
                    self.volume = level;
                    self.leds.set_pattern(pattern_for(level));
                    tracing::info!("Volume set to {} (pre-config)", level);
                }
                Some(other) => {
                    tracing::debug!("Ignoring {:?} before configuration", other);
                }
                None => {
                    tracing::info!("Still waiting for initial CONFIG...");
                }
            }
        }

        self.control
            .set_timeout(Duration::from_millis(self.settings.poll_timeout_ms))?;
        Ok(())
    }

    /// One main-loop iteration at time `now`
    pub fn step(&mut self, now: Instant) -> Result<()> {
        let mut volume_changed = false;

        match self.control.poll()? {
            Some(ControlMessage::Config(config)) => match self.sink.configure(&config) {
                Ok(()) => tracing::info!("Sink reconfigured: {}", config),
                Err(e) => tracing::warn!("Sink reconfiguration failed: {}", e),
            },
            Some(ControlMessage::Vol(level)) => {
                if level != self.volume {
                    self.volume = level;
                    volume_changed = true;
                }
            }
            Some(ControlMessage::Play) => self.status = TransportStatus::Play,
            Some(ControlMessage::Pause) => self.status = TransportStatus::Pause,
            Some(ControlMessage::Stop) => self.status = TransportStatus::Stop,
            Some(other) => {
                tracing::debug!("Ignoring {:?}", other);
            }
            None => {}
        }

        // Displayed volume trails the received one by at most the update
        // interval, so a burst of VOL commands cannot flicker the digits.
        if now.duration_since(self.last_display_update)
            >= Duration::from_millis(self.settings.display_update_interval_ms)
        {
            self.display.store(self.volume as u16, Ordering::Relaxed);
            self.last_display_update = now;
        }

        if volume_changed {
            self.leds.set_pattern(pattern_for(self.volume));
        }

        if self.status == TransportStatus::Play && self.sink.is_configured() {
            match self.audio.poll()? {
                Some(chunk) => {
                    if let Err(e) = self.sink.write(&chunk) {
                        tracing::warn!("Sink write failed: {}", e);
                    }
                    self.last_audio_at = now;
                }
                None => {
                    // Soft, observational threshold: reset the tracker, take
                    // no transport action.
                    if now.duration_since(self.last_audio_at)
                        > Duration::from_secs(self.settings.silence_timeout_secs)
                    {
                        tracing::debug!(
                            "No audio for {}s while playing, resetting silence tracker",
                            self.settings.silence_timeout_secs
                        );
                        self.last_audio_at = now;
                    }
                }
            }
        }

        Ok(())
    }

    /// Bind the two phases together and run until a fatal channel error
    pub fn run(&mut self) -> Result<()> {
        self.wait_for_config()?;
        tracing::info!("Configured, entering main loop");

        loop {
            if let Err(e) = self.step(Instant::now()) {
                // Datagram sockets hand out transient errors; the loop keeps
                // its state and keeps polling, as the protocol has no way to
                // signal the peer anyway.
                tracing::warn!("Receive loop error: {}", e);
            }
        }
    }

    pub fn status(&self) -> TransportStatus {
        self.status
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[cfg(test)]
    fn last_audio_at(&self) -> Instant {
        self.last_audio_at
    }
}
