//! Audio Receiver Application
//!
//! Binds the control and audio channels, waits for a session configuration,
//! then renders incoming PCM on the default output device while driving the
//! simulated status panel (4-digit volume display plus indicator LEDs).

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU16;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wavecast::{
    audio::CpalSink,
    config::ReceiverConfig,
    constants::DEFAULT_VOLUME,
    network::{AudioRx, ControlRx},
    panel::{DisplayCell, DisplayMuxHandle, SimPanel},
    receiver::Receiver,
};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wavecast Receiver");

    let config = ReceiverConfig::load()?;

    let control_addr = SocketAddr::new(config.bind_addr, config.control_port);
    let audio_addr = SocketAddr::new(config.bind_addr, config.audio_port);
    let control = ControlRx::bind(
        control_addr,
        Duration::from_secs(config.config_wait_timeout_secs),
    )?;
    let audio = AudioRx::bind(audio_addr, Duration::from_millis(config.poll_timeout_ms))?;
    tracing::info!("Listening for CONTROL on {}", control_addr);
    tracing::info!("Listening for AUDIO on {}", audio_addr);

    // The display scan runs on its own thread; the receive loop only stores
    // into the shared cell.
    let panel = Arc::new(SimPanel::new());
    let display: DisplayCell = Arc::new(AtomicU16::new(DEFAULT_VOLUME as u16));
    let _display_mux =
        DisplayMuxHandle::spawn(panel.clone(), display.clone(), config.display_refresh_hz)?;

    let sink = CpalSink::new();
    let mut receiver = Receiver::new(control, audio, sink, panel, display, config);
    receiver.run()?;
    Ok(())
}
