//! Audio Sender Application
//!
//! Streams WAV tracks from a local directory to the receiver over UDP,
//! driven by transport commands. The gesture front-end is an external
//! collaborator; this binary reads the same commands from the console.

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver};
use std::io::BufRead;
use std::net::SocketAddr;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wavecast::{
    command::{CommandSource, TransportCommand},
    config::SenderConfig,
    network::{AudioTx, ControlTx},
    sender::StreamEngine,
    tracks::Playlist,
};

/// Console-backed command source: one command per line on stdin
struct ConsoleSource {
    rx: Receiver<TransportCommand>,
}

impl ConsoleSource {
    fn spawn() -> Self {
        let (tx, rx) = unbounded();
        thread::Builder::new()
            .name("console-input".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(_) => break,
                    };
                    match parse_line(&line) {
                        Some(command) => {
                            if tx.send(command).is_err() {
                                break;
                            }
                        }
                        None => {
                            if !line.trim().is_empty() {
                                println!("Commands: play | pause | next | prev | stop | vol <0-100>");
                            }
                        }
                    }
                }
            })
            .expect("spawn console reader");
        Self { rx }
    }
}

impl CommandSource for ConsoleSource {
    fn poll(&mut self) -> Option<TransportCommand> {
        self.rx.try_recv().ok()
    }
}

fn parse_line(line: &str) -> Option<TransportCommand> {
    let line = line.trim().to_ascii_lowercase();
    match line.as_str() {
        "play" => return Some(TransportCommand::Play),
        "pause" => return Some(TransportCommand::Pause),
        "next" => return Some(TransportCommand::Next),
        "prev" => return Some(TransportCommand::Prev),
        "stop" => return Some(TransportCommand::StopFull),
        _ => {}
    }
    let level: u8 = line.strip_prefix("vol ")?.trim().parse().ok()?;
    Some(TransportCommand::Volume(level.min(100)))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wavecast Sender");

    let mut config = SenderConfig::load()?;
    if let Some(addr) = std::env::args().nth(1) {
        config.receiver_addr = addr.parse()?;
    }
    if let Some(dir) = std::env::args().nth(2) {
        config.tracks_dir = dir.into();
    }

    // No tracks is a fatal startup condition.
    let playlist = Playlist::scan(&config.tracks_dir)?;

    let control_addr = SocketAddr::new(config.receiver_addr, config.control_port);
    let audio_addr = SocketAddr::new(config.receiver_addr, config.audio_port);
    tracing::info!("Streaming audio to {}", audio_addr);
    tracing::info!("Sending control commands to {}", control_addr);

    let control = ControlTx::new(control_addr)?;
    let audio = AudioTx::new(audio_addr)?;
    let mut engine = StreamEngine::new(
        playlist,
        control,
        audio,
        config.initial_volume,
        config.chunk_frames,
    );
    engine.announce_volume();

    println!("Commands: play | pause | next | prev | stop | vol <0-100>");
    let mut source = ConsoleSource::spawn();

    loop {
        if let Some(command) = source.poll() {
            engine.handle_command(command);
        }
        engine.reap_finished();
        thread::sleep(Duration::from_millis(50));
    }
}
