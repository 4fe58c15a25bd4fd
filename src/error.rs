//! Error types for the streaming application

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Track error: {0}")]
    Track(#[from] TrackError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Waveform source and playlist errors
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Track not found: {0}")]
    NotFound(String),

    #[error("Not a readable WAV file: {0}")]
    OpenFailed(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("No tracks found in {0}")]
    NoTracks(String),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
}

/// Control protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unknown command: '{0}'")]
    UnknownCommand(String),

    #[error("Malformed message: '{0}'")]
    Malformed(String),

    #[error("Invalid integer field in '{0}'")]
    InvalidField(String),

    #[error("Message is not valid UTF-8")]
    NotUtf8,
}

/// Hardware sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("No output device available: {0}")]
    DeviceNotFound(String),

    #[error("Failed to configure sink: {0}")]
    Configure(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Write before a successful configuration")]
    NotConfigured,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
