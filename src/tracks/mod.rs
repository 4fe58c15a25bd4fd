//! Track enumeration and waveform source

pub mod playlist;
pub mod source;

pub use playlist::Playlist;
pub use source::WaveSource;
