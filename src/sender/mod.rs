//! Sender streaming engine

pub mod engine;
pub mod pacer;

pub use engine::{PlaybackState, StreamEngine};
pub use pacer::PacerHandle;
