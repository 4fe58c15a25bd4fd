//! Audio subsystem module

pub mod scaler;
pub mod sink;

pub use scaler::scale_chunk;
pub use sink::{AudioSink, CpalSink};
