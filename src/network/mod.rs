//! Network subsystem for UDP transport
//!
//! Two independent datagram channels: raw audio chunks and text control
//! commands, both sender→receiver, both fire-and-forget. The engine and the
//! receive loop talk to the channels through the traits below so tests can
//! substitute in-memory fakes for real sockets.

pub mod udp;

pub use udp::{create_socket, AudioRx, AudioTx, ControlRx, ControlTx};

use std::time::Duration;

use bytes::Bytes;

use crate::error::NetworkError;
use crate::protocol::ControlMessage;

/// Outbound control channel (sender side)
pub trait ControlLink {
    fn send(&self, message: &ControlMessage) -> Result<(), NetworkError>;
}

/// Outbound audio channel (sender side). Owned by the pacing worker.
pub trait AudioLink: Send + 'static {
    fn send(&self, chunk: &[u8]) -> Result<(), NetworkError>;
}

impl<T: AudioLink + Sync> AudioLink for std::sync::Arc<T> {
    fn send(&self, chunk: &[u8]) -> Result<(), NetworkError> {
        (**self).send(chunk)
    }
}

/// Inbound control channel (receiver side)
pub trait ControlPoll {
    /// Wait up to the configured timeout for one command. `Ok(None)` means
    /// the timeout elapsed or a malformed datagram was logged and discarded.
    fn poll(&mut self) -> Result<Option<ControlMessage>, NetworkError>;

    /// Change the poll timeout (long while waiting for CONFIG, short after)
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), NetworkError>;
}

/// Inbound audio channel (receiver side)
pub trait AudioPoll {
    /// Wait up to the configured timeout for one datagram of raw PCM.
    fn poll(&mut self) -> Result<Option<Bytes>, NetworkError>;
}
