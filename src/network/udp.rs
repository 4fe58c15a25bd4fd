//! UDP socket plumbing
//!
//! Sockets are created through socket2 so the receive buffers are large
//! enough to ride out scheduling hiccups without dropping audio datagrams.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};

use crate::constants::{MAX_AUDIO_PACKET, MAX_CONTROL_PACKET};
use crate::error::NetworkError;
use crate::network::{AudioLink, AudioPoll, ControlLink, ControlPoll};
use crate::protocol::ControlMessage;

/// Socket receive buffer: enough for ~2 seconds of 48kHz stereo 16-bit audio
const RECV_BUFFER_BYTES: usize = 512 * 1024;

/// Create a UDP socket bound to `addr` with tuned buffers
pub fn create_socket(addr: SocketAddr) -> Result<UdpSocket, NetworkError> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    socket
        .set_recv_buffer_size(RECV_BUFFER_BYTES)
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    socket
        .bind(&addr.into())
        .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;
    Ok(socket.into())
}

fn bind_ephemeral() -> Result<UdpSocket, NetworkError> {
    use std::net::{IpAddr, Ipv4Addr};
    create_socket(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// Outbound control channel over UDP
pub struct ControlTx {
    socket: UdpSocket,
    target: SocketAddr,
}

impl ControlTx {
    pub fn new(target: SocketAddr) -> Result<Self, NetworkError> {
        Ok(Self {
            socket: bind_ephemeral()?,
            target,
        })
    }
}

impl ControlLink for ControlTx {
    fn send(&self, message: &ControlMessage) -> Result<(), NetworkError> {
        let encoded = message.encode();
        self.socket
            .send_to(encoded.as_bytes(), self.target)
            .map_err(|e| NetworkError::SendFailed(format!("{}: {}", self.target, e)))?;
        Ok(())
    }
}

/// Outbound audio channel over UDP
pub struct AudioTx {
    socket: UdpSocket,
    target: SocketAddr,
}

impl AudioTx {
    pub fn new(target: SocketAddr) -> Result<Self, NetworkError> {
        Ok(Self {
            socket: bind_ephemeral()?,
            target,
        })
    }
}

impl AudioLink for AudioTx {
    fn send(&self, chunk: &[u8]) -> Result<(), NetworkError> {
        if chunk.len() > MAX_AUDIO_PACKET {
            return Err(NetworkError::PacketTooLarge(chunk.len()));
        }
        self.socket
            .send_to(chunk, self.target)
            .map_err(|e| NetworkError::SendFailed(format!("{}: {}", self.target, e)))?;
        Ok(())
    }
}

/// Inbound control channel over UDP
pub struct ControlRx {
    socket: UdpSocket,
    buf: [u8; MAX_CONTROL_PACKET],
}

impl ControlRx {
    pub fn bind(addr: SocketAddr, timeout: Duration) -> Result<Self, NetworkError> {
        let socket = create_socket(addr)?;
        socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
        Ok(Self {
            socket,
            buf: [0u8; MAX_CONTROL_PACKET],
        })
    }
}

impl ControlPoll for ControlRx {
    fn poll(&mut self) -> Result<Option<ControlMessage>, NetworkError> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((len, from)) => match ControlMessage::parse(&self.buf[..len]) {
                Ok(message) => Ok(Some(message)),
                Err(e) => {
                    tracing::warn!("Discarding control datagram from {}: {}", from, e);
                    Ok(None)
                }
            },
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(NetworkError::ReceiveFailed(e.to_string())),
        }
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), NetworkError> {
        self.socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| NetworkError::ReceiveFailed(e.to_string()))
    }
}

/// Inbound audio channel over UDP
pub struct AudioRx {
    socket: UdpSocket,
    buf: [u8; MAX_AUDIO_PACKET],
}

impl AudioRx {
    pub fn bind(addr: SocketAddr, timeout: Duration) -> Result<Self, NetworkError> {
        let socket = create_socket(addr)?;
        socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
        Ok(Self {
            socket,
            buf: [0u8; MAX_AUDIO_PACKET],
        })
    }
}

impl AudioPoll for AudioRx {
    fn poll(&mut self) -> Result<Option<Bytes>, NetworkError> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((len, _)) => Ok(Some(Bytes::copy_from_slice(&self.buf[..len]))),
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(NetworkError::ReceiveFailed(e.to_string())),
        }
    }
}
