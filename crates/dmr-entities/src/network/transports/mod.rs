use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub mod udp;

/// Datagram transport shared by the network gateway link and the modem link.
///
/// Both peers of this host speak connectionless UDP, so the transport has no
/// reliable channel. `connect` (re)binds the local socket.
pub trait NetworkTransport: Send {
    /// Connect or reconnect the transport. Destroys any existing socket.
    fn connect(&mut self) -> Result<(), NetworkError>;

    /// Send one datagram to the peer
    fn send(&mut self, payload: &[u8]) -> Result<(), NetworkError>;

    /// Drain all pending datagrams (non-blocking)
    fn receive(&mut self) -> Result<Vec<NetworkMessage>, NetworkError>;

    /// Wait for one datagram, at most `timeout`
    fn wait_for(&mut self, timeout: Duration) -> Result<NetworkMessage, NetworkError>;
}

/// Factory trait for creating transport instances
///
/// Lets the generic worker build its transport from configuration without
/// knowing the concrete type.
pub trait TransportFactory: NetworkTransport + Sized {
    type Config: Send + 'static;

    fn create(config: Self::Config) -> Result<Self, NetworkError>;
}

/// Datagram received from the peer
#[derive(Debug, Clone)]
pub struct NetworkMessage {
    pub source: SocketAddr,
    pub payload: Vec<u8>,
    pub timestamp: Instant,
}

#[derive(Debug, Clone)]
pub enum NetworkError {
    ConnectionFailed(String),
    SendFailed(String),
    ReceiveFailed(String),
    Timeout,
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            NetworkError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            NetworkError::ReceiveFailed(msg) => write!(f, "Receive failed: {}", msg),
            NetworkError::Timeout => write!(f, "Operation timed out"),
        }
    }
}

impl std::error::Error for NetworkError {}
