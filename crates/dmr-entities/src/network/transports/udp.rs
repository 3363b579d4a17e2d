use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use super::{NetworkError, NetworkMessage, NetworkTransport, TransportFactory};

/// Largest datagram either peer sends, with headroom
const MAX_DATAGRAM: usize = 1500;

#[derive(Debug, Clone)]
pub struct UdpTransportConfig {
    pub bind_addr: SocketAddr,
    pub peer_addr: SocketAddr,
}

/// UDP transport talking to a single peer. Datagrams from other sources are dropped.
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    peer_addr: SocketAddr,
    bind_addr: SocketAddr,
    /// Datagrams read by wait_for but not handed out yet
    pending: VecDeque<NetworkMessage>,
}

impl UdpTransport {
    pub fn new(bind_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        Self { socket: None, peer_addr, bind_addr, pending: VecDeque::new() }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn ensure_connected(&mut self) -> Result<&UdpSocket, NetworkError> {
        if self.socket.is_none() {
            self.connect()?;
        }
        self.socket
            .as_ref()
            .ok_or_else(|| NetworkError::ConnectionFailed("No active socket".to_string()))
    }

    fn from_peer(&self, addr: &SocketAddr) -> bool {
        // A peer bound to 0.0.0.0 answers from whatever address routes back to us
        addr.port() == self.peer_addr.port() && (self.peer_addr.ip().is_unspecified() || addr.ip() == self.peer_addr.ip())
    }
}

impl TransportFactory for UdpTransport {
    type Config = UdpTransportConfig;

    fn create(config: Self::Config) -> Result<Self, NetworkError> {
        let mut transport = UdpTransport::new(config.bind_addr, config.peer_addr);
        transport.connect()?;
        Ok(transport)
    }
}

impl NetworkTransport for UdpTransport {
    fn connect(&mut self) -> Result<(), NetworkError> {
        self.socket = None;
        let socket =
            UdpSocket::bind(self.bind_addr).map_err(|e| NetworkError::ConnectionFailed(format!("UDP bind {} failed: {}", self.bind_addr, e)))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| NetworkError::ConnectionFailed(format!("Failed to set non-blocking: {}", e)))?;
        tracing::debug!("udp: bound {} for peer {}", self.bind_addr, self.peer_addr);
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), NetworkError> {
        let peer = self.peer_addr;
        let socket = self.ensure_connected()?;
        socket
            .send_to(payload, peer)
            .map_err(|e| NetworkError::SendFailed(format!("UDP send failed: {}", e)))?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<NetworkMessage>, NetworkError> {
        let mut received: Vec<NetworkMessage> = self.pending.drain(..).collect();
        let socket = self.ensure_connected()?;
        let mut buffer = [0u8; MAX_DATAGRAM];
        loop {
            match socket.recv_from(&mut buffer) {
                Ok((len, source)) => received.push(NetworkMessage { source, payload: buffer[..len].to_vec(), timestamp: Instant::now() }),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                // ICMP port unreachable from an earlier send, the peer is not up yet
                Err(e) if e.kind() == ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(NetworkError::ReceiveFailed(e.to_string())),
            }
        }

        received.retain(|m| {
            let ok = self.from_peer(&m.source);
            if !ok {
                tracing::debug!("udp: dropping datagram from unexpected source {}", m.source);
            }
            ok
        });
        Ok(received)
    }

    fn wait_for(&mut self, timeout: Duration) -> Result<NetworkMessage, NetworkError> {
        let deadline = Instant::now() + timeout;
        loop {
            let received = self.receive()?;
            self.pending.extend(received);
            if let Some(msg) = self.pending.pop_front() {
                return Ok(msg);
            }
            if Instant::now() >= deadline {
                return Err(NetworkError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_exchange() {
        let mut a = UdpTransport::new("127.0.0.1:0".parse().unwrap(), "127.0.0.1:9".parse().unwrap());
        a.connect().unwrap();
        let a_addr = a.local_addr().unwrap();

        let mut b = UdpTransport::create(UdpTransportConfig { bind_addr: "127.0.0.1:0".parse().unwrap(), peer_addr: a_addr }).unwrap();
        let b_addr = b.local_addr().unwrap();
        a.peer_addr = b_addr;

        b.send(b"DMRD").unwrap();
        let msg = a.wait_for(Duration::from_secs(2)).unwrap();
        assert_eq!(msg.payload, b"DMRD");
        assert_eq!(msg.source, b_addr);

        assert!(matches!(b.wait_for(Duration::from_millis(20)), Err(NetworkError::Timeout)));
    }
}
