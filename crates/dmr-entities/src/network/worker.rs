//! Network worker thread exchanging homebrew packets with the gateway over UDP

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use dmr_config::SharedConfig;
use dmr_config::dmr_config_network::CfgNetwork;
use dmr_pdus::DmrData;
use dmr_pdus::network::homebrew::HomebrewPacket;

use super::NetworkFrame;
use super::transports::udp::UdpTransportConfig;
use super::transports::{NetworkTransport, TransportFactory};

/// How long the worker blocks on its command channel before polling the socket
const POLL_INTERVAL: Duration = Duration::from_millis(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Events the worker sends to the DmrNetwork
#[derive(Debug)]
pub enum NetworkEvent {
    Connected,
    Disconnected(String),
    /// Call packet for a slot this network carries
    Data(DmrData),
}

/// Commands the DmrNetwork sends to the worker
#[derive(Debug)]
pub enum NetworkCommand {
    Send(NetworkFrame),
    Disconnect,
}

enum LoopExit {
    Shutdown,
    Failed(String),
}

pub struct NetworkWorker<T: TransportFactory> {
    config: SharedConfig,
    net_config: CfgNetwork,
    transport_config: T::Config,
    event_sender: Sender<NetworkEvent>,
    command_receiver: Receiver<NetworkCommand>,
}

impl<T> NetworkWorker<T>
where
    T: TransportFactory<Config = UdpTransportConfig>,
{
    pub fn new(config: SharedConfig, net_config: CfgNetwork, event_sender: Sender<NetworkEvent>, command_receiver: Receiver<NetworkCommand>) -> Self {
        let transport_config = UdpTransportConfig { bind_addr: net_config.local_address, peer_addr: net_config.gateway_address };
        Self { config, net_config, transport_config, event_sender, command_receiver }
    }

    /// Runs until the DmrNetwork asks for a disconnect or goes away
    pub fn run(&mut self) {
        tracing::info!(
            "NetworkWorker starting, gateway {} repeater id {}",
            self.net_config.gateway_address,
            self.net_config.repeater_id
        );

        loop {
            match self.connect_and_run() {
                LoopExit::Shutdown => break,
                LoopExit::Failed(e) => {
                    tracing::error!("NetworkWorker: {}", e);
                    self.config.state_write().network_connected = false;
                    let _ = self.event_sender.send(NetworkEvent::Disconnected(e));
                    tracing::info!("NetworkWorker: reconnecting in {:?}", RECONNECT_DELAY);

                    // Stay responsive to a shutdown while waiting
                    match self.command_receiver.recv_timeout(RECONNECT_DELAY) {
                        Ok(NetworkCommand::Disconnect) | Err(RecvTimeoutError::Disconnected) => break,
                        Ok(NetworkCommand::Send(_)) | Err(RecvTimeoutError::Timeout) => {}
                    }
                }
            }
        }

        self.config.state_write().network_connected = false;
        tracing::info!("NetworkWorker stopped");
    }

    fn connect_and_run(&mut self) -> LoopExit {
        let mut transport = match T::create(self.transport_config.clone()) {
            Ok(t) => t,
            Err(e) => return LoopExit::Failed(e.to_string()),
        };
        self.config.state_write().network_connected = true;
        let _ = self.event_sender.send(NetworkEvent::Connected);
        tracing::info!("NetworkWorker: bound {}, talking to {}", self.net_config.local_address, self.net_config.gateway_address);

        loop {
            match self.command_receiver.recv_timeout(POLL_INTERVAL) {
                Ok(NetworkCommand::Send(frame)) => {
                    if let Err(e) = self.send_frame(&mut transport, &frame) {
                        return LoopExit::Failed(e);
                    }
                    // Drain whatever else is queued before polling the socket
                    while let Ok(cmd) = self.command_receiver.try_recv() {
                        match cmd {
                            NetworkCommand::Send(frame) => {
                                if let Err(e) = self.send_frame(&mut transport, &frame) {
                                    return LoopExit::Failed(e);
                                }
                            }
                            NetworkCommand::Disconnect => return LoopExit::Shutdown,
                        }
                    }
                }
                Ok(NetworkCommand::Disconnect) => {
                    tracing::info!("NetworkWorker: disconnect requested");
                    return LoopExit::Shutdown;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("NetworkWorker: command channel closed");
                    return LoopExit::Shutdown;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            let messages = match transport.receive() {
                Ok(m) => m,
                Err(e) => return LoopExit::Failed(e.to_string()),
            };
            for msg in messages {
                self.handle_incoming(&msg.payload);
            }
        }
    }

    fn send_frame(&self, transport: &mut T, frame: &NetworkFrame) -> Result<(), String> {
        if !self.net_config.carries_slot(frame.slot_no()) {
            return Ok(());
        }
        let bytes = frame.to_bytes(self.net_config.repeater_id);
        if self.net_config.debug {
            tracing::debug!("-> net {:02X?}", bytes);
        }
        transport.send(&bytes).map_err(|e| e.to_string())
    }

    fn handle_incoming(&self, payload: &[u8]) {
        if self.net_config.debug {
            tracing::debug!("<- net {:02X?}", payload);
        }
        match HomebrewPacket::parse(payload) {
            Ok(HomebrewPacket::Data { data, repeater_id }) => {
                if !self.net_config.carries_slot(data.slot_no) {
                    tracing::trace!("NetworkWorker: dropping packet for slot {} from {}", data.slot_no, repeater_id);
                    return;
                }
                let _ = self.event_sender.send(NetworkEvent::Data(data));
            }
            Ok(HomebrewPacket::Other { magic }) => {
                tracing::trace!("NetworkWorker: ignoring {:?} packet", String::from_utf8_lossy(&magic));
            }
            Err(e) => tracing::warn!("NetworkWorker: undecodable packet: {:?}", e),
        }
    }
}
