use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use dmr_config::SharedConfig;
use dmr_config::dmr_config_network::CfgNetwork;
use dmr_pdus::DmrData;

use super::NetworkFrame;
use super::transports::NetworkError;
use super::transports::udp::UdpTransport;
use super::worker::{NetworkCommand, NetworkEvent, NetworkWorker};

/// Engine side of the network link. The socket lives on a worker thread,
/// the engine exchanges frames with it through channels and never blocks.
pub struct DmrNetwork {
    event_receiver: Receiver<NetworkEvent>,
    command_sender: Sender<NetworkCommand>,
    connected: bool,
    worker_handle: Option<thread::JoinHandle<()>>,
}

impl DmrNetwork {
    pub fn new(config: SharedConfig, net_config: CfgNetwork) -> Result<Self, NetworkError> {
        let (event_sender, event_receiver) = unbounded::<NetworkEvent>();
        let (command_sender, command_receiver) = unbounded::<NetworkCommand>();

        let handle = thread::Builder::new()
            .name("dmr-network".to_string())
            .spawn(move || {
                let mut worker = NetworkWorker::<UdpTransport>::new(config, net_config, event_sender, command_receiver);
                worker.run();
            })
            .map_err(|e| NetworkError::ConnectionFailed(format!("failed to spawn network worker: {}", e)))?;

        Ok(Self { event_receiver, command_sender, connected: false, worker_handle: Some(handle) })
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn write(&self, frame: NetworkFrame) {
        if self.command_sender.send(NetworkCommand::Send(frame)).is_err() {
            tracing::warn!("DmrNetwork: worker gone, dropping frame");
        }
    }

    /// Next call packet from the network, None when nothing is pending
    pub fn read(&mut self) -> Option<DmrData> {
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                NetworkEvent::Connected => {
                    tracing::info!("DmrNetwork: connected");
                    self.connected = true;
                }
                NetworkEvent::Disconnected(reason) => {
                    tracing::warn!("DmrNetwork: disconnected: {}", reason);
                    self.connected = false;
                }
                NetworkEvent::Data(data) => return Some(data),
            }
        }
        None
    }
}

impl Drop for DmrNetwork {
    fn drop(&mut self) {
        tracing::info!("DmrNetwork: shutting down");
        let _ = self.command_sender.send(NetworkCommand::Disconnect);

        if let Some(handle) = self.worker_handle.take() {
            let timeout = Duration::from_secs(3);
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    tracing::info!("DmrNetwork: worker thread joined cleanly");
                    break;
                }
                if start.elapsed() >= timeout {
                    tracing::warn!("DmrNetwork: worker thread did not finish in time, abandoning");
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }
        }
    }
}
