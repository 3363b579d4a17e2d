use std::time::Duration;

use dmr_config::SharedConfig;
use dmr_config::dmr_config_modem::CfgModem;
use dmr_core::SlotNo;
use dmr_core::defines::MODEM_BURST_LEN;
use dmr_pdus::{MmdvmCommand, MmdvmFrame};

use super::ModemEvent;
use crate::network::transports::udp::{UdpTransport, UdpTransportConfig};
use crate::network::transports::{NetworkError, NetworkTransport, TransportFactory};

const VERSION_TIMEOUT: Duration = Duration::from_millis(1500);
const VERSION_RETRIES: usize = 6;

/// Status reply layout: modes, state, flags, D-Star space, DMR space 1, DMR space 2
const STATUS_FLAGS: usize = 2;
const STATUS_DMR_SPACE1: usize = 4;
const STATUS_DMR_SPACE2: usize = 5;

/// MMDVM modem reached over UDP. Synchronous, the engine loop polls it.
pub struct UdpModem {
    config: SharedConfig,
    transport: UdpTransport,
    trace: bool,
    /// Free burst buffers per slot, as last reported and decremented per write
    dmr_space: [u8; 2],
    tx: bool,
}

impl UdpModem {
    pub fn new(config: SharedConfig, modem_config: &CfgModem) -> Result<Self, NetworkError> {
        let transport =
            UdpTransport::create(UdpTransportConfig { bind_addr: modem_config.local_address, peer_addr: modem_config.modem_address })?;
        Ok(Self { config, transport, trace: modem_config.trace, dmr_space: [0; 2], tx: false })
    }

    /// Asks for the firmware version until the modem answers
    pub fn open(&mut self) -> Result<ModemEvent, NetworkError> {
        for attempt in 1..=VERSION_RETRIES {
            self.write_frame(&MmdvmFrame::new(MmdvmCommand::GetVersion, &[]))?;
            match self.transport.wait_for(VERSION_TIMEOUT) {
                Ok(msg) => {
                    let mut offset = 0;
                    while let Ok((frame, used)) = MmdvmFrame::from_bytes(&msg.payload[offset..]) {
                        offset += used;
                        if let Some(version @ ModemEvent::Version { .. }) = self.handle_frame(frame) {
                            self.config.state_write().modem_connected = true;
                            return Ok(version);
                        }
                    }
                }
                Err(NetworkError::Timeout) => tracing::warn!("modem: no version reply, attempt {}/{}", attempt, VERSION_RETRIES),
                Err(e) => return Err(e),
            }
        }
        Err(NetworkError::Timeout)
    }

    /// Drains the socket and decodes every frame received
    pub fn read(&mut self) -> Result<Vec<ModemEvent>, NetworkError> {
        let mut events = Vec::new();
        for msg in self.transport.receive()? {
            let mut offset = 0;
            while offset < msg.payload.len() {
                match MmdvmFrame::from_bytes(&msg.payload[offset..]) {
                    Ok((frame, used)) => {
                        offset += used;
                        if let Some(event) = self.handle_frame(frame) {
                            events.push(event);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("modem: bad frame {:?} in {:02X?}", e, &msg.payload[offset..]);
                        break;
                    }
                }
            }
        }
        Ok(events)
    }

    fn handle_frame(&mut self, frame: MmdvmFrame) -> Option<ModemEvent> {
        if self.trace {
            tracing::trace!("<- modem {} {:02X?}", frame, frame.payload);
        }
        match frame.command {
            MmdvmCommand::DmrData1 | MmdvmCommand::DmrData2 | MmdvmCommand::DmrLost1 | MmdvmCommand::DmrLost2 => {
                match frame.to_dmr_burst() {
                    Ok((slot_no, burst)) => Some(ModemEvent::Burst { slot_no, burst }),
                    Err(e) => {
                        tracing::warn!("modem: bad burst frame: {:?}", e);
                        None
                    }
                }
            }
            MmdvmCommand::GetStatus => {
                let p = &frame.payload;
                if p.len() <= STATUS_DMR_SPACE2 {
                    tracing::warn!("modem: short status reply, {} bytes", p.len());
                    return None;
                }
                self.tx = p[STATUS_FLAGS] & 0x01 != 0;
                self.dmr_space = [p[STATUS_DMR_SPACE1], p[STATUS_DMR_SPACE2]];
                Some(ModemEvent::Status { tx: self.tx, dmr_space1: self.dmr_space[0], dmr_space2: self.dmr_space[1] })
            }
            MmdvmCommand::GetVersion => {
                let protocol = frame.payload.first().copied().unwrap_or(0);
                let description = String::from_utf8_lossy(frame.payload.get(1..).unwrap_or(&[])).trim_end_matches('\0').to_string();
                tracing::info!("modem: protocol {}, {}", protocol, description);
                Some(ModemEvent::Version { protocol, description })
            }
            MmdvmCommand::Ack => Some(ModemEvent::Ack { command: frame.payload.first().copied().unwrap_or(0) }),
            MmdvmCommand::Nak => {
                let command = frame.payload.first().copied().unwrap_or(0);
                let reason = frame.payload.get(1).copied().unwrap_or(0);
                tracing::warn!("modem: NAK for command 0x{:02X}, reason {}", command, reason);
                Some(ModemEvent::Nak { command, reason })
            }
            other => {
                tracing::debug!("modem: unexpected frame {}", other);
                None
            }
        }
    }

    fn write_frame(&mut self, frame: &MmdvmFrame) -> Result<(), NetworkError> {
        if self.trace {
            tracing::trace!("-> modem {} {:02X?}", frame, frame.payload);
        }
        self.transport.send(&frame.to_bytes())
    }

    pub fn poll_status(&mut self) -> Result<(), NetworkError> {
        self.write_frame(&MmdvmFrame::new(MmdvmCommand::GetStatus, &[]))
    }

    /// True if the modem reported room for another burst on this slot
    pub fn has_space(&self, slot_no: SlotNo) -> bool {
        match slot_no {
            1 | 2 => self.dmr_space[slot_no as usize - 1] > 0,
            _ => false,
        }
    }

    pub fn is_tx(&self) -> bool {
        self.tx
    }

    pub fn write_burst(&mut self, slot_no: SlotNo, burst: &[u8; MODEM_BURST_LEN]) -> Result<(), NetworkError> {
        let frame = MmdvmFrame::from_dmr_burst(slot_no, burst).map_err(|e| NetworkError::SendFailed(format!("{:?}", e)))?;
        self.write_frame(&frame)?;
        if let Some(space) = (slot_no as usize).checked_sub(1).and_then(|i| self.dmr_space.get_mut(i)) {
            *space = space.saturating_sub(1);
        }
        Ok(())
    }

    pub fn write_short_lc(&mut self, lc: &[u8; 9]) -> Result<(), NetworkError> {
        self.write_frame(&MmdvmFrame::short_lc(lc))
    }

    /// Keys or unkeys the duplex transmitter
    pub fn write_start(&mut self, tx: bool) -> Result<(), NetworkError> {
        self.write_frame(&MmdvmFrame::start(tx))
    }

    pub fn write_abort(&mut self, slot_no: SlotNo) -> Result<(), NetworkError> {
        self.write_frame(&MmdvmFrame::abort(slot_no))
    }
}

impl Drop for UdpModem {
    fn drop(&mut self) {
        self.config.state_write().modem_connected = false;
    }
}

#[cfg(test)]
mod tests {
    use dmr_core::debug;
    use dmr_core::defines::{DMR_IDLE_DATA, Tag};

    use super::*;

    /// Fake modem on loopback plus a UdpModem pointed at it
    fn pair() -> (UdpTransport, UdpModem) {
        let mut fake = UdpTransport::new("127.0.0.1:0".parse().unwrap(), "127.0.0.1:9".parse().unwrap());
        fake.connect().unwrap();
        let fake_addr = fake.local_addr().unwrap();

        let cfg = CfgModem {
            local_address: "127.0.0.1:0".parse().unwrap(),
            modem_address: fake_addr,
            rssi: false,
            rssi_mapping: Vec::new(),
            trace: true,
        };
        let modem = UdpModem::new(SharedConfig::new(2345678, 1), &cfg).unwrap();
        let modem_addr = modem.transport.local_addr().unwrap();
        let fake = UdpTransport::new(fake_addr, modem_addr);
        (fake, modem)
    }

    fn read_events(modem: &mut UdpModem) -> Vec<ModemEvent> {
        for _ in 0..200 {
            let events = modem.read().unwrap();
            if !events.is_empty() {
                return events;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Vec::new()
    }

    #[test]
    fn test_status_and_bursts() {
        debug::setup_logging_verbose();
        // The original fake socket is dropped inside pair(), rebind on the same address
        let (mut fake, mut modem) = pair();
        fake.connect().unwrap();

        let mut datagram = MmdvmFrame::new(MmdvmCommand::GetStatus, &[0x02, 0x02, 0x01, 0x00, 10, 3]).to_bytes();
        let mut burst = vec![0x41];
        burst.extend_from_slice(&DMR_IDLE_DATA);
        datagram.extend(MmdvmFrame::new(MmdvmCommand::DmrData2, &burst).to_bytes());
        datagram.extend(MmdvmFrame::new(MmdvmCommand::DmrLost1, &[]).to_bytes());
        fake.send(&datagram).unwrap();

        let events = read_events(&mut modem);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ModemEvent::Status { tx: true, dmr_space1: 10, dmr_space2: 3 });
        match &events[1] {
            ModemEvent::Burst { slot_no, burst } => {
                assert_eq!(*slot_no, 2);
                assert_eq!(burst[0], Tag::Data.into_raw() as u8);
                assert_eq!(burst[1], 0x41);
                assert_eq!(&burst[2..], &DMR_IDLE_DATA);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(events[2], ModemEvent::Burst { slot_no: 1, burst: vec![Tag::Lost.into_raw() as u8] });
        assert!(modem.has_space(1) && modem.has_space(2));
        assert!(!modem.has_space(3));
    }

    #[test]
    fn test_write_burst_uses_space() {
        let (mut fake, mut modem) = pair();
        fake.connect().unwrap();
        modem.dmr_space = [1, 0];

        let mut burst = [0u8; MODEM_BURST_LEN];
        burst[0] = Tag::Data.into_raw() as u8;
        burst[1] = 0x41;
        modem.write_burst(1, &burst).unwrap();
        assert!(!modem.has_space(1));

        let msg = fake.wait_for(Duration::from_secs(2)).unwrap();
        let (frame, used) = MmdvmFrame::from_bytes(&msg.payload).unwrap();
        assert_eq!(used, msg.payload.len());
        assert_eq!(frame.command, MmdvmCommand::DmrData1);
        assert_eq!(frame.payload.len(), MODEM_BURST_LEN - 1);
    }
}
