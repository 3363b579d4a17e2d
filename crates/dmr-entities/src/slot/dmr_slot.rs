use std::collections::VecDeque;
use std::sync::Arc;

use dmr_config::DmrConfig;
use dmr_core::defines::*;
use dmr_core::{SlotNo, Timer};
use dmr_fec::{ambe_fec, bptc19696, trellis};
use dmr_pdus::burst::emb::Emb;
use dmr_pdus::burst::short_lc::{ActivityType, SlotActivity};
use dmr_pdus::burst::slot_type::SlotType;
use dmr_pdus::burst::sync::{add_audio_sync, add_data_sync};
use dmr_pdus::lc::gps::GpsInfo;
use dmr_pdus::lc::talker_alias::TalkerAlias;
use dmr_pdus::{Csbk, CsbkBody, Csbko, DataHeader, DmrData, EmbeddedData, FullLc, Lc};

use crate::access_control::{AccessControl, SlotRewriteState};
use crate::lookup::IdLookup;
use crate::network::NetworkFrame;
use crate::rssi::RssiMapper;
use crate::slot::components::call_stats::{BerCounter, RssiStats};
use crate::slot::components::slot_queue::SlotQueue;

/// Header copies queued towards the modem by a duplex repeater
const NO_HEADERS_DUPLEX: usize = 3;
/// Network headers queued for a simplex hotspot, giving the radios time to wake up
const NO_HEADERS_SIMPLEX: usize = 8;
/// Terminator copies covering the hang time (480 ms)
const NO_TERMINATORS: usize = 8;

const NET_WATCHDOG_MS: u32 = 1500;
const PACKET_TIMER_MS: u32 = 300;
/// Frames the network may fall behind the wall clock before silence is inserted
const MAX_FRAMES_BEHIND: u32 = 3;
/// Voice bursts per second
const FRAMES_PER_SEC: f32 = 16.667;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfState {
    Listening,
    LateEntry,
    Audio,
    Data,
    /// Access was refused, the rest of the transmission is ignored
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetState {
    Idle,
    Audio,
    Data,
}

/// One DMR timeslot: the RF leg regenerates and forwards bursts from the modem,
/// the network leg turns network packets into bursts for the modem. Both share
/// one output queue, every write is gated on the other leg being idle.
pub struct DmrSlot {
    slot_no: SlotNo,
    config: Arc<DmrConfig>,
    access: AccessControl,
    rewrite: SlotRewriteState,
    lookup: Arc<dyn IdLookup>,
    rssi_mapper: RssiMapper,

    color_code: u8,
    duplex: bool,
    embedded_lc_only: bool,
    dump_talker_alias: bool,
    jitter_slots: usize,
    /// Idle burst with our colour code
    idle: [u8; DMR_FRAME_LENGTH_BYTES],

    queue: SlotQueue,
    net_out: VecDeque<NetworkFrame>,
    activity: SlotActivity,
    activity_changed: bool,

    // RF leg
    rf_state: RfState,
    rf_lc: Option<Lc>,
    /// Standby LC, re-emitted when no complete embedded data is available
    rf_embedded_lc: EmbeddedData,
    rf_embedded_data: [EmbeddedData; 2],
    rf_embedded_read_n: usize,
    rf_embedded_write_n: usize,
    rf_talker_alias: TalkerAlias,
    rf_n: u8,
    rf_seq_no: u8,
    rf_stream_id: u32,
    rf_frames: u32,
    rf_data_frames: u8,
    rf_ber: BerCounter,
    rf_timeout_timer: Timer,
    rf_timed_out: bool,
    rssi: i32,
    rssi_stats: RssiStats,

    // Network leg
    net_state: NetState,
    net_lc: Option<Lc>,
    net_embedded_lc: EmbeddedData,
    net_embedded_data: [EmbeddedData; 2],
    net_embedded_read_n: usize,
    net_embedded_write_n: usize,
    net_talker_alias: TalkerAlias,
    net_n: u8,
    net_frames: u32,
    net_lost: u32,
    net_data_frames: u8,
    net_ber: BerCounter,
    net_timeout_timer: Timer,
    net_timed_out: bool,
    net_watchdog: Timer,
    packet_timer: Timer,
    /// ms since the network call started
    net_elapsed_ms: u32,
    last_frame: [u8; DMR_FRAME_LENGTH_BYTES],
    last_frame_valid: bool,
}

impl DmrSlot {
    pub fn new(slot_no: SlotNo, config: Arc<DmrConfig>, lookup: Arc<dyn IdLookup>) -> Self {
        let dmr = &config.dmr;
        let mut idle = DMR_IDLE_DATA;
        SlotType::new(dmr.color_code, DataType::Idle).encode(&mut idle);

        let jitter_slots = config.network.as_ref().map_or(0, |n| (n.jitter_ms / DMR_SLOT_TIME) as usize);
        let rssi_mapper = match &config.modem {
            Some(modem) if modem.rssi => RssiMapper::new(&modem.rssi_mapping),
            _ => RssiMapper::default(),
        };

        Self {
            slot_no,
            access: AccessControl::new(Arc::clone(&config)),
            rewrite: SlotRewriteState::default(),
            lookup,
            rssi_mapper,
            color_code: dmr.color_code,
            duplex: dmr.duplex,
            embedded_lc_only: dmr.embedded_lc_only,
            dump_talker_alias: dmr.dump_talker_alias,
            jitter_slots,
            idle,
            queue: SlotQueue::new(slot_no),
            net_out: VecDeque::new(),
            activity: SlotActivity::default(),
            activity_changed: false,

            rf_state: RfState::Listening,
            rf_lc: None,
            rf_embedded_lc: EmbeddedData::new(),
            rf_embedded_data: [EmbeddedData::new(), EmbeddedData::new()],
            rf_embedded_read_n: 0,
            rf_embedded_write_n: 1,
            rf_talker_alias: TalkerAlias::new(),
            rf_n: 0,
            rf_seq_no: 0,
            rf_stream_id: 0,
            rf_frames: 0,
            rf_data_frames: 0,
            rf_ber: BerCounter::default(),
            rf_timeout_timer: Timer::new(dmr.timeout_secs, 0),
            rf_timed_out: false,
            rssi: 0,
            rssi_stats: RssiStats::default(),

            net_state: NetState::Idle,
            net_lc: None,
            net_embedded_lc: EmbeddedData::new(),
            net_embedded_data: [EmbeddedData::new(), EmbeddedData::new()],
            net_embedded_read_n: 0,
            net_embedded_write_n: 1,
            net_talker_alias: TalkerAlias::new(),
            net_n: 5,
            net_frames: 0,
            net_lost: 0,
            net_data_frames: 0,
            net_ber: BerCounter::default(),
            net_timeout_timer: Timer::new(dmr.timeout_secs, 0),
            net_timed_out: false,
            net_watchdog: Timer::new(0, NET_WATCHDOG_MS),
            packet_timer: Timer::new(0, PACKET_TIMER_MS),
            net_elapsed_ms: 0,
            last_frame: [0; DMR_FRAME_LENGTH_BYTES],
            last_frame_valid: false,

            config,
        }
    }

    pub fn slot_no(&self) -> SlotNo {
        self.slot_no
    }

    pub fn rf_state(&self) -> RfState {
        self.rf_state
    }

    pub fn net_state(&self) -> NetState {
        self.net_state
    }

    pub fn rf_lc(&self) -> Option<&Lc> {
        self.rf_lc.as_ref()
    }

    pub fn net_lc(&self) -> Option<&Lc> {
        self.net_lc.as_ref()
    }

    /// Filler bursts inserted into the current network call
    pub fn net_lost(&self) -> u32 {
        self.net_lost
    }

    pub fn activity(&self) -> SlotActivity {
        self.activity
    }

    /// Returns the activity once after each change
    pub fn take_activity_change(&mut self) -> Option<SlotActivity> {
        std::mem::take(&mut self.activity_changed).then_some(self.activity)
    }

    /// Next burst for the modem, [tag, flags, 33 bytes]
    pub fn read_modem(&mut self) -> Option<[u8; MODEM_BURST_LEN]> {
        self.queue.pop()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn read_network(&mut self) -> Option<NetworkFrame> {
        self.net_out.pop_front()
    }

    /// Feeds one burst from the modem: [tag, flags, 33 bytes, (rssi hi, rssi lo)].
    /// Returns true when the burst was taken into a call.
    pub fn write_modem(&mut self, data: &[u8]) -> bool {
        let Some(&tag) = data.first() else {
            return false;
        };

        if tag == Tag::Lost.into_raw() as u8 {
            self.rf_lost();
            return false;
        }

        if data.len() < MODEM_BURST_LEN {
            tracing::warn!(slot = self.slot_no, "short burst from the modem, {} bytes", data.len());
            return false;
        }

        let flags = data[1];
        if flags & DMR_IDLE_RX != 0 {
            return false;
        }
        let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
        burst.copy_from_slice(&data[2..MODEM_BURST_LEN]);

        if data.len() >= MODEM_BURST_LEN_RSSI {
            let raw = u16::from_be_bytes([data[MODEM_BURST_LEN], data[MODEM_BURST_LEN + 1]]);
            self.update_rssi(raw);
        }

        if flags & DMR_SYNC_DATA != 0 {
            let Ok(data_type) = DataType::try_from((flags & DT_MASK) as u64) else {
                tracing::warn!(slot = self.slot_no, "unknown data type 0x{:02X} from the modem", flags & DT_MASK);
                return false;
            };
            tracing::trace!(slot = self.slot_no, "<- RF {} {:02X?}", data_type, burst);

            if self.rf_state == RfState::Rejected {
                if data_type == DataType::TerminatorWithLc {
                    self.rf_state = RfState::Listening;
                }
                return false;
            }

            match data_type {
                DataType::VoiceLcHeader => self.rf_voice_header(burst),
                DataType::VoicePiHeader => self.rf_pi_header(burst),
                DataType::TerminatorWithLc => self.rf_terminator(burst),
                DataType::DataHeader => self.rf_data_header(burst),
                DataType::Csbk => self.rf_csbk(burst),
                DataType::Rate12Data | DataType::Rate34Data | DataType::Rate1Data => self.rf_data_block(burst, data_type),
                DataType::Idle => false,
                other => {
                    tracing::warn!(slot = self.slot_no, "unhandled RF data type {}", other);
                    false
                }
            }
        } else if flags & DMR_SYNC_AUDIO != 0 {
            tracing::trace!(slot = self.slot_no, "<- RF voice sync {:02X?}", burst);
            self.rf_voice_sync(burst)
        } else {
            tracing::trace!(slot = self.slot_no, "<- RF voice n={} {:02X?}", flags & 0x0F, burst);
            self.rf_voice(burst, flags & 0x0F)
        }
    }

    fn rf_lost(&mut self) {
        match self.rf_state {
            RfState::Audio => {
                if let Some(lc) = self.rf_lc {
                    tracing::info!(
                        slot = self.slot_no,
                        "RF voice transmission lost from {} to {}, {:.1} seconds, BER: {:.1}%{}",
                        self.lookup.find(lc.src_id),
                        self.describe_dst(&lc),
                        self.rf_frames as f32 / FRAMES_PER_SEC,
                        self.rf_ber.percent(),
                        self.rssi_suffix()
                    );
                }
                self.write_end_rf(true);
            }
            RfState::Data => {
                tracing::info!(slot = self.slot_no, "RF data transmission lost");
                self.write_end_rf(false);
            }
            RfState::LateEntry | RfState::Rejected => self.rf_state = RfState::Listening,
            RfState::Listening => {}
        }
    }

    fn rf_voice_header(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.rf_state == RfState::Audio {
            return true;
        }

        let Some(lc) = FullLc::decode(&burst, DataType::VoiceLcHeader) else {
            tracing::debug!(slot = self.slot_no, "unable to decode the RF voice header");
            return false;
        };
        let Some(lc) = self.admit_rf_call(lc) else {
            return false;
        };

        FullLc::encode(&lc, DataType::VoiceLcHeader, &mut burst);
        SlotType::new(self.color_code, DataType::VoiceLcHeader).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        self.start_rf_call(lc);

        if self.duplex {
            for _ in 0..NO_HEADERS_DUPLEX {
                self.write_queue_rf(Tag::Data, &burst);
            }
        }
        self.write_network_rf(&burst, DataType::VoiceLcHeader, lc.flco, lc.src_id, lc.dst_id, 0);

        self.rf_state = RfState::Audio;
        if self.net_state == NetState::Idle {
            self.set_activity(ActivityType::Voice, lc.flco, lc.dst_id);
        }
        tracing::info!(
            slot = self.slot_no,
            "received RF voice header from {} to {}",
            self.lookup.find(lc.src_id),
            self.describe_dst(&lc)
        );
        true
    }

    /// Access control, talkgroup rewrite and OVCM policy for a new RF call
    fn admit_rf_call(&mut self, mut lc: Lc) -> Option<Lc> {
        if !self.access.validate_src_id(lc.src_id) {
            tracing::info!(slot = self.slot_no, "RF user {} rejected", lc.src_id);
            self.rf_state = RfState::Rejected;
            return None;
        }
        if lc.is_group() && !self.access.validate_destination(lc.dst_id, self.slot_no, false) {
            tracing::info!(slot = self.slot_no, "RF user {} rejected for using TG {}", lc.src_id, lc.dst_id);
            self.rf_state = RfState::Rejected;
            return None;
        }

        let mut flco = lc.flco;
        let rewritten = self.access.rewrite_destination(lc.dst_id, lc.src_id, self.slot_no, false, &mut flco, &mut self.rewrite);
        if rewritten != 0 {
            lc.dst_id = rewritten;
        }
        lc.flco = flco;

        let ovcm = self.config.dmr.ovcm;
        if ovcm.set_on_rf() {
            lc.set_ovcm(true);
        } else if ovcm.clear_on_rf() {
            lc.set_ovcm(false);
        }
        Some(lc)
    }

    fn start_rf_call(&mut self, lc: Lc) {
        self.rf_lc = Some(lc);
        self.rf_embedded_lc.set_lc(&lc);
        self.rf_embedded_data[0].set_lc(&lc);
        self.rf_embedded_data[1].set_lc(&lc);
        self.rf_embedded_read_n = 0;
        self.rf_embedded_write_n = 1;
        self.rf_talker_alias.reset();

        self.rf_timeout_timer.start();
        self.rf_timed_out = false;
        self.rf_frames = 0;
        self.rf_seq_no = 0;
        self.rf_n = 0;
        self.rf_ber.reset();
        self.rf_stream_id = rand::random();

        self.rssi_stats.reset();
        if self.rssi != 0 {
            self.rssi_stats.add(self.rssi);
        }
    }

    fn rf_pi_header(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.rf_state != RfState::Audio {
            return false;
        }
        let Some(lc) = self.rf_lc else {
            return false;
        };

        if FullLc::decode_pi_header(&burst).is_none() {
            tracing::debug!(slot = self.slot_no, "RF PI header failed its checks, passing it on");
        }
        SlotType::new(self.color_code, DataType::VoicePiHeader).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        if self.duplex {
            self.write_queue_rf(Tag::Data, &burst);
        }
        self.write_network_rf(&burst, DataType::VoicePiHeader, lc.flco, lc.src_id, lc.dst_id, 0);
        tracing::debug!(slot = self.slot_no, "received RF PI header");
        true
    }

    fn rf_terminator(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.rf_state != RfState::Audio {
            return false;
        }
        let Some(lc) = self.rf_lc else {
            return false;
        };

        FullLc::encode(&lc, DataType::TerminatorWithLc, &mut burst);
        SlotType::new(self.color_code, DataType::TerminatorWithLc).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        if !self.rf_timed_out {
            self.write_network_rf(&burst, DataType::TerminatorWithLc, lc.flco, lc.src_id, lc.dst_id, 0);
            if self.duplex {
                for _ in 0..NO_TERMINATORS {
                    self.write_queue_rf(Tag::Eot, &burst);
                }
            }
        }

        tracing::info!(
            slot = self.slot_no,
            "received RF end of voice transmission from {} to {}, {:.1} seconds, BER: {:.1}%{}",
            self.lookup.find(lc.src_id),
            self.describe_dst(&lc),
            self.rf_frames as f32 / FRAMES_PER_SEC,
            self.rf_ber.percent(),
            self.rssi_suffix()
        );

        self.write_end_rf(false);
        true
    }

    fn rf_data_header(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.rf_state == RfState::Data {
            return true;
        }

        let Some(header) = DataHeader::decode(&burst) else {
            tracing::debug!(slot = self.slot_no, "unable to decode the RF data header");
            return false;
        };
        let flco = if header.group { Flco::Group } else { Flco::UserUser };
        let (src_id, dst_id) = (header.src_id, header.dst_id);

        if !self.access.validate_src_id(src_id) {
            tracing::info!(slot = self.slot_no, "RF user {} rejected", src_id);
            self.rf_state = RfState::Rejected;
            return false;
        }
        if header.group && !self.access.validate_destination(dst_id, self.slot_no, false) {
            tracing::info!(slot = self.slot_no, "RF user {} rejected for using TG {}", src_id, dst_id);
            self.rf_state = RfState::Rejected;
            return false;
        }

        self.rf_data_frames = header.blocks();
        self.rf_lc = Some(Lc::new(flco, src_id, dst_id));
        self.rf_seq_no = 0;
        self.rf_stream_id = rand::random();

        header.encode(&mut burst);
        SlotType::new(self.color_code, DataType::DataHeader).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        if self.duplex {
            self.write_queue_rf(Tag::Data, &burst);
        }
        self.write_network_rf(&burst, DataType::DataHeader, flco, src_id, dst_id, 0);

        self.rf_state = RfState::Data;
        if self.net_state == NetState::Idle {
            self.set_activity(ActivityType::Data, flco, dst_id);
        }

        let lc = Lc::new(flco, src_id, dst_id);
        tracing::info!(
            slot = self.slot_no,
            "received RF data header from {} to {}, {} blocks",
            self.lookup.find(src_id),
            self.describe_dst(&lc),
            self.rf_data_frames
        );

        if self.rf_data_frames == 0 {
            tracing::info!(slot = self.slot_no, "ended RF data transmission");
            self.write_end_rf(false);
        }
        true
    }

    fn rf_data_block(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES], data_type: DataType) -> bool {
        if self.rf_state != RfState::Data || self.rf_data_frames == 0 {
            return false;
        }
        let Some(lc) = self.rf_lc else {
            return false;
        };

        self.regenerate_data_block(&mut burst, data_type, "RF");
        SlotType::new(self.color_code, data_type).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        self.rf_data_frames -= 1;
        let tag = if self.rf_data_frames == 0 { Tag::Eot } else { Tag::Data };

        if self.duplex {
            self.write_queue_rf(tag, &burst);
        }
        self.write_network_rf(&burst, data_type, lc.flco, lc.src_id, lc.dst_id, 0);

        if self.rf_data_frames == 0 {
            tracing::info!(slot = self.slot_no, "ended RF data transmission");
            self.write_end_rf(false);
        }
        true
    }

    /// Runs the block through its FEC and back. Unfixable blocks are passed on as received.
    fn regenerate_data_block(&self, burst: &mut [u8; DMR_FRAME_LENGTH_BYTES], data_type: DataType, source: &str) {
        match data_type {
            DataType::Rate12Data => match bptc19696::decode(burst) {
                Some(payload) => bptc19696::encode(&payload, burst),
                None => tracing::debug!(slot = self.slot_no, "unfixable {} rate 1/2 data {:02X?}", source, burst),
            },
            DataType::Rate34Data => match trellis::decode(burst) {
                Some(payload) => trellis::encode(&payload, burst),
                None => tracing::debug!(slot = self.slot_no, "unfixable {} rate 3/4 data {:02X?}", source, burst),
            },
            _ => {}
        }
    }

    fn rf_csbk(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        let Some(mut csbk) = Csbk::decode(&burst) else {
            tracing::debug!(slot = self.slot_no, "unable to decode the RF CSBK");
            return false;
        };
        if csbk.csbko() == Some(Csbko::BsDwnAct) {
            return false;
        }

        let (src_id, dst_id, group) = (csbk.src_id(), csbk.dst_id(), csbk.is_group());
        if src_id != 0 || dst_id != 0 {
            if !self.access.validate_src_id(src_id) {
                tracing::info!(slot = self.slot_no, "RF user {} rejected", src_id);
                return false;
            }
            if group && !self.access.validate_destination(dst_id, self.slot_no, false) {
                tracing::info!(slot = self.slot_no, "RF user {} rejected for using TG {}", src_id, dst_id);
                return false;
            }
        }

        if matches!(csbk.csbko(), Some(Csbko::UuVReq | Csbko::UuAnsRsp)) {
            let ovcm = self.config.dmr.ovcm;
            if ovcm.set_on_rf() {
                csbk.set_ovcm(true);
            } else if ovcm.clear_on_rf() {
                csbk.set_ovcm(false);
            }
        }

        csbk.encode(&mut burst);
        SlotType::new(self.color_code, DataType::Csbk).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        self.rf_seq_no = 0;
        self.rf_stream_id = rand::random();

        if self.duplex {
            self.write_queue_rf(Tag::Data, &burst);
        }
        let flco = if group { Flco::Group } else { Flco::UserUser };
        self.write_network_rf(&burst, DataType::Csbk, flco, src_id, dst_id, 0);

        if let CsbkBody::Preamble { data_content: true, .. } = csbk.body {
            if self.net_state == NetState::Idle && self.rf_state == RfState::Listening {
                self.set_activity(ActivityType::Data, flco, dst_id);
            }
        }
        self.log_csbk(&csbk, "RF");
        true
    }

    fn log_csbk(&self, csbk: &Csbk, source: &str) {
        let src = self.lookup.find(csbk.src_id());
        let dst = self.lookup.find(csbk.dst_id());
        let tg = if csbk.is_group() { "TG " } else { "" };
        match csbk.body {
            CsbkBody::UnitToUnitRequest { .. } => {
                tracing::info!(slot = self.slot_no, "received {} Unit to Unit Voice Service Request CSBK from {} to {}{}", source, src, tg, dst)
            }
            CsbkBody::UnitToUnitAnswer { .. } => {
                tracing::info!(slot = self.slot_no, "received {} Unit to Unit Voice Service Answer Response CSBK from {} to {}{}", source, src, tg, dst)
            }
            CsbkBody::NegativeAck { .. } => {
                tracing::info!(slot = self.slot_no, "received {} Negative Acknowledgment Response CSBK from {} to {}{}", source, src, tg, dst)
            }
            CsbkBody::CallAlert { .. } => {
                tracing::info!(slot = self.slot_no, "received {} Call Alert CSBK from {} to {}{}", source, src, tg, dst)
            }
            CsbkBody::CallAlertAck { .. } => {
                tracing::info!(slot = self.slot_no, "received {} Call Alert Ack CSBK from {} to {}{}", source, src, tg, dst)
            }
            CsbkBody::RadioCheck { request, .. } => {
                let kind = if request { "Request" } else { "Ack" };
                tracing::info!(slot = self.slot_no, "received {} Radio Check {} CSBK from {} to {}{}", source, kind, src, tg, dst)
            }
            CsbkBody::CallEmergency { .. } => {
                tracing::info!(slot = self.slot_no, "received {} Call Emergency CSBK from {} to {}{}", source, src, tg, dst)
            }
            CsbkBody::Preamble { data_content, cbf, .. } => {
                let kind = if data_content { "Data" } else { "CSBK" };
                tracing::info!(slot = self.slot_no, "received {} {} Preamble CSBK ({} to follow) from {} to {}{}", source, kind, cbf, src, tg, dst)
            }
            CsbkBody::BsDownlinkActivate { .. } => {}
            CsbkBody::Unhandled { opcode, .. } => {
                tracing::warn!(slot = self.slot_no, "unhandled {} CSBK, csbko=0x{:02X} fid=0x{:02X}", source, opcode, csbk.fid)
            }
        }
    }

    fn rf_voice_sync(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        match self.rf_state {
            RfState::Audio => {
                let Some(lc) = self.rf_lc else {
                    return false;
                };
                let errors = self.regenerate_voice(&mut burst, lc.fid);
                self.rf_ber.add(VOICE_SYNC_FEC_BITS_PER_BURST, errors);
                self.rf_frames += 1;
                self.rf_n = 0;

                self.rf_embedded_read_n = (self.rf_embedded_read_n + 1) % 2;
                self.rf_embedded_write_n = (self.rf_embedded_write_n + 1) % 2;
                self.rf_embedded_data[self.rf_embedded_write_n].reset();

                add_audio_sync(&mut burst, self.duplex);

                if self.duplex {
                    self.write_queue_rf(Tag::Data, &burst);
                }
                self.write_network_rf(&burst, DataType::VoiceSync, lc.flco, lc.src_id, lc.dst_id, errors);
                true
            }
            RfState::Listening => {
                self.rf_embedded_lc.reset();
                self.rf_state = RfState::LateEntry;
                false
            }
            _ => false,
        }
    }

    fn rf_voice(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES], n: u8) -> bool {
        match self.rf_state {
            RfState::Audio => {
                let Some(lc) = self.rf_lc else {
                    return false;
                };
                if n > 5 || n != (self.rf_n + 1) % 6 {
                    tracing::trace!(slot = self.slot_no, "dropping RF voice burst n={} after n={}", n, self.rf_n);
                    return false;
                }
                self.rf_n = n;

                let mut emb = Emb::decode(&burst);
                if self.rf_embedded_data[self.rf_embedded_write_n].add_data(&burst, emb.lcss) {
                    self.route_rf_embedded_data(&lc);
                }

                let read = &self.rf_embedded_data[self.rf_embedded_read_n];
                emb.lcss = if read.is_valid() {
                    read.get_data(&mut burst, n)
                } else {
                    self.rf_embedded_lc.get_data(&mut burst, n)
                };
                emb.color_code = self.color_code;
                emb.encode(&mut burst);

                let errors = self.regenerate_voice(&mut burst, lc.fid);
                self.rf_ber.add(VOICE_FEC_BITS_PER_BURST, errors);
                self.rf_frames += 1;

                if self.duplex {
                    self.write_queue_rf(Tag::Data, &burst);
                }
                self.write_network_rf(&burst, DataType::Voice, lc.flco, lc.src_id, lc.dst_id, errors);
                true
            }
            RfState::Listening => {
                if Emb::decode(&burst).color_code != self.color_code {
                    return false;
                }
                self.rf_embedded_lc.reset();
                self.rf_state = RfState::LateEntry;
                self.rf_late_entry(burst, n)
            }
            RfState::LateEntry => self.rf_late_entry(burst, n),
            _ => false,
        }
    }

    /// Voice without a header: waits for the embedded LC to complete, then
    /// starts the call as if a header had been received
    fn rf_late_entry(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES], n: u8) -> bool {
        let mut emb = Emb::decode(&burst);
        if emb.color_code != self.color_code {
            return false;
        }
        if !self.rf_embedded_lc.add_data(&burst, emb.lcss) {
            return false;
        }
        // Talker alias or GPS completed first, keep listening for the call LC
        let Some(lc) = self.rf_embedded_lc.lc() else {
            return false;
        };
        let Some(lc) = self.admit_rf_call(lc) else {
            return false;
        };

        let mut header = [0u8; DMR_FRAME_LENGTH_BYTES];
        FullLc::encode(&lc, DataType::VoiceLcHeader, &mut header);
        SlotType::new(self.color_code, DataType::VoiceLcHeader).encode(&mut header);
        add_data_sync(&mut header, self.duplex);

        self.start_rf_call(lc);
        self.rf_n = n;

        if self.duplex {
            for _ in 0..NO_HEADERS_DUPLEX {
                self.write_queue_rf(Tag::Data, &header);
            }
        }
        self.write_network_rf(&header, DataType::VoiceLcHeader, lc.flco, lc.src_id, lc.dst_id, 0);

        // Continue with the burst that completed the LC
        emb.lcss = self.rf_embedded_lc.get_data(&mut burst, n);
        emb.color_code = self.color_code;
        emb.encode(&mut burst);

        let errors = self.regenerate_voice(&mut burst, lc.fid);
        self.rf_ber.add(VOICE_FEC_BITS_PER_BURST, errors);
        self.rf_frames += 1;

        if self.duplex {
            self.write_queue_rf(Tag::Data, &burst);
        }
        self.write_network_rf(&burst, DataType::Voice, lc.flco, lc.src_id, lc.dst_id, errors);

        self.rf_state = RfState::Audio;
        if self.net_state == NetState::Idle {
            self.set_activity(ActivityType::Voice, lc.flco, lc.dst_id);
        }
        tracing::info!(
            slot = self.slot_no,
            "received RF late entry from {} to {}",
            self.lookup.find(lc.src_id),
            self.describe_dst(&lc)
        );
        true
    }

    /// Talker alias and GPS carried in the embedded LC of RF voice
    fn route_rf_embedded_data(&mut self, lc: &Lc) {
        let data = &self.rf_embedded_data[self.rf_embedded_write_n];
        let flco = data.flco();
        let Some(raw) = data.raw_data() else {
            return;
        };

        match flco {
            Flco::Group | Flco::UserUser => {}
            Flco::GpsInfo => {
                match GpsInfo::from_bytes(&raw) {
                    Ok(gps) => tracing::info!(slot = self.slot_no, "{} from {}", gps, self.lookup.find(lc.src_id)),
                    Err(e) => tracing::debug!(slot = self.slot_no, "undecodable GPS info: {:?}", e),
                }
                self.net_out.push_back(NetworkFrame::RadioPosition { slot_no: self.slot_no, src_id: lc.src_id, raw });
            }
            flco if flco.is_talker_alias() => {
                let Some(block) = TalkerAlias::block_index(flco) else {
                    return;
                };
                if !self.rf_talker_alias.add(block, &raw) {
                    return;
                }
                self.net_out.push_back(NetworkFrame::TalkerAlias {
                    slot_no: self.slot_no,
                    src_id: lc.src_id,
                    block: block as u8,
                    raw,
                });
                if self.dump_talker_alias {
                    tracing::debug!(slot = self.slot_no, "talker alias block {} {:02X?}", block, raw);
                }
                if let Some(alias) = self.rf_talker_alias.decode() {
                    tracing::info!(slot = self.slot_no, "talker alias \"{}\" from {}", alias, self.lookup.find(lc.src_id));
                }
            }
            other => tracing::debug!(slot = self.slot_no, "unknown embedded data, flco {:?} {:02X?}", other, raw),
        }
    }

    /// AMBE FEC repair, only for the voice codecs we know the layout of
    fn regenerate_voice(&self, burst: &mut [u8; DMR_FRAME_LENGTH_BYTES], fid: u8) -> u32 {
        if fid == FID_ETSI || fid == FID_DMRA {
            ambe_fec::regenerate_dmr(burst)
        } else {
            0
        }
    }

    fn write_end_rf(&mut self, write_end: bool) {
        let lc = self.rf_lc.take();

        if write_end && self.net_state == NetState::Idle && self.duplex && !self.rf_timed_out {
            if let Some(lc) = lc {
                let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
                FullLc::encode(&lc, DataType::TerminatorWithLc, &mut burst);
                SlotType::new(self.color_code, DataType::TerminatorWithLc).encode(&mut burst);
                add_data_sync(&mut burst, self.duplex);
                for _ in 0..NO_TERMINATORS {
                    self.write_queue_rf(Tag::Eot, &burst);
                }
            }
        }

        self.rf_state = RfState::Listening;
        if self.net_state == NetState::Idle {
            self.clear_activity();
        }

        self.rf_timeout_timer.stop();
        self.rf_timed_out = false;
        self.rf_frames = 0;
        self.rf_data_frames = 0;
        self.rf_ber.reset();
        self.rf_embedded_lc.reset();
        self.rf_talker_alias.reset();
        self.rewrite.set_over_end_time();
    }

    fn write_queue_rf(&mut self, tag: Tag, burst: &[u8; DMR_FRAME_LENGTH_BYTES]) {
        if self.net_state != NetState::Idle {
            return;
        }
        if self.rf_timed_out {
            let idle = self.idle;
            self.queue.push(Tag::Data, &idle);
        } else {
            self.queue.push(tag, burst);
        }
    }

    fn write_network_rf(&mut self, burst: &[u8; DMR_FRAME_LENGTH_BYTES], data_type: DataType, flco: Flco, src_id: u32, dst_id: u32, errors: u32) {
        if self.net_state != NetState::Idle || self.rf_timed_out {
            return;
        }

        let mut data = DmrData::new(self.slot_no, data_type);
        data.src_id = src_id;
        data.dst_id = dst_id;
        data.flco = flco;
        data.n = self.rf_n;
        data.seq_no = self.rf_seq_no;
        data.ber = errors.min(u8::MAX as u32) as u8;
        data.rssi = self.rssi.unsigned_abs().min(u8::MAX as u32) as u8;
        data.stream_id = self.rf_stream_id;
        data.data = *burst;

        self.rf_seq_no = self.rf_seq_no.wrapping_add(1);
        self.net_out.push_back(NetworkFrame::Data(data));
    }

    fn update_rssi(&mut self, raw: u16) {
        let dbm = self.rssi_mapper.interpolate(raw);
        if dbm == 0 {
            return;
        }
        self.rssi = dbm;
        if matches!(self.rf_state, RfState::Audio | RfState::Data) {
            self.rssi_stats.add(dbm);
        }
    }

    fn rssi_suffix(&self) -> String {
        if self.rssi_stats.count() == 0 {
            String::new()
        } else {
            format!(", RSSI: {}", self.rssi_stats)
        }
    }

    fn describe_dst(&self, lc: &Lc) -> String {
        if lc.is_group() {
            format!("TG {}", self.lookup.find(lc.dst_id))
        } else {
            self.lookup.find(lc.dst_id)
        }
    }

    fn set_activity(&mut self, activity: ActivityType, flco: Flco, id: u32) {
        let new = SlotActivity { activity, flco, id };
        if new != self.activity {
            self.activity = new;
            self.activity_changed = true;
        }
    }

    fn clear_activity(&mut self) {
        if self.activity != SlotActivity::default() {
            self.activity = SlotActivity::default();
            self.activity_changed = true;
        }
    }

    /// Feeds one packet from the network. Ignored while the RF side is busy.
    pub fn write_network(&mut self, data: &DmrData) -> bool {
        if self.rf_state != RfState::Listening && self.net_state == NetState::Idle {
            return false;
        }

        self.net_watchdog.start();
        let burst = data.data;
        tracing::trace!(slot = self.slot_no, "<- net {} {:02X?}", data.data_type, burst);

        match data.data_type {
            DataType::VoiceLcHeader => self.net_voice_header(data, burst),
            DataType::VoicePiHeader => self.net_pi_header(burst),
            DataType::TerminatorWithLc => self.net_terminator(burst),
            DataType::DataHeader => self.net_data_header(burst),
            DataType::Csbk => self.net_csbk(burst),
            DataType::Rate12Data | DataType::Rate34Data | DataType::Rate1Data => self.net_data_block(burst, data.data_type),
            DataType::VoiceSync => self.net_voice_sync(data, burst),
            DataType::Voice => self.net_voice(data, burst),
            other => {
                tracing::warn!(slot = self.slot_no, "unhandled network data type {}", other);
                false
            }
        }
    }

    /// Access control, talkgroup rewrite and OVCM policy for a new network call
    fn admit_net_call(&mut self, mut lc: Lc) -> Option<Lc> {
        if lc.is_group() && !self.access.validate_destination(lc.dst_id, self.slot_no, true) {
            tracing::debug!(slot = self.slot_no, "network call from {} to TG {} rejected", lc.src_id, lc.dst_id);
            return None;
        }

        let mut flco = lc.flco;
        let rewritten = self.access.rewrite_destination(lc.dst_id, lc.src_id, self.slot_no, true, &mut flco, &mut self.rewrite);
        if rewritten != 0 {
            lc.dst_id = rewritten;
        }
        lc.flco = flco;

        if self.config.dmr.ovcm.set_on_net() {
            lc.set_ovcm(true);
        }
        Some(lc)
    }

    fn start_net_call(&mut self, lc: Lc) {
        self.net_lc = Some(lc);
        self.net_embedded_lc.set_lc(&lc);
        self.net_embedded_data[0].reset();
        self.net_embedded_data[1].reset();
        self.net_embedded_read_n = 0;
        self.net_embedded_write_n = 1;
        self.net_talker_alias.reset();

        self.net_timeout_timer.start();
        self.net_timed_out = false;
        self.net_frames = 0;
        self.net_lost = 0;
        self.net_n = 5;
        self.net_ber.reset();
        self.net_elapsed_ms = 0;
        self.last_frame_valid = false;

        self.write_jitter();
    }

    /// Idle bursts in front of a network call absorb network jitter
    fn write_jitter(&mut self) {
        let idle = self.idle;
        for _ in 0..self.jitter_slots {
            self.write_queue_net(Tag::Data, &idle);
        }
    }

    fn net_voice_header(&mut self, data: &DmrData, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.net_state == NetState::Audio {
            return false;
        }

        let lc = match FullLc::decode(&burst, DataType::VoiceLcHeader) {
            Some(lc) => {
                if lc.src_id != data.src_id || lc.dst_id != data.dst_id || lc.flco != data.flco {
                    tracing::warn!(
                        slot = self.slot_no,
                        "network header LC {}/{} differs from the packet ids {}/{}",
                        lc.src_id,
                        lc.dst_id,
                        data.src_id,
                        data.dst_id
                    );
                }
                lc
            }
            None => {
                tracing::debug!(slot = self.slot_no, "bad LC received from the network, replacing");
                Lc::new(data.flco, data.src_id, data.dst_id)
            }
        };
        let Some(lc) = self.admit_net_call(lc) else {
            return false;
        };

        FullLc::encode(&lc, DataType::VoiceLcHeader, &mut burst);
        SlotType::new(self.color_code, DataType::VoiceLcHeader).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        self.start_net_call(lc);

        let copies = if self.duplex { NO_HEADERS_DUPLEX } else { NO_HEADERS_SIMPLEX };
        for _ in 0..copies {
            self.write_queue_net(Tag::Data, &burst);
        }

        self.net_state = NetState::Audio;
        self.set_activity(ActivityType::Voice, lc.flco, lc.dst_id);
        tracing::info!(
            slot = self.slot_no,
            "received network voice header from {} to {}",
            self.lookup.find(lc.src_id),
            self.describe_dst(&lc)
        );
        true
    }

    fn net_pi_header(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.net_state != NetState::Audio {
            return false;
        }
        SlotType::new(self.color_code, DataType::VoicePiHeader).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);
        self.write_queue_net(Tag::Data, &burst);
        tracing::debug!(slot = self.slot_no, "received network PI header");
        true
    }

    fn net_terminator(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.net_state != NetState::Audio {
            return false;
        }
        let Some(lc) = self.net_lc else {
            return false;
        };

        FullLc::encode(&lc, DataType::TerminatorWithLc, &mut burst);
        SlotType::new(self.color_code, DataType::TerminatorWithLc).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        if !self.net_timed_out {
            for _ in 0..NO_TERMINATORS {
                self.write_queue_net(Tag::Eot, &burst);
            }
        }

        tracing::info!(
            slot = self.slot_no,
            "received network end of voice transmission from {} to {}, {:.1} seconds, {}% packet loss, BER: {:.1}%",
            self.lookup.find(lc.src_id),
            self.describe_dst(&lc),
            self.net_frames as f32 / FRAMES_PER_SEC,
            self.net_loss_percent(),
            self.net_ber.percent()
        );

        self.write_end_net(false);
        true
    }

    fn net_data_header(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.net_state == NetState::Data {
            return false;
        }
        let Some(header) = DataHeader::decode(&burst) else {
            tracing::debug!(slot = self.slot_no, "unable to decode the network data header");
            return false;
        };
        let flco = if header.group { Flco::Group } else { Flco::UserUser };
        let lc = Lc::new(flco, header.src_id, header.dst_id);
        if lc.is_group() && !self.access.validate_destination(lc.dst_id, self.slot_no, true) {
            tracing::debug!(slot = self.slot_no, "network data from {} to TG {} rejected", lc.src_id, lc.dst_id);
            return false;
        }

        self.net_data_frames = header.blocks();
        self.net_lc = Some(lc);

        header.encode(&mut burst);
        SlotType::new(self.color_code, DataType::DataHeader).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        self.write_jitter();
        self.write_queue_net(Tag::Data, &burst);

        self.net_state = NetState::Data;
        self.set_activity(ActivityType::Data, flco, lc.dst_id);
        tracing::info!(
            slot = self.slot_no,
            "received network data header from {} to {}, {} blocks",
            self.lookup.find(lc.src_id),
            self.describe_dst(&lc),
            self.net_data_frames
        );

        if self.net_data_frames == 0 {
            tracing::info!(slot = self.slot_no, "ended network data transmission");
            self.write_end_net(false);
        }
        true
    }

    fn net_data_block(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES], data_type: DataType) -> bool {
        if self.net_state != NetState::Data || self.net_data_frames == 0 {
            return false;
        }

        self.regenerate_data_block(&mut burst, data_type, "network");
        SlotType::new(self.color_code, data_type).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);

        self.net_data_frames -= 1;
        let tag = if self.net_data_frames == 0 { Tag::Eot } else { Tag::Data };
        self.write_queue_net(tag, &burst);

        if self.net_data_frames == 0 {
            tracing::info!(slot = self.slot_no, "ended network data transmission");
            self.write_end_net(false);
        }
        true
    }

    fn net_csbk(&mut self, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        let Some(mut csbk) = Csbk::decode(&burst) else {
            tracing::debug!(slot = self.slot_no, "unable to decode the network CSBK");
            return false;
        };
        if csbk.csbko() == Some(Csbko::BsDwnAct) {
            return false;
        }

        if matches!(csbk.csbko(), Some(Csbko::UuVReq | Csbko::UuAnsRsp)) && self.config.dmr.ovcm.set_on_net() {
            csbk.set_ovcm(true);
        }

        csbk.encode(&mut burst);
        SlotType::new(self.color_code, DataType::Csbk).encode(&mut burst);
        add_data_sync(&mut burst, self.duplex);
        self.write_queue_net(Tag::Data, &burst);

        if let CsbkBody::Preamble { data_content: true, group, .. } = csbk.body {
            if self.net_state == NetState::Idle {
                let flco = if group { Flco::Group } else { Flco::UserUser };
                self.set_activity(ActivityType::Data, flco, csbk.dst_id());
            }
        }
        self.log_csbk(&csbk, "network");
        true
    }

    fn net_voice_sync(&mut self, data: &DmrData, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.net_state == NetState::Idle {
            // Late entry from the network, the packet ids stand in for a header
            let Some(lc) = self.admit_net_call(Lc::new(data.flco, data.src_id, data.dst_id)) else {
                return false;
            };
            self.start_net_call(lc);
            self.net_state = NetState::Audio;
            self.set_activity(ActivityType::Voice, lc.flco, lc.dst_id);
            tracing::info!(
                slot = self.slot_no,
                "received network late entry from {} to {}",
                self.lookup.find(lc.src_id),
                self.describe_dst(&lc)
            );
        }
        if self.net_state != NetState::Audio {
            return false;
        }
        let Some(lc) = self.net_lc else {
            return false;
        };

        if !self.insert_silence_for(0) {
            return false;
        }

        let errors = self.regenerate_voice(&mut burst, lc.fid);
        self.net_ber.add(VOICE_SYNC_FEC_BITS_PER_BURST, errors);

        self.net_embedded_read_n = (self.net_embedded_read_n + 1) % 2;
        self.net_embedded_write_n = (self.net_embedded_write_n + 1) % 2;
        self.net_embedded_data[self.net_embedded_write_n].reset();

        add_audio_sync(&mut burst, self.duplex);
        self.write_net_voice(burst, 0);
        true
    }

    fn net_voice(&mut self, data: &DmrData, mut burst: [u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.net_state != NetState::Audio {
            return false;
        }
        let Some(lc) = self.net_lc else {
            return false;
        };
        let n = data.n;
        if n == 0 || n > 5 {
            tracing::debug!(slot = self.slot_no, "network voice burst with n={}", n);
            return false;
        }
        if !self.insert_silence_for(n) {
            return false;
        }

        let mut emb = Emb::decode(&burst);
        if !self.embedded_lc_only {
            let write_n = self.net_embedded_write_n;
            if self.net_embedded_data[write_n].add_data(&burst, emb.lcss) {
                self.log_net_embedded_data(&lc);
            }
        }

        let read = &self.net_embedded_data[self.net_embedded_read_n];
        emb.lcss = if !self.embedded_lc_only && read.is_valid() {
            read.get_data(&mut burst, n)
        } else {
            self.net_embedded_lc.get_data(&mut burst, n)
        };
        emb.color_code = self.color_code;
        emb.encode(&mut burst);

        let errors = self.regenerate_voice(&mut burst, lc.fid);
        self.net_ber.add(VOICE_FEC_BITS_PER_BURST, errors);

        self.write_net_voice(burst, n);
        true
    }

    fn write_net_voice(&mut self, burst: [u8; DMR_FRAME_LENGTH_BYTES], n: u8) {
        self.write_queue_net(Tag::Data, &burst);
        self.last_frame = burst;
        self.last_frame_valid = true;
        self.net_n = n;
        self.net_frames += 1;
        self.packet_timer.start();
    }

    fn log_net_embedded_data(&mut self, lc: &Lc) {
        let data = &self.net_embedded_data[self.net_embedded_write_n];
        let flco = data.flco();
        let Some(raw) = data.raw_data() else {
            return;
        };
        match flco {
            Flco::GpsInfo => {
                if let Ok(gps) = GpsInfo::from_bytes(&raw) {
                    tracing::info!(slot = self.slot_no, "network {} from {}", gps, self.lookup.find(lc.src_id));
                }
            }
            flco if flco.is_talker_alias() => {
                if let Some(block) = TalkerAlias::block_index(flco) {
                    if self.net_talker_alias.add(block, &raw) && self.net_talker_alias.is_complete() {
                        if let Some(alias) = self.net_talker_alias.decode() {
                            tracing::info!(slot = self.slot_no, "network talker alias \"{}\" from {}", alias, self.lookup.find(lc.src_id));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Fills the gap in front of voice burst `n`. Returns false for a repeat of
    /// the previous burst, which is dropped.
    fn insert_silence_for(&mut self, n: u8) -> bool {
        let expected = (self.net_n + 1) % 6;
        if n == expected {
            return true;
        }
        let count = (n as usize + 6 - expected as usize) % 6;
        if n == self.net_n {
            tracing::trace!(slot = self.slot_no, "dropping repeated network voice burst n={}", n);
            return false;
        }
        self.insert_silence(count);
        true
    }

    /// Queues `count` filler bursts, the first one repeating the last audio
    /// block heard, the rest canned silence
    fn insert_silence(&mut self, count: usize) {
        let Some(lc) = self.net_lc else {
            return;
        };
        let ambe = lc.fid == FID_ETSI || lc.fid == FID_DMRA;

        let mut data = if self.last_frame_valid {
            let mut block = [0u8; 9];
            block.copy_from_slice(&self.last_frame[24..33]);
            let mut data = self.last_frame;
            data[0..9].copy_from_slice(&block);
            data[24..33].copy_from_slice(&block);
            data[9..14].copy_from_slice(&block[0..5]);
            data[19..24].copy_from_slice(&block[4..9]);
            data
        } else {
            DMR_SILENCE_DATA
        };

        let mut n = (self.net_n + 1) % 6;
        for i in 0..count {
            if i > 0 && ambe {
                data = DMR_SILENCE_DATA;
                self.last_frame_valid = false;
            }

            if n == 0 {
                add_audio_sync(&mut data, self.duplex);
            } else {
                let lcss = self.net_embedded_lc.get_data(&mut data, n);
                Emb { color_code: self.color_code, pi: false, lcss }.encode(&mut data);
            }

            self.write_queue_net(Tag::Data, &data);
            self.net_n = n;
            self.net_frames += 1;
            self.net_lost += 1;
            n = (n + 1) % 6;
        }
        tracing::debug!(slot = self.slot_no, "inserted {} silence bursts", count);
    }

    fn net_loss_percent(&self) -> u32 {
        if self.net_frames == 0 {
            return 0;
        }
        self.net_lost * 100 / self.net_frames
    }

    fn write_end_net(&mut self, write_end: bool) {
        let lc = self.net_lc.take();

        if write_end && self.net_state == NetState::Audio && !self.net_timed_out {
            if let Some(lc) = lc {
                let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
                FullLc::encode(&lc, DataType::TerminatorWithLc, &mut burst);
                SlotType::new(self.color_code, DataType::TerminatorWithLc).encode(&mut burst);
                add_data_sync(&mut burst, self.duplex);
                for _ in 0..NO_TERMINATORS {
                    self.write_queue_net(Tag::Eot, &burst);
                }
            }
        }

        self.net_state = NetState::Idle;
        if self.rf_state == RfState::Listening {
            self.clear_activity();
        }

        self.net_timeout_timer.stop();
        self.net_timed_out = false;
        self.net_watchdog.stop();
        self.packet_timer.stop();
        self.net_frames = 0;
        self.net_data_frames = 0;
        self.net_ber.reset();
        self.last_frame_valid = false;
        self.rewrite.set_over_end_time();
    }

    fn write_queue_net(&mut self, tag: Tag, burst: &[u8; DMR_FRAME_LENGTH_BYTES]) {
        if self.net_timed_out {
            let idle = self.idle;
            self.queue.push(Tag::Data, &idle);
        } else {
            self.queue.push(tag, burst);
        }
    }

    /// Advances all timers by `ms`
    pub fn clock(&mut self, ms: u32) {
        self.rf_timeout_timer.clock(ms);
        if self.rf_timeout_timer.is_running() && self.rf_timeout_timer.has_expired() && !self.rf_timed_out {
            tracing::info!(slot = self.slot_no, "RF user has timed out");
            self.rf_timed_out = true;
        }

        self.net_timeout_timer.clock(ms);
        if self.net_timeout_timer.is_running() && self.net_timeout_timer.has_expired() && !self.net_timed_out {
            tracing::info!(slot = self.slot_no, "network user has timed out");
            self.net_timed_out = true;
        }

        if self.net_state == NetState::Idle {
            return;
        }

        self.net_watchdog.clock(ms);
        if self.net_watchdog.has_expired() {
            if self.net_state == NetState::Audio {
                if let Some(lc) = self.net_lc {
                    tracing::info!(
                        slot = self.slot_no,
                        "network watchdog has expired on the call from {} to {}, {:.1} seconds, {}% packet loss, BER: {:.1}%",
                        self.lookup.find(lc.src_id),
                        self.describe_dst(&lc),
                        self.net_frames as f32 / FRAMES_PER_SEC,
                        self.net_loss_percent(),
                        self.net_ber.percent()
                    );
                }
                self.write_end_net(true);
            } else {
                tracing::info!(slot = self.slot_no, "network watchdog has expired");
                self.write_end_net(false);
            }
            return;
        }

        if self.net_state == NetState::Audio {
            self.net_elapsed_ms = self.net_elapsed_ms.saturating_add(ms);
            self.packet_timer.clock(ms);
            if self.packet_timer.is_running() && self.packet_timer.has_expired() {
                let elapsed_frames = self.net_elapsed_ms / DMR_SLOT_TIME;
                if elapsed_frames > self.net_frames {
                    let behind = elapsed_frames - self.net_frames;
                    if behind > MAX_FRAMES_BEHIND {
                        tracing::debug!(slot = self.slot_no, "network audio is {} frames behind, filling in", behind);
                        self.insert_silence((behind - 1) as usize);
                    }
                }
                self.packet_timer.start();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dmr_core::debug;

    use super::*;
    use crate::lookup::TableLookup;

    fn slot(f: impl FnOnce(&mut DmrConfig)) -> DmrSlot {
        let mut cfg = DmrConfig::new(2345678, 1);
        f(&mut cfg);
        DmrSlot::new(1, Arc::new(cfg), Arc::new(TableLookup::default()))
    }

    fn net_header(src_id: u32, dst_id: u32) -> DmrData {
        let lc = Lc::new(Flco::Group, src_id, dst_id);
        let mut data = DmrData::new(1, DataType::VoiceLcHeader);
        data.src_id = src_id;
        data.dst_id = dst_id;
        FullLc::encode(&lc, DataType::VoiceLcHeader, &mut data.data);
        data
    }

    #[test]
    fn test_idle_burst_has_our_colour_code() {
        debug::setup_logging_verbose();
        let s = slot(|c| c.dmr.color_code = 7);
        let slot_type = SlotType::decode(&s.idle).unwrap();
        assert_eq!(slot_type.color_code, 7);
        assert_eq!(slot_type.data_type, DataType::Idle);
    }

    #[test]
    fn test_lost_in_listening_is_ignored() {
        let mut s = slot(|_| {});
        assert!(!s.write_modem(&[Tag::Lost.into_raw() as u8]));
        assert!(!s.write_modem(&[]));
        assert!(!s.write_modem(&[Tag::Data.into_raw() as u8, 0x41, 0, 0]));
        assert_eq!(s.rf_state(), RfState::Listening);
        assert!(s.read_modem().is_none());
    }

    #[test]
    fn test_network_header_is_repeated() {
        debug::setup_logging_verbose();
        let mut s = slot(|_| {});
        assert!(s.write_network(&net_header(2345001, 91)));
        assert_eq!(s.net_state(), NetState::Audio);
        assert_eq!(s.queued(), NO_HEADERS_DUPLEX);
        assert_eq!(s.take_activity_change().map(|a| a.id), Some(91));
        assert_eq!(s.take_activity_change(), None);

        // A second header of the same call is ignored
        assert!(!s.write_network(&net_header(2345001, 91)));
        assert_eq!(s.queued(), NO_HEADERS_DUPLEX);

        let burst = s.read_modem().unwrap();
        let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
        payload.copy_from_slice(&burst[2..]);
        assert_eq!(FullLc::decode(&payload, DataType::VoiceLcHeader), Some(Lc::new(Flco::Group, 2345001, 91)));
    }

    #[test]
    fn test_simplex_network_header_copies() {
        let mut s = slot(|c| c.dmr.duplex = false);
        s.write_network(&net_header(2345001, 91));
        assert_eq!(s.queued(), NO_HEADERS_SIMPLEX);
    }

    #[test]
    fn test_watchdog_ends_network_call() {
        debug::setup_logging_verbose();
        let mut s = slot(|_| {});
        s.write_network(&net_header(2345001, 91));
        while s.read_modem().is_some() {}

        s.clock(NET_WATCHDOG_MS - 10);
        assert_eq!(s.net_state(), NetState::Audio);
        s.clock(20);
        assert_eq!(s.net_state(), NetState::Idle);
        assert_eq!(s.queued(), NO_TERMINATORS);
        assert_eq!(s.read_modem().unwrap()[0], Tag::Eot.into_raw() as u8);
        assert_eq!(s.activity(), SlotActivity::default());
    }

    #[test]
    fn test_network_timeout_sends_idle() {
        let mut s = slot(|c| c.dmr.timeout_secs = 1);
        s.write_network(&net_header(2345001, 91));
        while s.read_modem().is_some() {}

        // Keep the watchdog fed while the timeout runs out
        for _ in 0..5 {
            s.clock(250);
            s.net_watchdog.start();
        }
        assert!(s.net_timed_out);

        let mut data = DmrData::new(1, DataType::VoiceSync);
        data.data = DMR_SILENCE_DATA;
        assert!(s.write_network(&data));
        let burst = s.read_modem().unwrap();
        assert_eq!(&burst[2..], &s.idle[..]);
    }
}
