use dmr_core::defines::{DMR_FRAME_LENGTH_BYTES, DataType, Flco};
use dmr_fec::ambe_fec;
use dmr_pdus::burst::emb::Emb;
use dmr_pdus::burst::slot_type::SlotType;
use dmr_pdus::burst::sync::SyncPattern;
use dmr_pdus::lc::gps::GpsInfo;
use dmr_pdus::lc::talker_alias::TalkerAlias;
use dmr_pdus::{Csbk, DataHeader, DmrData, EmbeddedData, FullLc, MmdvmFrame};

pub type Burst = [u8; DMR_FRAME_LENGTH_BYTES];

/// Burst parser for standalone PDU debugging
pub struct BurstParser;

impl BurstParser {
    /// Decode a single 33 byte burst, picking the codec from its sync and slot type
    pub fn parse_burst(burst: &Burst) {
        println!("=== DMR burst ===");
        println!("Input: {:02X?}", burst);

        let sync = SyncPattern::detect(burst);
        match sync {
            Some(p) => println!("Sync: {:?}", p),
            None => println!("Sync: none"),
        }

        match sync {
            Some(SyncPattern::BsAudio | SyncPattern::MsAudio | SyncPattern::DirectSlot1Audio | SyncPattern::DirectSlot2Audio) => {
                println!("Voice sync burst (A), AMBE bit errors: {}", ambe_fec::measure_dmr_ber(burst));
            }
            Some(_) => Self::parse_data_burst(burst),
            None => {
                // Either a voice burst B..F or a data burst without sync
                let emb = Emb::decode(burst);
                println!("{}", emb);
                println!("AMBE bit errors if voice: {}", ambe_fec::measure_dmr_ber(burst));
            }
        }
    }

    fn parse_data_burst(burst: &Burst) {
        let Some(slot_type) = SlotType::decode(burst) else {
            println!("[!] Slot type carries a reserved data type");
            return;
        };
        println!("{}", slot_type);

        match slot_type.data_type {
            DataType::VoiceLcHeader | DataType::TerminatorWithLc => match FullLc::decode(burst, slot_type.data_type) {
                Some(lc) => println!("{}", lc),
                None => println!("[!] Full LC failed FEC"),
            },
            DataType::VoicePiHeader => match FullLc::decode_pi_header(burst) {
                Some(pi) => println!("PI header: {:02X?}", pi),
                None => println!("[!] PI header failed CRC"),
            },
            DataType::Csbk => match Csbk::decode(burst) {
                Some(csbk) => println!("{}", csbk),
                None => println!("[!] CSBK failed CRC"),
            },
            DataType::DataHeader => match DataHeader::decode(burst) {
                Some(header) => {
                    println!("{}", header);
                    println!("Blocks to follow: {}", header.blocks());
                }
                None => println!("[!] Data header failed CRC"),
            },
            DataType::Idle => println!("Idle burst"),
            other => println!("{} payload is passed through unparsed", other),
        }
    }

    /// Reassemble the embedded LC of voice bursts B to E, given in order
    pub fn parse_voice(bursts: &[Burst]) {
        println!("=== DMR voice superframe ===");
        let mut embedded = EmbeddedData::new();
        let mut complete = false;
        for (i, burst) in bursts.iter().enumerate() {
            let emb = Emb::decode(burst);
            println!("Burst {}: {}", i, emb);
            complete = embedded.add_data(burst, emb.lcss);
        }
        if !complete {
            println!("[!] Embedded LC incomplete or failed FEC");
            return;
        }

        let Some(raw) = embedded.raw_data() else {
            return;
        };
        match embedded.flco() {
            Flco::GpsInfo => match GpsInfo::from_bytes(&raw) {
                Ok(gps) => println!("{}", gps),
                Err(e) => println!("[!] GPS info: {:?}", e),
            },
            flco => {
                if let Some(block) = TalkerAlias::block_index(flco) {
                    let mut alias = TalkerAlias::new();
                    alias.add(block, &raw);
                    println!("Talker alias block {}: {:02X?}", block, &raw[2..]);
                    if let Some(text) = alias.decode() {
                        println!("Alias so far: {:?}", text);
                    }
                } else if let Some(lc) = embedded.lc() {
                    println!("{}", lc);
                }
            }
        }
    }

    pub fn parse_dmrd(buf: &[u8]) {
        println!("=== Homebrew DMRD ===");
        match DmrData::from_dmrd(buf) {
            Ok((data, repeater_id)) => {
                println!("Repeater id: {}", repeater_id);
                println!("{}", data);
                if matches!(data.data_type, DataType::Voice | DataType::VoiceSync) {
                    return;
                }
                Self::parse_burst(&data.data);
            }
            Err(e) => println!("[!] {:?}", e),
        }
    }

    pub fn parse_mmdvm(buf: &[u8]) {
        println!("=== MMDVM frames ===");
        let mut offset = 0;
        while offset < buf.len() {
            let (frame, used) = match MmdvmFrame::from_bytes(&buf[offset..]) {
                Ok(f) => f,
                Err(e) => {
                    println!("[!] at offset {}: {:?}", offset, e);
                    return;
                }
            };
            offset += used;
            println!("{} {:02X?}", frame, frame.payload);

            if let Ok((slot_no, burst)) = frame.to_dmr_burst() {
                println!("Slot {} tag {} flags 0x{:02X}", slot_no, burst[0], burst.get(1).copied().unwrap_or(0));
                if let Some(payload) = burst.get(2..2 + DMR_FRAME_LENGTH_BYTES) {
                    let mut b = [0u8; DMR_FRAME_LENGTH_BYTES];
                    b.copy_from_slice(payload);
                    Self::parse_burst(&b);
                }
            }
        }
    }
}
