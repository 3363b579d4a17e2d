mod common;

use dmr_core::debug;
use dmr_core::defines::*;
use dmr_entities::{NetworkFrame, RfState};
use dmr_pdus::burst::short_lc::{ActivityType, SlotActivity};
use dmr_pdus::burst::slot_type::SlotType;
use dmr_pdus::data_header::pdus::data_header::DataHeaderBody;
use dmr_pdus::{Csbk, CsbkBody, DataHeader, FullLc, Lc};

use common::*;

fn group_call(dst_id: u32) -> Lc {
    Lc::new(Flco::Group, SRC_ID, dst_id)
}

fn data_frames(frames: &[NetworkFrame]) -> Vec<&dmr_pdus::DmrData> {
    frames
        .iter()
        .filter_map(|f| match f {
            NetworkFrame::Data(d) => Some(d),
            _ => None,
        })
        .collect()
}

#[test]
fn test_rf_header_starts_call() {
    debug::setup_logging_verbose();
    let mut slot = new_slot(default_test_config(), 1);
    let lc = group_call(9);

    assert!(slot.write_modem(&rf_header(&lc)));
    assert_eq!(slot.rf_state(), RfState::Audio);
    assert_eq!(slot.rf_lc(), Some(&lc));

    let queued = drain_modem(&mut slot);
    assert_eq!(queued.len(), 3, "duplex repeats the header");
    for entry in &queued {
        assert_eq!(entry[0], Tag::Data.into_raw() as u8);
        assert_eq!(FullLc::decode(&payload(entry), DataType::VoiceLcHeader), Some(lc));
    }

    let frames = drain_network(&mut slot);
    assert_eq!(frames.len(), 1);
    let NetworkFrame::Data(data) = &frames[0] else {
        panic!("expected a data frame, got {:?}", frames[0]);
    };
    assert_eq!(data.data_type, DataType::VoiceLcHeader);
    assert_eq!((data.src_id, data.dst_id, data.flco), (SRC_ID, 9, Flco::Group));
    assert_eq!(data.seq_no, 0);

    let activity = slot.take_activity_change().unwrap();
    assert_eq!(activity, SlotActivity { activity: ActivityType::Voice, flco: Flco::Group, id: 9 });

    // A repeated header mid call changes nothing
    assert!(slot.write_modem(&rf_header(&lc)));
    assert!(drain_modem(&mut slot).is_empty());
}

#[test]
fn test_rf_voice_superframe_and_terminator() {
    debug::setup_logging_verbose();
    let mut slot = new_slot(default_test_config(), 1);
    let lc = group_call(2350);

    assert!(slot.write_modem(&rf_header(&lc)));
    for n in 0..6 {
        assert!(slot.write_modem(&rf_voice(&lc, n)), "voice burst {}", n);
    }
    assert!(slot.write_modem(&rf_terminator(&lc)));
    assert_eq!(slot.rf_state(), RfState::Listening);

    let queued = drain_modem(&mut slot);
    assert_eq!(queued.len(), 3 + 6 + 8);
    assert!(queued[9..].iter().all(|e| e[0] == Tag::Eot.into_raw() as u8));
    assert_eq!(FullLc::decode(&payload(&queued[16]), DataType::TerminatorWithLc), Some(lc));

    let frames = drain_network(&mut slot);
    let data = data_frames(&frames);
    assert_eq!(data.len(), 8);
    assert_eq!(data[1].data_type, DataType::VoiceSync);
    assert_eq!(data[6].data_type, DataType::Voice);
    assert_eq!(data[6].n, 5);
    assert_eq!(data[7].data_type, DataType::TerminatorWithLc);
    let seq: Vec<u8> = data.iter().map(|d| d.seq_no).collect();
    assert_eq!(seq, (0..8).collect::<Vec<u8>>());
    assert!(data.windows(2).all(|w| w[0].stream_id == w[1].stream_id));

    assert_eq!(slot.activity(), SlotActivity::default());
}

#[test]
fn test_rf_out_of_sequence_voice_is_dropped() {
    let mut slot = new_slot(default_test_config(), 1);
    let lc = group_call(9);
    slot.write_modem(&rf_header(&lc));
    slot.write_modem(&rf_voice(&lc, 0));
    drain_modem(&mut slot);

    assert!(!slot.write_modem(&rf_voice(&lc, 2)), "n=1 is expected");
    assert!(slot.write_modem(&rf_voice(&lc, 1)));
    assert_eq!(drain_modem(&mut slot).len(), 1);
}

#[test]
fn test_rf_rejected_source_until_terminator() {
    debug::setup_logging_verbose();
    let mut config = default_test_config();
    config.dmr.src_blacklist = vec![SRC_ID];
    let mut slot = new_slot(config, 1);
    let lc = group_call(9);

    assert!(!slot.write_modem(&rf_header(&lc)));
    assert_eq!(slot.rf_state(), RfState::Rejected);
    assert!(!slot.write_modem(&rf_voice(&lc, 0)));
    assert!(!slot.write_modem(&rf_voice(&lc, 1)));
    assert_eq!(slot.rf_state(), RfState::Rejected);

    assert!(!slot.write_modem(&rf_terminator(&lc)));
    assert_eq!(slot.rf_state(), RfState::Listening);
    assert!(drain_modem(&mut slot).is_empty());
    assert!(drain_network(&mut slot).is_empty());
    assert!(slot.take_activity_change().is_none());
}

#[test]
fn test_rf_rejected_talkgroup() {
    let mut config = default_test_config();
    config.dmr.slot2.rf_blacklist = vec![666];
    let mut slot = new_slot(config, 2);

    assert!(!slot.write_modem(&rf_header(&group_call(666))));
    assert_eq!(slot.rf_state(), RfState::Rejected);

    // Lost sync also ends the rejected transmission
    assert!(!slot.write_modem(&[Tag::Lost.into_raw() as u8]));
    assert_eq!(slot.rf_state(), RfState::Listening);

    // Private calls to the same id are not subject to the talkgroup lists
    assert!(slot.write_modem(&rf_header(&Lc::new(Flco::UserUser, SRC_ID, 666))));
}

#[test]
fn test_rf_late_entry() {
    debug::setup_logging_verbose();
    let mut slot = new_slot(default_test_config(), 1);
    let lc = group_call(91);

    for n in 1..4 {
        assert!(!slot.write_modem(&rf_voice(&lc, n)));
        assert_eq!(slot.rf_state(), RfState::LateEntry);
    }
    assert!(slot.write_modem(&rf_voice(&lc, 4)));
    assert_eq!(slot.rf_state(), RfState::Audio);
    assert_eq!(slot.rf_lc(), Some(&lc));

    let queued = drain_modem(&mut slot);
    assert_eq!(queued.len(), 3 + 1);
    assert_eq!(FullLc::decode(&payload(&queued[0]), DataType::VoiceLcHeader), Some(lc));

    let frames = drain_network(&mut slot);
    let data = data_frames(&frames);
    assert_eq!(data.len(), 2);
    assert_eq!(data[0].data_type, DataType::VoiceLcHeader);
    assert_eq!(data[1].data_type, DataType::Voice);
    assert_eq!(data[1].n, 4);

    // The call carries on from the burst that completed the LC
    assert!(slot.write_modem(&rf_voice(&lc, 5)));
}

#[test]
fn test_rf_lost_ends_call_with_terminators() {
    let mut slot = new_slot(default_test_config(), 1);
    let lc = group_call(9);
    slot.write_modem(&rf_header(&lc));
    drain_modem(&mut slot);

    slot.write_modem(&[Tag::Lost.into_raw() as u8]);
    assert_eq!(slot.rf_state(), RfState::Listening);
    let queued = drain_modem(&mut slot);
    assert_eq!(queued.len(), 8);
    assert!(queued.iter().all(|e| e[0] == Tag::Eot.into_raw() as u8));
}

#[test]
fn test_rf_timeout_sends_idle() {
    debug::setup_logging_verbose();
    let mut config = default_test_config();
    config.dmr.timeout_secs = 1;
    let mut slot = new_slot(config, 1);
    let lc = group_call(9);

    slot.write_modem(&rf_header(&lc));
    drain_modem(&mut slot);
    drain_network(&mut slot);

    slot.clock(1100);
    assert!(slot.write_modem(&rf_voice(&lc, 0)));
    let queued = drain_modem(&mut slot);
    assert_eq!(queued.len(), 1);
    let slot_type = SlotType::decode(&payload(&queued[0])).unwrap();
    assert_eq!(slot_type.data_type, DataType::Idle);
    assert!(drain_network(&mut slot).is_empty(), "nothing goes to the network after a timeout");

    assert!(slot.write_modem(&rf_terminator(&lc)));
    assert!(drain_modem(&mut slot).is_empty(), "no terminators after a timeout");
    assert_eq!(slot.rf_state(), RfState::Listening);
}

#[test]
fn test_rf_simplex_does_not_repeat() {
    let mut config = default_test_config();
    config.dmr.duplex = false;
    let mut slot = new_slot(config, 1);
    let lc = group_call(9);

    slot.write_modem(&rf_header(&lc));
    slot.write_modem(&rf_voice(&lc, 0));
    slot.write_modem(&rf_terminator(&lc));
    assert!(drain_modem(&mut slot).is_empty());
    assert_eq!(drain_network(&mut slot).len(), 3);
}

#[test]
fn test_rf_data_transfer() {
    debug::setup_logging_verbose();
    let mut slot = new_slot(default_test_config(), 1);
    let header = DataHeader::new(true, false, 9, SRC_ID, DataHeaderBody::Unconfirmed { full_message: true, blocks: 2 });

    assert!(slot.write_modem(&rf_data_header(&header)));
    assert_eq!(slot.rf_state(), RfState::Data);
    assert_eq!(slot.take_activity_change().map(|a| a.activity), Some(ActivityType::Data));

    assert!(slot.write_modem(&rf_rate12_block(&[0x11; 12])));
    assert_eq!(slot.rf_state(), RfState::Data);
    assert!(slot.write_modem(&rf_rate12_block(&[0x22; 12])));
    assert_eq!(slot.rf_state(), RfState::Listening);

    let queued = drain_modem(&mut slot);
    assert_eq!(queued.len(), 3);
    assert_eq!(queued[1][0], Tag::Data.into_raw() as u8);
    assert_eq!(queued[2][0], Tag::Eot.into_raw() as u8);
    assert_eq!(dmr_fec::bptc19696::decode(&payload(&queued[2])), Some([0x22; 12]));

    let frames = drain_network(&mut slot);
    let data = data_frames(&frames);
    assert_eq!(data.len(), 3);
    assert_eq!(data[0].data_type, DataType::DataHeader);
    assert_eq!(data[2].data_type, DataType::Rate12Data);

    // A block with no transfer running is ignored
    assert!(!slot.write_modem(&rf_rate12_block(&[0x33; 12])));
}

#[test]
fn test_rf_csbk() {
    debug::setup_logging_verbose();
    let mut slot = new_slot(default_test_config(), 1);

    let preamble = Csbk::new(CsbkBody::Preamble { group: true, data_content: true, cbf: 3, dst_id: 9, src_id: SRC_ID });
    assert!(slot.write_modem(&rf_csbk(&preamble)));
    assert_eq!(drain_modem(&mut slot).len(), 1);

    let frames = drain_network(&mut slot);
    let data = data_frames(&frames);
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].data_type, DataType::Csbk);
    assert_eq!((data[0].src_id, data[0].dst_id), (SRC_ID, 9));
    assert_eq!(slot.take_activity_change().map(|a| (a.activity, a.id)), Some((ActivityType::Data, 9)));

    // Downlink activate is a base station CSBK, never relayed
    let bs = Csbk::new(CsbkBody::BsDownlinkActivate { bs_id: REPEATER_ID, src_id: SRC_ID });
    assert!(!slot.write_modem(&rf_csbk(&bs)));
    assert!(drain_network(&mut slot).is_empty());
}

#[test]
fn test_rf_talker_alias_is_forwarded() {
    debug::setup_logging_verbose();
    let mut config = default_test_config();
    config.dmr.dump_talker_alias = true;
    let mut slot = new_slot(config, 1);
    let lc = group_call(9);
    // ISO 8 bit, 4 characters
    let alias = Lc::from_bytes(&[0x04, 0x00, 0x48, b'P', b'D', b'0', b'A', 0, 0]).unwrap();

    slot.write_modem(&rf_header(&lc));
    slot.write_modem(&rf_voice(&lc, 0));
    for n in 1..=4 {
        assert!(slot.write_modem(&rf_voice(&alias, n)));
    }

    let frames = drain_network(&mut slot);
    let ta: Vec<&NetworkFrame> = frames.iter().filter(|f| matches!(f, NetworkFrame::TalkerAlias { .. })).collect();
    assert_eq!(ta.len(), 1);
    let NetworkFrame::TalkerAlias { slot_no, src_id, block, raw } = ta[0] else {
        unreachable!();
    };
    assert_eq!((*slot_no, *src_id, *block), (1, SRC_ID, 0));
    assert_eq!(&raw[3..7], b"PD0A");
}
