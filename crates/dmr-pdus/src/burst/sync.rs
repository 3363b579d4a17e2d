use dmr_core::defines::*;

/// Maximum number of differing bits for a sync pattern to be recognised
const MAX_SYNC_ERRORS: u32 = 4;

/// The 48-bit sync word in the centre of a burst, ETSI TS 102 361-1 Clause 9.1.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPattern {
    BsAudio,
    BsData,
    MsAudio,
    MsData,
    DirectSlot1Audio,
    DirectSlot1Data,
    DirectSlot2Audio,
    DirectSlot2Data,
}

impl SyncPattern {
    const ALL: [SyncPattern; 8] = [
        SyncPattern::BsAudio,
        SyncPattern::BsData,
        SyncPattern::MsAudio,
        SyncPattern::MsData,
        SyncPattern::DirectSlot1Audio,
        SyncPattern::DirectSlot1Data,
        SyncPattern::DirectSlot2Audio,
        SyncPattern::DirectSlot2Data,
    ];

    pub fn bytes(self) -> &'static [u8; DMR_SYNC_LENGTH_BYTES] {
        match self {
            SyncPattern::BsAudio => &BS_SOURCED_AUDIO_SYNC,
            SyncPattern::BsData => &BS_SOURCED_DATA_SYNC,
            SyncPattern::MsAudio => &MS_SOURCED_AUDIO_SYNC,
            SyncPattern::MsData => &MS_SOURCED_DATA_SYNC,
            SyncPattern::DirectSlot1Audio => &DIRECT_SLOT1_AUDIO_SYNC,
            SyncPattern::DirectSlot1Data => &DIRECT_SLOT1_DATA_SYNC,
            SyncPattern::DirectSlot2Audio => &DIRECT_SLOT2_AUDIO_SYNC,
            SyncPattern::DirectSlot2Data => &DIRECT_SLOT2_DATA_SYNC,
        }
    }

    pub fn is_audio(self) -> bool {
        matches!(self, SyncPattern::BsAudio | SyncPattern::MsAudio | SyncPattern::DirectSlot1Audio | SyncPattern::DirectSlot2Audio)
    }

    /// Finds the closest sync pattern, tolerating a few bit errors
    pub fn detect(burst: &[u8; DMR_FRAME_LENGTH_BYTES]) -> Option<SyncPattern> {
        let centre = &burst[DMR_SYNC_OFFSET..DMR_SYNC_OFFSET + DMR_SYNC_LENGTH_BYTES];
        Self::ALL
            .iter()
            .map(|p| {
                let errs: u32 = centre
                    .iter()
                    .zip(p.bytes().iter())
                    .zip(SYNC_MASK.iter())
                    .map(|((c, s), m)| ((c ^ s) & m).count_ones())
                    .sum();
                (*p, errs)
            })
            .filter(|(_, errs)| *errs <= MAX_SYNC_ERRORS)
            .min_by_key(|(_, errs)| *errs)
            .map(|(p, _)| p)
    }
}

fn write_sync(burst: &mut [u8; DMR_FRAME_LENGTH_BYTES], pattern: SyncPattern) {
    let bytes = pattern.bytes();
    for i in 0..DMR_SYNC_LENGTH_BYTES {
        let b = &mut burst[DMR_SYNC_OFFSET + i];
        *b = (*b & !SYNC_MASK[i]) | bytes[i];
    }
}

/// Writes the data sync. A duplex repeater transmits as a base station, a simplex
/// hotspot as a mobile.
pub fn add_data_sync(burst: &mut [u8; DMR_FRAME_LENGTH_BYTES], duplex: bool) {
    write_sync(burst, if duplex { SyncPattern::BsData } else { SyncPattern::MsData });
}

pub fn add_audio_sync(burst: &mut [u8; DMR_FRAME_LENGTH_BYTES], duplex: bool) {
    write_sync(burst, if duplex { SyncPattern::BsAudio } else { SyncPattern::MsAudio });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_round_trip() {
        let mut burst = DMR_IDLE_DATA;
        add_audio_sync(&mut burst, true);
        assert_eq!(SyncPattern::detect(&burst), Some(SyncPattern::BsAudio));
        add_data_sync(&mut burst, false);
        assert_eq!(SyncPattern::detect(&burst), Some(SyncPattern::MsData));
        // Neighbouring slot type / EMB nibbles stay as they were
        assert_eq!(burst[13] & 0xF0, DMR_IDLE_DATA[13] & 0xF0);
        assert_eq!(burst[19] & 0x0F, DMR_IDLE_DATA[19] & 0x0F);
    }

    #[test]
    fn test_detect_with_errors() {
        let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
        add_data_sync(&mut burst, true);
        burst[15] ^= 0x81;
        burst[17] ^= 0x10;
        assert_eq!(SyncPattern::detect(&burst), Some(SyncPattern::BsData));
        assert!(!SyncPattern::BsData.is_audio());
    }

    #[test]
    fn test_no_sync() {
        let burst = [0u8; DMR_FRAME_LENGTH_BYTES];
        assert_eq!(SyncPattern::detect(&burst), None);
    }
}
