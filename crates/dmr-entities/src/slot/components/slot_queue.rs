use std::collections::VecDeque;

use dmr_core::SlotNo;
use dmr_core::defines::{DMR_FRAME_LENGTH_BYTES, MODEM_BURST_LEN, Tag};

/// Bursts held back for the modem, enough for a jitter buffer plus hang time
pub const SLOT_QUEUE_BURSTS: usize = 140;

/// Outbound bursts of one slot, [tag, flags, 33 bytes] each
#[derive(Debug)]
pub struct SlotQueue {
    slot_no: SlotNo,
    bursts: VecDeque<[u8; MODEM_BURST_LEN]>,
}

impl SlotQueue {
    pub fn new(slot_no: SlotNo) -> Self {
        Self { slot_no, bursts: VecDeque::with_capacity(SLOT_QUEUE_BURSTS) }
    }

    /// Appends a burst, dropping it when the queue is full
    pub fn push(&mut self, tag: Tag, burst: &[u8; DMR_FRAME_LENGTH_BYTES]) -> bool {
        if self.bursts.len() >= SLOT_QUEUE_BURSTS {
            tracing::warn!(slot = self.slot_no, "overflow in the slot queue, dropping {:?} burst", tag);
            return false;
        }
        let mut entry = [0u8; MODEM_BURST_LEN];
        entry[0] = tag.into_raw() as u8;
        entry[2..].copy_from_slice(burst);
        self.bursts.push_back(entry);
        true
    }

    pub fn pop(&mut self) -> Option<[u8; MODEM_BURST_LEN]> {
        self.bursts.pop_front()
    }

    pub fn clear(&mut self) {
        self.bursts.clear();
    }

    pub fn len(&self) -> usize {
        self.bursts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use dmr_core::defines::DMR_IDLE_DATA;

    use super::*;

    #[test]
    fn test_fifo_and_overflow() {
        let mut queue = SlotQueue::new(1);
        let mut burst = DMR_IDLE_DATA;
        for i in 0..SLOT_QUEUE_BURSTS {
            burst[0] = i as u8;
            assert!(queue.push(Tag::Data, &burst));
        }
        assert!(!queue.push(Tag::Eot, &burst));
        assert_eq!(queue.len(), SLOT_QUEUE_BURSTS);

        let first = queue.pop().unwrap();
        assert_eq!(first[0], Tag::Data.into_raw() as u8);
        assert_eq!(first[1], 0);
        assert_eq!(first[2], 0);
        assert_eq!(&first[3..], &DMR_IDLE_DATA[1..]);
        assert_eq!(queue.pop().unwrap()[2], 1);
    }
}
