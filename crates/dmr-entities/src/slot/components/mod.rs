pub mod call_stats;
pub mod slot_queue;
