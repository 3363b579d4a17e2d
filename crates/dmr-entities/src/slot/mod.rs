pub mod components;
pub mod dmr_slot;
