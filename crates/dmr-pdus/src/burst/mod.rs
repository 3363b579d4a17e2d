pub mod emb;
pub mod short_lc;
pub mod slot_type;
pub mod sync;
