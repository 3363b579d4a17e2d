pub mod embedded_data;
pub mod full_lc;
pub mod gps;
pub mod link_control;
pub mod talker_alias;
