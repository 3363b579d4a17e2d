pub mod dmr_data;
pub mod homebrew;
