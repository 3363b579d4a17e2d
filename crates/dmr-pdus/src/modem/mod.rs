pub mod mmdvm_command;
pub mod mmdvm_frame;
