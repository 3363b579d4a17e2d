//! Core utilities for the MMDVM DMR host
//!
//! This crate provides fundamental types and utilities used across the workspace:
//! - BitBuffer for field-level payload layout
//! - CodecErr and the parse helper macros
//! - DMR air-interface constants and enums (data types, FLCO, modem tags)
//! - Millisecond Timer driven by the host poll loop
//! - Logging setup

pub mod bitbuffer;
pub mod codec_error;
pub mod debug;
pub mod defines;
pub mod timer;

// Re-export commonly used items
pub use bitbuffer::BitBuffer;
pub use codec_error::CodecErr;
pub use defines::*;
pub use timer::Timer;

/// Version string shown in the startup banner and the log
pub const STACK_VERSION: &str = const_format::concatcp!(env!("CARGO_PKG_VERSION"), "-", git_version::git_version!(fallback = "unknown"));

/// DMR timeslot number, 1 or 2
pub type SlotNo = u8;
