//! Forward error correction and checksums used on the DMR air interface
//!
//! All codecs are pure functions over fixed-size buffers. Decode failures are
//! reported through Option/bool; nothing here logs above trace level.

pub mod ambe_fec;
pub mod bits;
pub mod bptc19696;
pub mod crc;
pub mod golay;
pub mod hamming;
pub mod qr1676;
pub mod reed_solomon;
pub mod rs129;
pub mod trellis;
