//! Configuration management for the MMDVM DMR host
//!
//! This crate provides configuration loading and parsing:
//! - TOML configuration file parsing
//! - DMR, access control and per-slot configuration structures
//! - Modem and network transport configuration

pub mod dmr_config;
pub mod dmr_config_modem;
pub mod dmr_config_network;
pub mod toml_config;

pub use dmr_config::*;
pub use toml_config::*;
