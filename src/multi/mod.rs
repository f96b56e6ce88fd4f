//! # Multi Protocol Module
//!
//! Frame encoder for the serial protocol of the multi-protocol RF module.
//!
//! This module handles:
//! - Mapping radio protocols to the module's protocol numbers
//! - Header encoding (sync, protocol, subtype/id/power, option)
//! - Channel packing (16 channels, 11-bit resolution)
//! - The 1000-tick frame cycle (setup, failsafe and channel frames)

pub mod protocol;
pub mod mapping;
pub mod packer;
pub mod channels;
pub mod header;
pub mod frame;
pub mod scheduler;
