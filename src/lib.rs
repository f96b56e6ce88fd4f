//! # Multi Bridge Library
//!
//! Drive a multi-protocol RF module from a host over its serial link.
//!
//! This library provides the frame-cycle encoder (protocol mapping, 11-bit
//! channel packing, header encoding and the 1000-tick frame cycle) together
//! with the serial transport and a JSONL frame trace.

pub mod config;
pub mod error;
pub mod multi;
pub mod serial;
pub mod trace;
