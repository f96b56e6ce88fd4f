//! # Frame Header Encoder
//!
//! Builds the 4-byte header that precedes every channel frame, and the fixed
//! module configuration (setup) frame.
//!
//! ## Header Layout
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | Sync: 0x54/0x56 (normal/failsafe), +1 for protocol 0-31 |
//! | 1 | bind (7) \| autobind (6) \| range check (5) \| protocol (4:0) |
//! | 2 | low power (7) \| subtype (6:4) \| model id (3:0) |
//! | 3 | Option |

use super::mapping::{self, WireProtocol};
use super::protocol::*;

/// Header sent while the module scans the spectrum
pub const SPECTRUM_HEADER: [u8; MULTI_HEADER_SIZE] = [MULTI_SYNC_NORMAL, MULTI_SPECTRUM_PROTOCOL, 0, 0];

/// Mode flags for the protocol byte
///
/// Bind wins over range check; both cannot be signalled at once.
pub fn mode_flags(mode: ModuleMode) -> u8 {
    match mode {
        ModuleMode::Bind => MULTI_SEND_BIND,
        ModuleMode::RangeCheck => MULTI_SEND_RANGECHECK,
        _ => 0,
    }
}

/// Sync byte for a frame
///
/// Computed from the final (remapped) wire protocol number.
pub fn sync_byte(wire_type: u8, failsafe: bool) -> u8 {
    let base = if failsafe { MULTI_SYNC_FAILSAFE } else { MULTI_SYNC_NORMAL };
    if wire_type <= MULTI_SYNC_LOW_TYPE_MAX {
        base + 1
    } else {
        base
    }
}

/// Assemble header bytes from resolved wire protocol fields
pub fn header_bytes(
    wire: &WireProtocol,
    config: &ModuleConfiguration,
    mode: ModuleMode,
    failsafe: bool,
) -> [u8; MULTI_HEADER_SIZE] {
    let mut proto_byte = mode_flags(mode) | (wire.wire_type & MULTI_TYPE_MASK);
    if wire.autobind_bit {
        proto_byte |= MULTI_SEND_AUTOBIND;
    }

    let id_byte = (config.model_id & 0x0F)
        | ((wire.subtype & 0x07) << 4)
        | (u8::from(config.low_power) << 7);

    [sync_byte(wire.wire_type, failsafe), proto_byte, id_byte, wire.option]
}

/// Encode the frame header for a module
///
/// # Arguments
///
/// * `config` - Module configuration snapshot
/// * `mode` - Current module mode
/// * `failsafe` - Whether this header precedes failsafe values
/// * `channel_count` - Channels routed to the module
///
/// # Examples
///
/// ```
/// use multi_bridge::multi::header::encode_header;
/// use multi_bridge::multi::protocol::{ModuleConfiguration, ModuleMode};
///
/// let header = encode_header(&ModuleConfiguration::default(), ModuleMode::SpectrumAnalyser, false, 16);
/// assert_eq!(header, [0x54, 54, 0, 0]);
/// ```
pub fn encode_header(
    config: &ModuleConfiguration,
    mode: ModuleMode,
    failsafe: bool,
    channel_count: u8,
) -> [u8; MULTI_HEADER_SIZE] {
    if mode == ModuleMode::SpectrumAnalyser {
        return SPECTRUM_HEADER;
    }

    let wire = mapping::resolve(config, mode, channel_count);
    header_bytes(&wire, config, mode, failsafe)
}

/// Encode the module configuration frame
///
/// Older module firmware discards this as an invalid frame.
pub fn encode_setup_frame(input_sync: bool) -> [u8; MULTI_SETUP_FRAME_SIZE] {
    let mut flags = MULTI_CONFIG_INVERSION | MULTI_CONFIG_MULTI_TELEMETRY;
    if input_sync {
        flags |= MULTI_CONFIG_INPUT_SYNC;
    }

    [b'M', b'P', MULTI_SETUP_MODULE_CONFIG, 1, flags]
}
