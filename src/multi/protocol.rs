//! # Multi Protocol Constants and Types
//!
//! Core definitions for the serial protocol spoken by the multi-protocol RF
//! module, and the read-only module configuration snapshot the encoder works
//! from.

use serde::{Deserialize, Serialize};

/// Normal frame sync byte (protocol type 32-63)
pub const MULTI_SYNC_NORMAL: u8 = 0x54;

/// Failsafe frame sync byte (protocol type 32-63)
pub const MULTI_SYNC_FAILSAFE: u8 = 0x56;

/// Sync bytes are incremented by one for protocol types 0-31
pub const MULTI_SYNC_LOW_TYPE_MAX: u8 = 31;

/// Protocol byte flag: bind request
pub const MULTI_SEND_BIND: u8 = 1 << 7;

/// Protocol byte flag: autobind
pub const MULTI_SEND_AUTOBIND: u8 = 1 << 6;

/// Protocol byte flag: range check (reduced power)
pub const MULTI_SEND_RANGECHECK: u8 = 1 << 5;

/// Protocol type bits in the protocol byte
pub const MULTI_TYPE_MASK: u8 = 0x1F;

/// Reserved protocol number of the spectrum scanner
pub const MULTI_SPECTRUM_PROTOCOL: u8 = 54;

/// Number of channels carried by a frame
pub const MULTI_CHANS: usize = 16;

/// Bits per channel on the wire
pub const MULTI_CHAN_BITS: u8 = 11;

/// Header size (sync + protocol + subtype/id/power + option)
pub const MULTI_HEADER_SIZE: usize = 4;

/// Packed channel payload size (16 channels × 11 bits = 22 bytes)
pub const MULTI_CHANNELS_PAYLOAD_SIZE: usize = 22;

/// Largest frame the encoder emits (header + payload)
pub const MULTI_MAX_FRAME_SIZE: usize = MULTI_HEADER_SIZE + MULTI_CHANNELS_PAYLOAD_SIZE;

/// Setup frame size ('M', 'P', opcode, length, flags)
pub const MULTI_SETUP_FRAME_SIZE: usize = 5;

/// Setup frame opcode: module configuration
pub const MULTI_SETUP_MODULE_CONFIG: u8 = 0x80;

/// Setup flags: inverted serial line
pub const MULTI_CONFIG_INVERSION: u8 = 0x01;

/// Setup flags: multi telemetry format
pub const MULTI_CONFIG_MULTI_TELEMETRY: u8 = 0x02;

/// Setup flags: input synchronisation
pub const MULTI_CONFIG_INPUT_SYNC: u8 = 0x04;

/// Channel value range on the wire (11-bit: 0-2047)
pub const MULTI_CHANNEL_VALUE_MIN: i32 = 0;
pub const MULTI_CHANNEL_VALUE_MAX: i32 = 2047;
pub const MULTI_CHANNEL_VALUE_CENTER: i32 = 1024;

/// Lowest failsafe value on the wire; 0 is reserved for "no pulses"
pub const MULTI_FAILSAFE_VALUE_MIN: i32 = 1;

/// Global PPM center in microseconds
pub const PPM_CENTER: i32 = 1500;

/// Frames per configuration cycle
pub const FRAME_CYCLE_LENGTH: u64 = 1000;

/// Cycle position of the setup frame
pub const SETUP_FRAME_SLOT: u64 = 500;

/// Cycle position of the failsafe frame
pub const FAILSAFE_FRAME_SLOT: u64 = 0;

/// DSM autobind subtype (DSMX 11ms, auto channel count)
pub const DSM_SUBTYPE_AUTO: u8 = 4;

/// FrSky subtypes as stored in the model
pub const FRSKY_SUBTYPE_D16: u8 = 0;
pub const FRSKY_SUBTYPE_D8: u8 = 1;
pub const FRSKY_SUBTYPE_D16_8CH: u8 = 2;
pub const FRSKY_SUBTYPE_V8: u8 = 3;
pub const FRSKY_SUBTYPE_D16_LBT: u8 = 4;
pub const FRSKY_SUBTYPE_D16_LBT_8CH: u8 = 5;

/// Physical module slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleIndex {
    Internal,
    External,
}

impl ModuleIndex {
    /// Number of module slots
    pub const COUNT: usize = 2;

    /// Array index of the slot
    pub fn index(self) -> usize {
        match self {
            ModuleIndex::Internal => 0,
            ModuleIndex::External => 1,
        }
    }
}

/// Operating mode of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ModuleMode {
    #[default]
    Normal = 0,
    Bind = 1,
    RangeCheck = 2,
    SpectrumAnalyser = 3,
}

impl ModuleMode {
    /// Decode the raw tag stored in a [`ModeHandle`](super::scheduler::ModeHandle)
    ///
    /// Unknown tags fall back to `Normal`.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ModuleMode::Bind,
            2 => ModuleMode::RangeCheck,
            3 => ModuleMode::SpectrumAnalyser,
            _ => ModuleMode::Normal,
        }
    }
}

/// What the receiver does when the link is lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailsafeMode {
    #[default]
    NotSet,
    Hold,
    NoPulses,
    Custom,
    Receiver,
}

impl FailsafeMode {
    /// Whether failsafe frames are sent for this mode
    ///
    /// "Not set" and "receiver" leave failsafe to the receiver, so the module
    /// never gets a failsafe frame.
    pub fn sends_failsafe_frames(self) -> bool {
        !matches!(self, FailsafeMode::NotSet | FailsafeMode::Receiver)
    }
}

/// Protocol family, selects the header quirks applied after the generic remap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    Generic,
    Dsm,
    Frsky,
    Afhds2a,
}

/// Built-in protocols, in the radio's internal (0-based) order
///
/// The wire numbering differs: it is 1-based and has two extra slots (FrSkyX
/// and FrSkyV) that the radio folds into `Frsky` subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Protocol {
    Flysky = 0,
    Hubsan,
    Frsky,
    Hisky,
    V2x2,
    Dsm,
    Devo,
    Yd717,
    Kn,
    Symax,
    Slt,
    Cx10,
    Cg023,
    Bayang,
    Esky,
    Mt99xx,
    Mjxq,
    Shenqi,
    Fy326,
    Sfhss,
    J6pro,
    Fq777,
    Assan,
    Hontai,
    Olrs,
    Afhds2a,
    Q2x2,
    Wk2x01,
    Q303,
    Gw008,
    Dm002,
    Cabell,
    Esky150,
    H83d,
    Corona,
    Cflie,
    Hitec,
    Wfly,
    Bugs,
    BugsMini,
    Traxxas,
    Ncc1701,
    E01x,
    V911s,
    Gd00x,
}

impl Protocol {
    /// Every built-in protocol, indexable by internal number
    pub const ALL: [Protocol; 45] = [
        Protocol::Flysky,
        Protocol::Hubsan,
        Protocol::Frsky,
        Protocol::Hisky,
        Protocol::V2x2,
        Protocol::Dsm,
        Protocol::Devo,
        Protocol::Yd717,
        Protocol::Kn,
        Protocol::Symax,
        Protocol::Slt,
        Protocol::Cx10,
        Protocol::Cg023,
        Protocol::Bayang,
        Protocol::Esky,
        Protocol::Mt99xx,
        Protocol::Mjxq,
        Protocol::Shenqi,
        Protocol::Fy326,
        Protocol::Sfhss,
        Protocol::J6pro,
        Protocol::Fq777,
        Protocol::Assan,
        Protocol::Hontai,
        Protocol::Olrs,
        Protocol::Afhds2a,
        Protocol::Q2x2,
        Protocol::Wk2x01,
        Protocol::Q303,
        Protocol::Gw008,
        Protocol::Dm002,
        Protocol::Cabell,
        Protocol::Esky150,
        Protocol::H83d,
        Protocol::Corona,
        Protocol::Cflie,
        Protocol::Hitec,
        Protocol::Wfly,
        Protocol::Bugs,
        Protocol::BugsMini,
        Protocol::Traxxas,
        Protocol::Ncc1701,
        Protocol::E01x,
        Protocol::V911s,
        Protocol::Gd00x,
    ];

    /// Internal 0-based protocol number
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Look up a protocol by internal number
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Header quirk family
    pub fn family(self) -> ProtocolFamily {
        match self {
            Protocol::Dsm => ProtocolFamily::Dsm,
            Protocol::Frsky => ProtocolFamily::Frsky,
            Protocol::Afhds2a => ProtocolFamily::Afhds2a,
            _ => ProtocolFamily::Generic,
        }
    }
}

/// Protocol selected in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolSelector {
    /// One of the radio's known protocols
    Builtin(Protocol),
    /// Raw wire protocol number, sent unmodified
    Custom(u8),
}

/// Read-only snapshot of one module's settings
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleConfiguration {
    pub protocol: ProtocolSelector,
    pub sub_protocol: u8,
    pub option: i8,
    pub autobind: bool,
    pub low_power: bool,
    /// First global channel routed to this module
    pub channels_start: usize,
    pub failsafe_mode: FailsafeMode,
    /// Custom failsafe values, indexed by frame position
    pub failsafe_channels: [i32; MULTI_CHANS],
    /// Only the low 4 bits are sent
    pub model_id: u8,
    /// Ask the module to synchronise to our frame rate
    pub input_sync: bool,
}

impl Default for ModuleConfiguration {
    fn default() -> Self {
        Self {
            protocol: ProtocolSelector::Builtin(Protocol::Flysky),
            sub_protocol: 0,
            option: 0,
            autobind: false,
            low_power: false,
            channels_start: 0,
            failsafe_mode: FailsafeMode::NotSet,
            failsafe_channels: [0; MULTI_CHANS],
            model_id: 0,
            input_sync: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(MULTI_SYNC_NORMAL, 0x54);
        assert_eq!(MULTI_SYNC_FAILSAFE, 0x56);
        assert_eq!(MULTI_CHANS * MULTI_CHAN_BITS as usize, MULTI_CHANNELS_PAYLOAD_SIZE * 8);
        assert_eq!(MULTI_MAX_FRAME_SIZE, 26);
    }

    #[test]
    fn test_protocol_table_is_in_internal_order() {
        for (i, protocol) in Protocol::ALL.iter().enumerate() {
            assert_eq!(protocol.index() as usize, i, "{:?} out of order", protocol);
        }
        assert_eq!(Protocol::from_index(25), Some(Protocol::Afhds2a));
        assert_eq!(Protocol::from_index(45), None);
    }

    #[test]
    fn test_protocol_families() {
        assert_eq!(Protocol::Dsm.family(), ProtocolFamily::Dsm);
        assert_eq!(Protocol::Frsky.family(), ProtocolFamily::Frsky);
        assert_eq!(Protocol::Afhds2a.family(), ProtocolFamily::Afhds2a);
        assert_eq!(Protocol::Bayang.family(), ProtocolFamily::Generic);
    }

    #[test]
    fn test_failsafe_eligibility() {
        assert!(!FailsafeMode::NotSet.sends_failsafe_frames());
        assert!(!FailsafeMode::Receiver.sends_failsafe_frames());
        assert!(FailsafeMode::Hold.sends_failsafe_frames());
        assert!(FailsafeMode::NoPulses.sends_failsafe_frames());
        assert!(FailsafeMode::Custom.sends_failsafe_frames());
    }

    #[test]
    fn test_mode_from_raw() {
        for mode in [
            ModuleMode::Normal,
            ModuleMode::Bind,
            ModuleMode::RangeCheck,
            ModuleMode::SpectrumAnalyser,
        ] {
            assert_eq!(ModuleMode::from_raw(mode as u8), mode);
        }
        assert_eq!(ModuleMode::from_raw(200), ModuleMode::Normal);
    }

    #[test]
    fn test_module_index() {
        assert_eq!(ModuleIndex::Internal.index(), 0);
        assert_eq!(ModuleIndex::External.index(), 1);
    }
}
