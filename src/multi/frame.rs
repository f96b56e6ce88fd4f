//! # Wire Frames
//!
//! Fixed-capacity frame buffer produced once per pulse tick.

use heapless::Vec;
use serde::Serialize;

use super::packer::unpack_values;
use super::protocol::*;

/// Kind of frame emitted on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// Module configuration ('M', 'P', ...)
    Setup,
    /// Header with failsafe sync, then failsafe values
    Failsafe,
    /// Header, then live channel values
    Normal,
}

impl FrameKind {
    /// Pick the frame kind for a tick counter
    ///
    /// # Arguments
    ///
    /// * `counter` - Tick counter after advancing
    /// * `failsafe_mode` - Module failsafe mode
    ///
    /// # Examples
    ///
    /// ```
    /// use multi_bridge::multi::frame::FrameKind;
    /// use multi_bridge::multi::protocol::FailsafeMode;
    ///
    /// assert_eq!(FrameKind::select(1500, FailsafeMode::NotSet), FrameKind::Setup);
    /// assert_eq!(FrameKind::select(2000, FailsafeMode::Hold), FrameKind::Failsafe);
    /// assert_eq!(FrameKind::select(2000, FailsafeMode::Receiver), FrameKind::Normal);
    /// ```
    pub fn select(counter: u64, failsafe_mode: FailsafeMode) -> Self {
        let slot = counter % FRAME_CYCLE_LENGTH;
        if slot == SETUP_FRAME_SLOT {
            FrameKind::Setup
        } else if slot == FAILSAFE_FRAME_SLOT && failsafe_mode.sends_failsafe_frames() {
            FrameKind::Failsafe
        } else {
            FrameKind::Normal
        }
    }
}

/// One frame for one module on one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    kind: FrameKind,
    bytes: Vec<u8, MULTI_MAX_FRAME_SIZE>,
}

impl WireFrame {
    pub(crate) fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            bytes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, byte: u8) {
        let pushed = self.bytes.push(byte);
        debug_assert!(pushed.is_ok(), "wire frame overflow");
    }

    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Channel payload following the header, if the frame carries one
    pub fn payload(&self) -> Option<&[u8]> {
        match self.kind {
            FrameKind::Setup => None,
            _ if self.bytes.len() > MULTI_HEADER_SIZE => Some(&self.bytes[MULTI_HEADER_SIZE..]),
            _ => None,
        }
    }

    /// Decode the packed channel values of the frame
    pub fn channels(&self) -> Option<[u16; MULTI_CHANS]> {
        self.payload()
            .and_then(|payload| unpack_values(payload, MULTI_CHAN_BITS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_setup_slot() {
        for cycle in 0..5u64 {
            let counter = cycle * 1000 + 500;
            assert_eq!(FrameKind::select(counter, FailsafeMode::NotSet), FrameKind::Setup);
            assert_eq!(FrameKind::select(counter, FailsafeMode::Hold), FrameKind::Setup);
        }
    }

    #[test]
    fn test_select_failsafe_slot_depends_on_mode() {
        for counter in [0u64, 1000, 2000, 7_000_000] {
            assert_eq!(FrameKind::select(counter, FailsafeMode::Hold), FrameKind::Failsafe);
            assert_eq!(FrameKind::select(counter, FailsafeMode::NoPulses), FrameKind::Failsafe);
            assert_eq!(FrameKind::select(counter, FailsafeMode::Custom), FrameKind::Failsafe);
            assert_eq!(FrameKind::select(counter, FailsafeMode::NotSet), FrameKind::Normal);
            assert_eq!(FrameKind::select(counter, FailsafeMode::Receiver), FrameKind::Normal);
        }
    }

    #[test]
    fn test_select_other_slots_are_normal() {
        for counter in [1u64, 499, 501, 999, 1001, 1499] {
            assert_eq!(FrameKind::select(counter, FailsafeMode::Hold), FrameKind::Normal);
        }
    }

    #[test]
    fn test_frame_payload() {
        let mut frame = WireFrame::new(FrameKind::Normal);
        frame.extend(&[0x55, 1, 0, 0]);
        assert!(frame.payload().is_none());

        frame.extend(&[0u8; MULTI_CHANNELS_PAYLOAD_SIZE]);
        assert_eq!(frame.len(), MULTI_MAX_FRAME_SIZE);
        assert_eq!(frame.channels(), Some([0u16; MULTI_CHANS]));

        let mut setup = WireFrame::new(FrameKind::Setup);
        setup.extend(&[b'M', b'P', 0x80, 1, 7]);
        assert!(setup.payload().is_none());
        assert!(setup.channels().is_none());
    }
}
