//! # Frame Cycle Scheduler
//!
//! Per-module state machine deciding which frame to emit on each pulse tick.
//!
//! Every tick advances the module's counter by one. Within each cycle of 1000
//! ticks, tick 500 carries the module configuration and tick 0 carries the
//! failsafe values (when the model defines any). All other ticks carry live
//! channels.
//!
//! ## Usage
//!
//! ```
//! use multi_bridge::multi::channels::ChannelSource;
//! use multi_bridge::multi::frame::FrameKind;
//! use multi_bridge::multi::protocol::{ModuleConfiguration, ModuleIndex};
//! use multi_bridge::multi::scheduler::ModuleState;
//!
//! struct Centered;
//!
//! impl ChannelSource for Centered {
//!     fn channel_output(&self, _channel: usize) -> i32 { 0 }
//!     fn ppm_center(&self, _channel: usize) -> i32 { 1500 }
//!     fn channel_count(&self, _module: ModuleIndex) -> u8 { 16 }
//! }
//!
//! let mut state = ModuleState::new(ModuleIndex::External);
//! let frame = state.next_frame(&ModuleConfiguration::default(), &Centered);
//! assert_eq!(frame.kind(), FrameKind::Normal);
//! assert_eq!(frame.channels(), Some([1024; 16]));
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::trace;

use super::channels::{failsafe_channels, normal_channels, ChannelSource};
use super::frame::{FrameKind, WireFrame};
use super::header::{encode_header, encode_setup_frame};
use super::packer::pack_values;
use super::protocol::*;
use crate::error::Result;

/// Shared module mode tag
///
/// The bind/menu side keeps a clone and writes it between ticks; the encoder
/// loads it once per tick.
#[derive(Debug, Clone, Default)]
pub struct ModeHandle(Arc<AtomicU8>);

impl ModeHandle {
    pub fn new(mode: ModuleMode) -> Self {
        Self(Arc::new(AtomicU8::new(mode as u8)))
    }

    pub fn get(&self) -> ModuleMode {
        ModuleMode::from_raw(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, mode: ModuleMode) {
        self.0.store(mode as u8, Ordering::Release);
    }
}

/// Transport write primitive for encoded frames
///
/// Implementations must not block. A frame that cannot be accepted is
/// rejected as a whole.
pub trait FrameSink {
    fn send_frame(&mut self, module: ModuleIndex, frame: &WireFrame) -> Result<()>;
}

/// Runtime state of one module slot
#[derive(Debug, Clone)]
pub struct ModuleState {
    module: ModuleIndex,
    counter: u64,
    mode: ModeHandle,
}

impl ModuleState {
    /// Create state for a freshly activated module slot
    pub fn new(module: ModuleIndex) -> Self {
        Self::with_mode(module, ModeHandle::default())
    }

    /// Create state sharing an existing mode handle
    pub fn with_mode(module: ModuleIndex, mode: ModeHandle) -> Self {
        Self {
            module,
            counter: 0,
            mode,
        }
    }

    pub fn module(&self) -> ModuleIndex {
        self.module
    }

    /// Ticks encoded so far
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Handle for writing the mode from another control path
    pub fn mode_handle(&self) -> ModeHandle {
        self.mode.clone()
    }

    pub fn mode(&self) -> ModuleMode {
        self.mode.get()
    }

    /// Encode the frame for the next tick
    ///
    /// Advances the counter by one regardless of the frame kind.
    pub fn next_frame<S: ChannelSource + ?Sized>(
        &mut self,
        config: &ModuleConfiguration,
        source: &S,
    ) -> WireFrame {
        self.counter = self.counter.wrapping_add(1);
        let kind = FrameKind::select(self.counter, config.failsafe_mode);
        let mode = self.mode.get();

        trace!(module = ?self.module, counter = self.counter, ?kind, ?mode, "Encoding frame");

        let mut frame = WireFrame::new(kind);
        match kind {
            FrameKind::Setup => frame.extend(&encode_setup_frame(config.input_sync)),
            FrameKind::Failsafe | FrameKind::Normal => {
                let failsafe = kind == FrameKind::Failsafe;
                let channel_count = source.channel_count(self.module);
                frame.extend(&encode_header(config, mode, failsafe, channel_count));

                // The spectrum scanner takes no channel data
                if mode != ModuleMode::SpectrumAnalyser {
                    let values = if failsafe {
                        failsafe_channels(config, source)
                    } else {
                        normal_channels(config, source)
                    };
                    pack_values(values.iter().map(|&v| u32::from(v)), MULTI_CHAN_BITS, |b| {
                        frame.push(b)
                    });
                }
            }
        }

        frame
    }

    /// Encode the next frame and hand it to the sink
    ///
    /// A rejected frame is dropped; the next tick starts a fresh frame.
    ///
    /// # Errors
    ///
    /// Returns the sink's error when it refuses the frame
    pub fn setup_pulses<S, K>(&mut self, config: &ModuleConfiguration, source: &S, sink: &mut K) -> Result<()>
    where
        S: ChannelSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let frame = self.next_frame(config, source);
        sink.send_frame(self.module, &frame)
    }
}

/// State for both module slots
#[derive(Debug, Clone)]
pub struct ModuleSlots {
    slots: [ModuleState; ModuleIndex::COUNT],
}

impl Default for ModuleSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleSlots {
    pub fn new() -> Self {
        Self {
            slots: [
                ModuleState::new(ModuleIndex::Internal),
                ModuleState::new(ModuleIndex::External),
            ],
        }
    }

    pub fn get(&self, module: ModuleIndex) -> &ModuleState {
        &self.slots[module.index()]
    }

    pub fn get_mut(&mut self, module: ModuleIndex) -> &mut ModuleState {
        &mut self.slots[module.index()]
    }

    /// Reset a slot when its module is (re)activated
    pub fn activate(&mut self, module: ModuleIndex, mode: ModeHandle) -> &mut ModuleState {
        let slot = &mut self.slots[module.index()];
        *slot = ModuleState::with_mode(module, mode);
        slot
    }
}
