//! # Channel Value Transforms
//!
//! Converts radio channel outputs and failsafe settings to the module's
//! 11-bit wire range.
//!
//! ## Value Ranges
//!
//! - Radio output: -1024..=1024 for -100%..=100%
//! - Wire: 0..=2047, with -100%..=100% at 204..=1843 (80% scale)
//! - Center: 1024

#[cfg(test)]
use mockall::automock;

use super::protocol::*;

/// Live channel data consumed by the encoder
#[cfg_attr(test, automock)]
pub trait ChannelSource {
    /// Current output of a global channel (-1024..=1024 for ±100%)
    fn channel_output(&self, channel: usize) -> i32;

    /// PPM center of a global channel in microseconds
    fn ppm_center(&self, channel: usize) -> i32;

    /// Number of channels routed to a module
    fn channel_count(&self, module: ModuleIndex) -> u8;
}

/// Offset a value by the channel's center and scale it to 80% around 1024
///
/// Integer arithmetic, truncating toward zero. Computed in `i64`, so any pair
/// of `i32` inputs yields a value the callers can clamp.
pub fn scale_to_wire(value: i32, ppm_center: i32) -> i64 {
    let value = i64::from(value) + 2 * i64::from(ppm_center) - 2 * i64::from(PPM_CENTER);
    value * 800 / 1000 + i64::from(MULTI_CHANNEL_VALUE_CENTER)
}

fn clamp_to_wire(value: i64, min: i32) -> u16 {
    value.clamp(i64::from(min), i64::from(MULTI_CHANNEL_VALUE_MAX)) as u16
}

/// Wire value of a live channel, clamped to 0..=2047
///
/// # Examples
///
/// ```
/// use multi_bridge::multi::channels::normal_channel_value;
///
/// assert_eq!(normal_channel_value(0, 1500), 1024);
/// assert_eq!(normal_channel_value(1024, 1500), 1843);
/// assert_eq!(normal_channel_value(-5000, 1500), 0);
/// ```
pub fn normal_channel_value(output: i32, ppm_center: i32) -> u16 {
    clamp_to_wire(scale_to_wire(output, ppm_center), MULTI_CHANNEL_VALUE_MIN)
}

/// Wire value of a failsafe channel
///
/// Hold and no-pulses send fixed markers. Custom values are scaled like live
/// outputs but never go below 1, since 0 means "no pulses".
pub fn failsafe_channel_value(mode: FailsafeMode, failsafe: i32, ppm_center: i32) -> u16 {
    match mode {
        FailsafeMode::Hold => MULTI_CHANNEL_VALUE_MAX as u16,
        FailsafeMode::NoPulses => MULTI_CHANNEL_VALUE_MIN as u16,
        _ => clamp_to_wire(scale_to_wire(failsafe, ppm_center), MULTI_FAILSAFE_VALUE_MIN),
    }
}

/// Live wire values for the 16 channels of a module
pub fn normal_channels<S: ChannelSource + ?Sized>(
    config: &ModuleConfiguration,
    source: &S,
) -> [u16; MULTI_CHANS] {
    core::array::from_fn(|i| {
        let channel = config.channels_start + i;
        normal_channel_value(source.channel_output(channel), source.ppm_center(channel))
    })
}

/// Failsafe wire values for the 16 channels of a module
///
/// Failsafe values are taken by frame position, centers by global channel.
pub fn failsafe_channels<S: ChannelSource + ?Sized>(
    config: &ModuleConfiguration,
    source: &S,
) -> [u16; MULTI_CHANS] {
    core::array::from_fn(|i| {
        let channel = config.channels_start + i;
        failsafe_channel_value(
            config.failsafe_mode,
            config.failsafe_channels[i],
            source.ppm_center(channel),
        )
    })
}
