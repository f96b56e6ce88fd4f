//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{MultiBridgeError, Result};
use crate::multi::channels::ChannelSource;
use crate::multi::protocol::{
    FailsafeMode, ModuleConfiguration, ModuleIndex, ModuleMode, Protocol, ProtocolSelector,
    MULTI_CHANS, PPM_CENTER,
};

/// Size of the radio's channel output table
pub const MAX_OUTPUT_CHANNELS: usize = 32;

/// Highest raw protocol number the module accepts
pub const MAX_CUSTOM_PROTOCOL: u8 = 63;

/// Largest magnitude of a configured output or failsafe value (150%)
pub const MAX_CHANNEL_OUTPUT: i32 = 1536;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub module: ModuleConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub pulses: PulsesConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Module configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ModuleConfig {
    #[serde(default = "default_slot")]
    pub slot: ModuleIndex,

    /// Built-in protocol name (e.g. "frsky", "dsm")
    #[serde(default)]
    pub protocol: Option<Protocol>,

    /// Raw protocol number, overrides `protocol`
    #[serde(default)]
    pub custom_protocol: Option<u8>,

    #[serde(default)]
    pub sub_protocol: u8,

    #[serde(default)]
    pub option: i8,

    #[serde(default)]
    pub autobind: bool,

    #[serde(default)]
    pub low_power: bool,

    #[serde(default)]
    pub channels_start: usize,

    #[serde(default = "default_channels_count")]
    pub channels_count: u8,

    #[serde(default)]
    pub failsafe_mode: FailsafeMode,

    #[serde(default)]
    pub model_id: u8,

    #[serde(default = "default_input_sync")]
    pub input_sync: bool,

    /// Mode at startup
    #[serde(default)]
    pub mode: ModuleMode,

    /// Leave bind mode after this long (0 = stay)
    #[serde(default)]
    pub bind_timeout_ms: u64,
}

/// Channel values
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChannelConfig {
    /// Channel outputs (-1024..=1024), missing entries are centered
    #[serde(default)]
    pub outputs: Vec<i32>,

    /// Per-channel PPM center in microseconds, missing entries use 1500
    #[serde(default)]
    pub ppm_centers: Vec<i32>,

    /// Custom failsafe values by frame position
    #[serde(default)]
    pub failsafe: Vec<i32>,
}

/// Pulse timing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PulsesConfig {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Frames buffered between the tick and the serial writer
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    #[serde(default = "default_status_interval_frames")]
    pub status_interval_frames: u64,
}

/// Frame trace configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TraceConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_trace_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Also write a daily rolling log file here
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for PulsesConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            queue_depth: default_queue_depth(),
            status_interval_frames: default_status_interval_frames(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_trace_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 100_000 }
fn default_timeout_ms() -> u64 { 100 }

fn default_slot() -> ModuleIndex { ModuleIndex::External }
fn default_channels_count() -> u8 { 16 }
fn default_input_sync() -> bool { true }

fn default_period_ms() -> u64 { 9 }
fn default_queue_depth() -> usize { 4 }
fn default_status_interval_frames() -> u64 { 1000 }

fn default_trace_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn invalid(msg: impl std::fmt::Display) -> MultiBridgeError {
    MultiBridgeError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use multi_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![100_000, 115_200, 125_000].contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 100000, 115200, 125000"));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        let module = &self.module;
        if module.protocol.is_none() && module.custom_protocol.is_none() {
            return Err(invalid("module needs either protocol or custom_protocol"));
        }

        if let Some(raw) = module.custom_protocol {
            if raw > MAX_CUSTOM_PROTOCOL {
                return Err(invalid(format!(
                    "custom_protocol {} is out of range (must be 0-{})",
                    raw, MAX_CUSTOM_PROTOCOL
                )));
            }
        }

        if module.model_id > 15 {
            return Err(invalid("model_id must be between 0 and 15"));
        }

        if module.channels_start + MULTI_CHANS > MAX_OUTPUT_CHANNELS {
            return Err(invalid(format!(
                "channels_start must be between 0 and {}",
                MAX_OUTPUT_CHANNELS - MULTI_CHANS
            )));
        }

        if module.channels_count == 0 || module.channels_count as usize > MULTI_CHANS {
            return Err(invalid("channels_count must be between 1 and 16"));
        }

        if self.channels.outputs.len() > MAX_OUTPUT_CHANNELS {
            return Err(invalid("outputs cannot list more than 32 channels"));
        }

        if self.channels.ppm_centers.len() > MAX_OUTPUT_CHANNELS {
            return Err(invalid("ppm_centers cannot list more than 32 channels"));
        }

        if self.channels.failsafe.len() > MULTI_CHANS {
            return Err(invalid("failsafe cannot list more than 16 channels"));
        }

        for (name, values) in [("outputs", &self.channels.outputs), ("failsafe", &self.channels.failsafe)] {
            if let Some(value) = values.iter().find(|v| !(-MAX_CHANNEL_OUTPUT..=MAX_CHANNEL_OUTPUT).contains(*v)) {
                return Err(invalid(format!(
                    "{} value {} must be between -{} and {}",
                    name, value, MAX_CHANNEL_OUTPUT, MAX_CHANNEL_OUTPUT
                )));
            }
        }

        for &center in &self.channels.ppm_centers {
            if !(PPM_CENTER - 500..=PPM_CENTER + 500).contains(&center) {
                return Err(invalid(format!("ppm center {} must be between 1000 and 2000", center)));
            }
        }

        if self.pulses.period_ms == 0 || self.pulses.period_ms > 50 {
            return Err(invalid("period_ms must be between 1 and 50"));
        }

        if self.pulses.queue_depth == 0 || self.pulses.queue_depth > 64 {
            return Err(invalid("queue_depth must be between 1 and 64"));
        }

        if self.pulses.status_interval_frames == 0 {
            return Err(invalid("status_interval_frames must be greater than 0"));
        }

        if self.trace.enabled && self.trace.log_dir.is_empty() {
            return Err(invalid("trace log_dir cannot be empty when enabled"));
        }

        if self.trace.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.trace.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}

impl ModuleConfig {
    /// Selected protocol; a custom number wins over a named protocol
    pub fn protocol_selector(&self) -> ProtocolSelector {
        match (self.custom_protocol, self.protocol) {
            (Some(raw), _) => ProtocolSelector::Custom(raw),
            (None, Some(protocol)) => ProtocolSelector::Builtin(protocol),
            (None, None) => ProtocolSelector::Builtin(Protocol::Flysky),
        }
    }

    /// Build the encoder's configuration snapshot
    pub fn to_module_configuration(&self, channels: &ChannelConfig) -> ModuleConfiguration {
        let mut failsafe_channels = [0i32; MULTI_CHANS];
        for (slot, &value) in failsafe_channels.iter_mut().zip(&channels.failsafe) {
            *slot = value;
        }

        ModuleConfiguration {
            protocol: self.protocol_selector(),
            sub_protocol: self.sub_protocol,
            option: self.option,
            autobind: self.autobind,
            low_power: self.low_power,
            channels_start: self.channels_start,
            failsafe_mode: self.failsafe_mode,
            failsafe_channels,
            model_id: self.model_id,
            input_sync: self.input_sync,
        }
    }
}

/// Channel source backed by fixed configured values
#[derive(Debug, Clone)]
pub struct StaticChannels {
    outputs: [i32; MAX_OUTPUT_CHANNELS],
    ppm_centers: [i32; MAX_OUTPUT_CHANNELS],
    channel_count: u8,
}

impl StaticChannels {
    pub fn new(channels: &ChannelConfig, channel_count: u8) -> Self {
        let mut outputs = [0i32; MAX_OUTPUT_CHANNELS];
        for (slot, &value) in outputs.iter_mut().zip(&channels.outputs) {
            *slot = value;
        }

        let mut ppm_centers = [PPM_CENTER; MAX_OUTPUT_CHANNELS];
        for (slot, &value) in ppm_centers.iter_mut().zip(&channels.ppm_centers) {
            *slot = value;
        }

        Self {
            outputs,
            ppm_centers,
            channel_count,
        }
    }
}

impl ChannelSource for StaticChannels {
    fn channel_output(&self, channel: usize) -> i32 {
        self.outputs.get(channel).copied().unwrap_or(0)
    }

    fn ppm_center(&self, channel: usize) -> i32 {
        self.ppm_centers.get(channel).copied().unwrap_or(PPM_CENTER)
    }

    fn channel_count(&self, _module: ModuleIndex) -> u8 {
        self.channel_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[serial]
port = "/dev/ttyUSB0"

[module]
protocol = "frsky"
"#;

    fn create_valid_config() -> Config {
        Config::from_toml(MINIMAL).unwrap()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = create_valid_config();
        assert_eq!(config.serial.baud_rate, 100_000);
        assert_eq!(config.module.slot, ModuleIndex::External);
        assert_eq!(config.module.protocol, Some(Protocol::Frsky));
        assert_eq!(config.module.failsafe_mode, FailsafeMode::NotSet);
        assert_eq!(config.module.mode, ModuleMode::Normal);
        assert!(config.module.input_sync);
        assert_eq!(config.pulses.period_ms, 9);
        assert!(!config.trace.enabled);
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[serial]
port = "/dev/ttyACM1"
baud_rate = 125000

[module]
slot = "internal"
protocol = "dsm"
sub_protocol = 3
option = -4
autobind = true
low_power = true
channels_start = 8
channels_count = 12
failsafe_mode = "no_pulses"
model_id = 7
input_sync = false
mode = "range_check"

[channels]
outputs = [0, 512, -512]
ppm_centers = [1500, 1520]
failsafe = [100, -100]

[pulses]
period_ms = 11
queue_depth = 8

[trace]
enabled = true
log_dir = "/tmp/frames"
"#;
        let config = Config::from_toml(toml_content).unwrap();
        let module = config.module.to_module_configuration(&config.channels);

        assert_eq!(module.protocol, ProtocolSelector::Builtin(Protocol::Dsm));
        assert_eq!(module.sub_protocol, 3);
        assert_eq!(module.option, -4);
        assert!(module.autobind);
        assert!(module.low_power);
        assert_eq!(module.channels_start, 8);
        assert_eq!(module.failsafe_mode, FailsafeMode::NoPulses);
        assert_eq!(module.failsafe_channels[0], 100);
        assert_eq!(module.failsafe_channels[1], -100);
        assert_eq!(module.failsafe_channels[2], 0);
        assert_eq!(module.model_id, 7);
        assert!(!module.input_sync);
        assert_eq!(config.module.mode, ModuleMode::RangeCheck);
        assert_eq!(config.module.slot, ModuleIndex::Internal);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/multi-bridge.toml");
        assert!(matches!(result, Err(MultiBridgeError::Io(_))));
    }

    #[test]
    fn test_unknown_protocol_name() {
        let toml_content = MINIMAL.replace("frsky", "not-a-protocol");
        assert!(matches!(Config::from_toml(&toml_content), Err(MultiBridgeError::Config(_))));
    }

    #[test]
    fn test_protocol_required() {
        let toml_content = "[serial]\n[module]\nsub_protocol = 1\n";
        assert!(Config::from_toml(toml_content).is_err());
    }

    #[test]
    fn test_custom_protocol_wins() {
        let mut config = create_valid_config();
        config.module.custom_protocol = Some(40);
        assert_eq!(config.module.protocol_selector(), ProtocolSelector::Custom(40));
        assert!(config.validate().is_ok());

        config.module.custom_protocol = Some(64);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &[100_000, 115_200, 125_000] {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_id_too_high() {
        let mut config = create_valid_config();
        config.module.model_id = 16;
        assert!(config.validate().is_err());
        config.module.model_id = 15;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_channels_start_bounds() {
        let mut config = create_valid_config();
        config.module.channels_start = 16;
        assert!(config.validate().is_ok());
        config.module.channels_start = 17;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channels_count_bounds() {
        let mut config = create_valid_config();
        config.module.channels_count = 0;
        assert!(config.validate().is_err());
        config.module.channels_count = 17;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_too_many_failsafe_values() {
        let mut config = create_valid_config();
        config.channels.failsafe = vec![0; 17];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_out_of_range() {
        let mut config = create_valid_config();
        config.channels.outputs = vec![0, 1536, -1536];
        assert!(config.validate().is_ok());

        config.channels.outputs = vec![0, 1537];
        assert!(config.validate().is_err());

        let toml_content = format!("{}\n[channels]\noutputs = [3000000]\n", MINIMAL);
        assert!(matches!(Config::from_toml(&toml_content), Err(MultiBridgeError::Config(_))));
    }

    #[test]
    fn test_failsafe_out_of_range() {
        let mut config = create_valid_config();
        config.channels.failsafe = vec![-1536, 1536];
        assert!(config.validate().is_ok());

        config.channels.failsafe = vec![-1537];
        assert!(config.validate().is_err());

        let toml_content = format!("{}\n[channels]\nfailsafe = [2147483000]\n", MINIMAL);
        assert!(matches!(Config::from_toml(&toml_content), Err(MultiBridgeError::Config(_))));
    }

    #[test]
    fn test_ppm_center_out_of_range() {
        let mut config = create_valid_config();
        config.channels.ppm_centers = vec![1500, 2100];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_period_bounds() {
        let mut config = create_valid_config();
        config.pulses.period_ms = 0;
        assert!(config.validate().is_err());
        config.pulses.period_ms = 51;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_queue_depth_bounds() {
        let mut config = create_valid_config();
        config.pulses.queue_depth = 0;
        assert!(config.validate().is_err());
        config.pulses.queue_depth = 65;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_trace_dir_when_enabled() {
        let mut config = create_valid_config();
        config.trace.enabled = true;
        config.trace.log_dir = String::new();
        assert!(config.validate().is_err());

        config.trace.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trace_limits_zero() {
        let mut config = create_valid_config();
        config.trace.max_records_per_file = 0;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.trace.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_static_channels() {
        let channels = ChannelConfig {
            outputs: vec![100, -100],
            ppm_centers: vec![1510],
            failsafe: vec![],
        };
        let source = StaticChannels::new(&channels, 12);

        assert_eq!(source.channel_output(0), 100);
        assert_eq!(source.channel_output(1), -100);
        assert_eq!(source.channel_output(2), 0);
        assert_eq!(source.channel_output(99), 0);
        assert_eq!(source.ppm_center(0), 1510);
        assert_eq!(source.ppm_center(1), PPM_CENTER);
        assert_eq!(source.channel_count(ModuleIndex::External), 12);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyUSB0");
        assert_eq!(default_baud_rate(), 100_000);
        assert_eq!(default_timeout_ms(), 100);
        assert_eq!(default_slot(), ModuleIndex::External);
        assert_eq!(default_channels_count(), 16);
        assert!(default_input_sync());
        assert_eq!(default_period_ms(), 9);
        assert_eq!(default_queue_depth(), 4);
        assert_eq!(default_status_interval_frames(), 1000);
        assert_eq!(default_trace_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
    }
}
