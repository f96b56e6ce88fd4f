//! # Multi Bridge
//!
//! Drive a multi-protocol RF module from a host over its serial link.
//!
//! Loads a TOML configuration, opens the module's serial port and emits one
//! frame per pulse tick until Ctrl+C.

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use multi_bridge::config::{Config, LoggingConfig, StaticChannels};
use multi_bridge::multi::protocol::ModuleMode;
use multi_bridge::multi::scheduler::{ModeHandle, ModuleSlots};
use multi_bridge::serial::writer::{frame_queue, run_writer};
use multi_bridge::serial::MultiSerial;
use multi_bridge::trace::FrameTrace;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the rolling log
const LOG_FILE_PREFIX: &str = "multi-bridge.log";

/// Main entry point
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging, optionally mirrored to a daily log file
///    - Open the serial port and start the writer task
///    - Arm the bind timeout when starting in bind mode
///
/// 2. **Main Loop**
///    - Encode one frame per pulse tick and queue it for the writer
///    - Log status every `status_interval_frames` ticks
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Close the frame queue and wait for the writer to drain it
///    - Log totals
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO multi_bridge: Multi Bridge v0.1.0 starting...
/// INFO multi_bridge::serial: Successfully opened multi module at /dev/ttyUSB0
/// INFO multi_bridge: Starting pulse loop every 9ms (External module, Builtin(Frsky))
/// INFO multi_bridge: Tick 1000: 1000 frames queued, 0 dropped, mode Normal
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_logging(&config.logging);

    info!("Multi Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Configuration loaded from {}", config_path);

    let serial = MultiSerial::open(&config.serial.port, config.serial.baud_rate, config.serial.timeout_ms)?;
    info!("Multi module serial port opened at: {}", serial.device_path());

    let trace = if config.trace.enabled {
        Some(FrameTrace::new(
            &config.trace.log_dir,
            config.trace.max_records_per_file,
            config.trace.max_files_to_keep,
        )?)
    } else {
        None
    };

    let (mut sink, rx) = frame_queue(config.pulses.queue_depth);
    let writer = tokio::spawn(run_writer(serial, rx, trace));

    let module_config = config.module.to_module_configuration(&config.channels);
    let source = StaticChannels::new(&config.channels, config.module.channels_count);
    let mut slots = ModuleSlots::new();
    let state = slots.activate(config.module.slot, ModeHandle::new(config.module.mode));

    if config.module.mode == ModuleMode::Bind && config.module.bind_timeout_ms > 0 {
        spawn_bind_timeout(state.mode_handle(), Duration::from_millis(config.module.bind_timeout_ms));
    }

    let mut pulse_interval = interval(Duration::from_millis(config.pulses.period_ms));
    pulse_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "Starting pulse loop every {}ms ({:?} module, {:?})",
        config.pulses.period_ms, config.module.slot, module_config.protocol
    );
    info!("Press Ctrl+C to exit");

    let mut frames_queued: u64 = 0;
    let mut frames_dropped: u64 = 0;

    loop {
        tokio::select! {
            _ = pulse_interval.tick() => {
                match state.setup_pulses(&module_config, &source, &mut sink) {
                    Ok(()) => frames_queued += 1,
                    Err(e) => {
                        frames_dropped += 1;
                        debug!("Frame dropped: {}", e);
                    }
                }

                if state.counter() % config.pulses.status_interval_frames == 0 {
                    info!(
                        "Tick {}: {} frames queued, {} dropped, mode {:?}",
                        state.counter(), frames_queued, frames_dropped, state.mode()
                    );
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    // Closing the queue lets the writer finish
    drop(sink);
    match writer.await {
        Ok(stats) => info!(
            "Frames queued: {}, dropped: {}, written: {} ({} bytes), write errors: {}",
            frames_queued, frames_dropped, stats.frames_written, stats.bytes_written, stats.write_errors
        ),
        Err(e) => warn!("Writer task failed: {}", e),
    }

    Ok(())
}

/// Install the tracing subscriber
///
/// Logs go to stderr; with `log_dir` set they are also written to a daily
/// rolling file. The returned guard must outlive the program's logging.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(file_writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

/// Return the module to normal mode once the bind window has passed
fn spawn_bind_timeout(mode: ModeHandle, timeout: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if mode.get() == ModuleMode::Bind {
            mode.set(ModuleMode::Normal);
            info!("Bind timeout after {:?}, back to normal mode", timeout);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = Config::load(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(config.serial.baud_rate, 100_000);
        assert!(config.pulses.period_ms > 0);
    }

    #[test]
    fn test_log_file_prefix() {
        assert_eq!(LOG_FILE_PREFIX, "multi-bridge.log");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bind_timeout_returns_to_normal() {
        let mode = ModeHandle::new(ModuleMode::Bind);
        spawn_bind_timeout(mode.clone(), Duration::from_millis(500));

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(mode.get(), ModuleMode::Bind);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(mode.get(), ModuleMode::Normal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bind_timeout_leaves_other_modes_alone() {
        let mode = ModeHandle::new(ModuleMode::Bind);
        spawn_bind_timeout(mode.clone(), Duration::from_millis(100));

        mode.set(ModuleMode::RangeCheck);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(mode.get(), ModuleMode::RangeCheck);
    }
}
