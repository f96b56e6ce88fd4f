//! # Frame Queue and Writer Task
//!
//! Decouples the pulse tick from serial I/O. The tick hands frames to a
//! bounded queue without waiting; a writer task drains the queue and writes
//! to the port. When the queue is full the frame is dropped.

use bytes::BytesMut;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::port_trait::SerialPortIO;
use crate::error::{MultiBridgeError, Result};
use crate::multi::frame::WireFrame;
use crate::multi::protocol::{ModuleIndex, MULTI_MAX_FRAME_SIZE};
use crate::multi::scheduler::FrameSink;
use crate::trace::FrameTrace;

/// A frame waiting for the writer
#[derive(Debug, Clone)]
pub struct QueuedFrame {
    pub module: ModuleIndex,
    pub frame: WireFrame,
}

/// Non-blocking [`FrameSink`] feeding the writer task
#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: mpsc::Sender<QueuedFrame>,
}

impl FrameSink for QueueSink {
    fn send_frame(&mut self, module: ModuleIndex, frame: &WireFrame) -> Result<()> {
        self.tx
            .try_send(QueuedFrame {
                module,
                frame: frame.clone(),
            })
            .map_err(|e| match e {
                TrySendError::Full(_) => MultiBridgeError::SinkFull,
                TrySendError::Closed(_) => MultiBridgeError::SinkClosed,
            })
    }
}

/// Create a frame queue holding at most `depth` frames
pub fn frame_queue(depth: usize) -> (QueueSink, mpsc::Receiver<QueuedFrame>) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (QueueSink { tx }, rx)
}

/// Counters reported when the writer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub frames_written: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
}

/// Drain the queue into the port until every sender is gone
///
/// Frames that queued up while the port was busy are written in one go.
/// A failed write drops the affected frames and the writer carries on.
///
/// # Arguments
///
/// * `port` - Serial port
/// * `rx` - Receiving end of [`frame_queue`]
/// * `trace` - Optional frame trace, fed with every frame written
pub async fn run_writer<P: SerialPortIO>(
    mut port: P,
    mut rx: mpsc::Receiver<QueuedFrame>,
    mut trace: Option<FrameTrace>,
) -> WriterStats {
    let mut stats = WriterStats::default();
    let mut buf = BytesMut::with_capacity(MULTI_MAX_FRAME_SIZE * 4);
    let mut batch: Vec<QueuedFrame> = Vec::with_capacity(4);

    while let Some(first) = rx.recv().await {
        buf.clear();
        batch.clear();
        batch.push(first);
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }

        for queued in &batch {
            buf.extend_from_slice(queued.frame.as_bytes());
        }

        if let Err(e) = write_frames(&mut port, &buf).await {
            stats.write_errors += 1;
            warn!("Dropped {} frame(s): {}", batch.len(), e);
            continue;
        }

        stats.frames_written += batch.len() as u64;
        stats.bytes_written += buf.len() as u64;
        debug!("Wrote {} frame(s) ({} bytes)", batch.len(), buf.len());

        // One trace flush per batch
        let trace_error = trace.as_mut().and_then(|t| {
            batch
                .iter()
                .find_map(|queued| t.record(queued.module, &queued.frame).err())
                .or_else(|| t.flush().err())
        });
        if let Some(e) = trace_error {
            warn!("Frame trace disabled: {}", e);
            trace = None;
        }
    }

    debug!("Frame queue closed, writer stopping");
    stats
}

async fn write_frames<P: SerialPortIO>(port: &mut P, data: &[u8]) -> Result<()> {
    port.write_all(data)
        .await
        .map_err(|e| MultiBridgeError::Serial(format!("Failed to write frame: {}", e)))?;

    port.flush()
        .await
        .map_err(|e| MultiBridgeError::Serial(format!("Failed to flush serial port: {}", e)))?;

    Ok(())
}
