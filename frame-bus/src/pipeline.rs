//! Decode pipeline wiring.
//!
//! Data flow:
//! ```text
//! paths ──► FileOpener ──► [open queue, bounded] ──► DecoderTask ──► [frame queue, bounded] ──► FrameSink ──► out
//!                                                     │
//!                                                     ├─ Sequential: one file at a time
//!                                                     └─ BatchParallel: N decodes, joined, emitted in order
//! ```
//!
//! Any stage failure cancels the run; `Pipeline::run` reports the first
//! error in stage order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{DecodeMode, PipelineConfig},
    decoder::{DecoderTask, FrameDecode, JpegDecoder},
    error::BusError,
    opener::FileOpener,
    sink::FrameSink,
};

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    /// Paths in the input list.
    pub files: usize,
    /// Files opened and handed to the decoder.
    pub opened: usize,
    /// Frames delivered to the sink.
    pub frames: usize,
    pub bytes_written: u64,
    /// On-disk size of every file the decoder consumed.
    pub input_bytes: u64,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn input_mib(&self) -> f64 {
        self.input_bytes as f64 / 1024.0 / 1024.0
    }
}

pub struct Pipeline<D = JpegDecoder> {
    config: PipelineConfig,
    decoder: Arc<D>,
    cancel: CancellationToken,
}

impl Pipeline<JpegDecoder> {
    pub fn new(config: PipelineConfig) -> Self {
        let decoder = JpegDecoder::new(config.subsampling());
        Self::with_decoder(config, decoder)
    }
}

impl<D: FrameDecode> Pipeline<D> {
    pub fn with_decoder(config: PipelineConfig, decoder: D) -> Self {
        Self {
            config,
            decoder: Arc::new(decoder),
            cancel: CancellationToken::new(),
        }
    }

    /// Stops a running pipeline; `run` then returns [`BusError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs the whole pipeline over `paths`, writing frames to `out` (or
    /// progress markers to `progress` when writing is disabled).
    pub async fn run<W, P>(
        &self,
        paths: Vec<PathBuf>,
        out: W,
        progress: P,
    ) -> Result<PipelineReport, BusError>
    where
        W: AsyncWrite + Unpin,
        P: AsyncWrite + Unpin,
    {
        let start = Instant::now();
        let files = paths.len();
        let mode = self.config.mode();
        match mode {
            DecodeMode::Sequential => log::info!("using sequential decoder"),
            DecodeMode::BatchParallel { batch_size } => {
                log::info!("using batch-parallel decoder, batch size {}", batch_size)
            }
        }

        // one failing stage stops the others without touching the caller's token
        let cancel = self.cancel.child_token();
        let (file_tx, file_rx) = tokio::sync::mpsc::channel(self.config.open_queue_capacity());
        let (frame_tx, frame_rx) = tokio::sync::mpsc::channel(self.config.frame_queue_capacity());

        // Each stage cancels before its sender drops, so the next stage never
        // mistakes a failure for end of stream.
        let opener = FileOpener::new(cancel.clone());
        let opener_cancel = cancel.clone();
        let opener_handle = tokio::spawn(async move {
            let result = opener.run(paths, &file_tx).await;
            if let Err(e) = &result {
                log::error!("FileOpener: {}", e);
                opener_cancel.cancel();
            }
            drop(file_tx);
            result
        });

        let decoder = DecoderTask::new(
            Arc::clone(&self.decoder),
            mode,
            self.config.decode(),
            cancel.clone(),
        );
        let decoder_cancel = cancel.clone();
        let decoder_handle = tokio::spawn(async move {
            let result = decoder.run(file_rx, &frame_tx).await;
            if let Err(e) = &result {
                log::error!("DecoderTask: {}", e);
                decoder_cancel.cancel();
            }
            drop(frame_tx);
            result
        });

        let mut sink = FrameSink::new(out, progress, self.config.write(), cancel.clone());
        let sink_result = sink.run(frame_rx).await;
        if let Err(e) = &sink_result {
            log::error!("FrameSink: {}", e);
            cancel.cancel();
        }

        let opener_result = opener_handle.await;
        let decoder_result = decoder_handle.await;

        let opened = opener_result??;
        let acc = decoder_result??;
        let stats = sink_result?;
        if self.cancel.is_cancelled() {
            return Err(BusError::Cancelled);
        }

        let report = PipelineReport {
            files,
            opened,
            frames: stats.frames,
            bytes_written: stats.bytes_written,
            input_bytes: acc.total(),
            elapsed: start.elapsed(),
        };
        log::debug!("Pipeline: {:?}", report);
        Ok(report)
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
