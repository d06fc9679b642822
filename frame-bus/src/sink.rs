use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::{
    error::BusError,
    frame::{ChromaSubsampling, FrameReceiver, YuvFrame},
};

/// Progress marker written per frame when output is disabled.
pub const PROGRESS_MARKER: &[u8] = b"w";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
    pub frames: usize,
    pub bytes_written: u64,
}

/// Final stage: writes each frame's Y, Cb and Cr planes back to back, with
/// no framing, or only ticks the progress stream when writing is off.
pub struct FrameSink<W, P> {
    out: W,
    progress: P,
    write: bool,
    cancel: CancellationToken,
    stats: SinkStats,
    // width, height and subsampling of the last frame written
    geometry: Option<(u32, u32, ChromaSubsampling)>,
}

impl<W, P> FrameSink<W, P>
where
    W: AsyncWrite + Unpin,
    P: AsyncWrite + Unpin,
{
    pub fn new(out: W, progress: P, write: bool, cancel: CancellationToken) -> Self {
        Self {
            out,
            progress,
            write,
            cancel,
            stats: SinkStats::default(),
            geometry: None,
        }
    }

    pub async fn run(&mut self, mut receiver: FrameReceiver) -> Result<SinkStats, BusError> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    log::debug!("FrameSink: cancelled after {} frames", self.stats.frames);
                    break;
                }
                frame = receiver.recv() => frame,
            };
            let Some(frame) = frame else {
                break;
            };
            self.write_frame(&frame).await?;
        }

        self.out.flush().await.map_err(BusError::Write)?;
        self.progress.flush().await.map_err(BusError::Write)?;
        log::debug!(
            "FrameSink: done, {} frames, {} bytes",
            self.stats.frames,
            self.stats.bytes_written
        );
        Ok(self.stats)
    }

    pub async fn write_frame(&mut self, frame: &YuvFrame) -> Result<(), BusError> {
        self.check_geometry(frame);
        if self.write {
            for plane in frame.planes() {
                self.out.write_all(plane).await.map_err(BusError::Write)?;
            }
            self.stats.bytes_written += frame.len() as u64;
        } else {
            self.progress
                .write_all(PROGRESS_MARKER)
                .await
                .map_err(BusError::Write)?;
        }
        self.stats.frames += 1;
        Ok(())
    }

    /// Frames of different sizes or subsampling are passed through unchanged.
    /// Returns false when the frame differs from the previous one.
    fn check_geometry(&mut self, frame: &YuvFrame) -> bool {
        let geometry = (frame.width(), frame.height(), frame.subsampling());
        let same = match self.geometry {
            Some(previous) if previous != geometry => {
                log::warn!(
                    "FrameSink: frame {} is {}x{} yuv{}, previous frames were {}x{} yuv{}",
                    frame.index(),
                    geometry.0,
                    geometry.1,
                    geometry.2,
                    previous.0,
                    previous.1,
                    previous.2
                );
                false
            }
            _ => true,
        };
        self.geometry = Some(geometry);
        same
    }

    pub fn into_inner(self) -> (W, P) {
        (self.out, self.progress)
    }
}
