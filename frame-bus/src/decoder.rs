use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use zune_jpeg::zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions};

use crate::{
    accumulator::ByteAccumulator,
    config::DecodeMode,
    error::BusError,
    frame::{ChromaSubsampling, FrameSender, YuvFrame},
    handle::{FileReceiver, OpenedFile},
    header::FrameHeader,
    scaler::Scaler,
};

/// Turns one opened file into one planar frame. Implementations run on
/// blocking threads, possibly several at once.
pub trait FrameDecode: Send + Sync + 'static {
    fn decode(&self, file: OpenedFile) -> Result<YuvFrame, BusError>;
}

/// Baseline/progressive JPEG decoder producing planar YCbCr.
///
/// Output planes follow the image's own chroma sampling unless a
/// subsampling is forced. Grayscale images get neutral chroma planes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegDecoder {
    subsampling: Option<ChromaSubsampling>,
}

impl JpegDecoder {
    pub fn new(subsampling: Option<ChromaSubsampling>) -> Self {
        Self { subsampling }
    }
}

impl FrameDecode for JpegDecoder {
    fn decode(&self, file: OpenedFile) -> Result<YuvFrame, BusError> {
        let (index, path, data) = file.read_all()?;

        // a missing header is left to the decoder to report
        let header = FrameHeader::parse(&data);
        let grayscale = header.as_ref().is_some_and(FrameHeader::is_grayscale);
        if let Some(header) = &header {
            if !grayscale && header.components.len() != 3 {
                return Err(BusError::Unsupported {
                    path,
                    reason: format!("{} color components", header.components.len()),
                });
            }
        }

        let colorspace = if grayscale {
            ColorSpace::Luma
        } else {
            ColorSpace::YCbCr
        };
        let options = DecoderOptions::default().jpeg_set_out_colorspace(colorspace);
        let mut decoder =
            zune_jpeg::JpegDecoder::new_with_options(ZCursor::new(data.as_slice()), options);
        let pixels = match decoder.decode() {
            Ok(pixels) => pixels,
            Err(source) => return Err(BusError::Decode { path, source }),
        };
        let (Some(header), Some((width, height))) = (header, decoder.dimensions()) else {
            return Err(BusError::Unsupported {
                path,
                reason: "no frame header".to_string(),
            });
        };
        let (width, height) = (width as u32, height as u32);

        let subsampling = match self.subsampling.or(header.subsampling()) {
            Some(subsampling) => subsampling,
            None if grayscale => ChromaSubsampling::default(),
            // 4:4:0, 4:1:1 and friends: keep every chroma sample
            None => ChromaSubsampling::Yuv444,
        };
        let scaler = Scaler::new(subsampling);
        if grayscale {
            Ok(scaler.run_luma(index, width, height, pixels))
        } else {
            Ok(scaler.run(index, width, height, &pixels))
        }
    }
}

/// Handles drawn from the queue for one join cycle of the parallel decoder.
#[derive(Debug)]
pub struct Batch {
    files: Vec<OpenedFile>,
    is_final: bool,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The input queue closed while this batch was being collected.
    pub fn is_final(&self) -> bool {
        self.is_final
    }
}

/// Decoder stage: consumes opened files, records their sizes and emits
/// frames in input order.
pub struct DecoderTask<D> {
    decoder: Arc<D>,
    mode: DecodeMode,
    decode: bool,
    cancel: CancellationToken,
}

impl<D: FrameDecode> DecoderTask<D> {
    pub fn new(decoder: Arc<D>, mode: DecodeMode, decode: bool, cancel: CancellationToken) -> Self {
        Self {
            decoder,
            mode,
            decode,
            cancel,
        }
    }

    /// Runs until the input queue is drained. Returns the byte total of
    /// every file pulled from the queue.
    pub async fn run(
        self,
        receiver: FileReceiver,
        sender: &FrameSender,
    ) -> Result<ByteAccumulator, BusError> {
        match self.mode {
            DecodeMode::Sequential => {
                let sender = sender.clone();
                tokio::task::spawn_blocking(move || self.sequential_loop(receiver, sender)).await?
            }
            DecodeMode::BatchParallel { batch_size } => {
                self.batch_loop(batch_size.max(1), receiver, sender).await
            }
        }
    }

    fn sequential_loop(
        &self,
        mut receiver: FileReceiver,
        sender: FrameSender,
    ) -> Result<ByteAccumulator, BusError> {
        let mut acc = ByteAccumulator::new();
        while let Some(file) = receiver.blocking_recv() {
            if self.cancel.is_cancelled() {
                log::debug!("DecoderTask: cancelled");
                break;
            }
            acc.record(file.size());

            if !self.decode {
                continue;
            }
            let frame = self.decoder.decode(file)?;
            if sender.blocking_send(frame).is_err() {
                log::debug!("DecoderTask: sink gone, stop decoding");
                break;
            }
        }
        Ok(acc)
    }

    async fn batch_loop(
        &self,
        batch_size: usize,
        mut receiver: FileReceiver,
        sender: &FrameSender,
    ) -> Result<ByteAccumulator, BusError> {
        let mut acc = ByteAccumulator::new();
        loop {
            let Some(batch) = self.collect(batch_size, &mut receiver, &mut acc).await else {
                log::debug!("DecoderTask: cancelled while collecting");
                break;
            };
            let is_final = batch.is_final();
            log::debug!(
                "DecoderTask: collected batch of {} (final: {})",
                batch.len(),
                is_final
            );

            if self.decode && !batch.is_empty() {
                let frames = self.decode_batch(batch).await?;
                if !self.emit(frames, sender).await {
                    break;
                }
            }

            if is_final {
                break;
            }
        }
        Ok(acc)
    }

    /// Draws up to `batch_size` files. Sizes are recorded here, before any
    /// decode task of the batch is started.
    async fn collect(
        &self,
        batch_size: usize,
        receiver: &mut FileReceiver,
        acc: &mut ByteAccumulator,
    ) -> Option<Batch> {
        let mut files = Vec::with_capacity(batch_size);
        while files.len() < batch_size {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                file = receiver.recv() => match file {
                    Some(file) => {
                        acc.record(file.size());
                        files.push(file);
                    }
                    None => {
                        return Some(Batch {
                            files,
                            is_final: true,
                        });
                    }
                },
            }
        }
        Some(Batch {
            files,
            is_final: false,
        })
    }

    /// One blocking task per file; waits for all of them and returns the
    /// frames in batch order.
    async fn decode_batch(&self, batch: Batch) -> Result<Vec<YuvFrame>, BusError> {
        let tasks = batch.files.into_iter().map(|file| {
            let decoder = Arc::clone(&self.decoder);
            tokio::task::spawn_blocking(move || decoder.decode(file))
        });
        let results = futures::future::join_all(tasks).await;

        let mut frames = Vec::with_capacity(results.len());
        for result in results {
            frames.push(result??);
        }
        Ok(frames)
    }

    /// Returns false when the pipeline stopped and no more frames are wanted.
    async fn emit(&self, frames: Vec<YuvFrame>, sender: &FrameSender) -> bool {
        for frame in frames {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                result = sender.send(frame) => {
                    if result.is_err() {
                        log::debug!("DecoderTask: sink gone, stop decoding");
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use jpeg_encoder::{ColorType, Encoder, SamplingFactor};

    use super::*;
    use crate::{fixture, opener::open_file};

    /// Decodes nothing; sleeps longer for earlier files of a batch so tasks
    /// finish in reverse order, and tracks how many run at once.
    struct SlowDecoder {
        batch_size: usize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl SlowDecoder {
        fn new(batch_size: usize) -> Self {
            Self {
                batch_size,
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            }
        }
    }

    impl FrameDecode for SlowDecoder {
        fn decode(&self, file: OpenedFile) -> Result<YuvFrame, BusError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);

            let slot = file.index() % self.batch_size;
            std::thread::sleep(Duration::from_millis(10 * (self.batch_size - slot) as u64));

            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(YuvFrame::new(
                file.index(),
                1,
                1,
                ChromaSubsampling::Yuv444,
                vec![file.index() as u8],
                vec![0],
                vec![0],
            ))
        }
    }

    async fn queue_files(paths: &[PathBuf]) -> anyhow::Result<FileReceiver> {
        let (tx, rx) = tokio::sync::mpsc::channel(paths.len().max(1));
        for (index, path) in paths.iter().enumerate() {
            tx.send(open_file(index, path.clone()).await?).await?;
        }
        Ok(rx)
    }

    async fn run_task<D: FrameDecode>(
        decoder: Arc<D>,
        mode: DecodeMode,
        decode: bool,
        paths: &[PathBuf],
    ) -> anyhow::Result<(ByteAccumulator, Vec<YuvFrame>)> {
        let receiver = queue_files(paths).await?;
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        let collector = tokio::spawn(async move {
            let mut frames = Vec::new();
            while let Some(frame) = rx.recv().await {
                frames.push(frame);
            }
            frames
        });

        let task = DecoderTask::new(decoder, mode, decode, CancellationToken::new());
        let acc = task.run(receiver, &tx).await?;
        drop(tx);
        Ok((acc, collector.await?))
    }

    #[tokio::test]
    async fn test_jpeg_decoder_plane_sizes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let paths = fixture::write_jpegs(dir.path(), 1, 17, 9)?;
        let file = open_file(0, paths[0].clone()).await?;

        let frame = JpegDecoder::default().decode(file)?;
        assert_eq!((frame.width(), frame.height()), (17, 9));
        assert_eq!(frame.subsampling(), ChromaSubsampling::Yuv420);
        assert_eq!(frame.y().len(), 17 * 9);
        assert_eq!(frame.cb().len(), 9 * 5);
        assert_eq!(frame.cr().len(), 9 * 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_jpeg_decoder_keeps_native_sampling() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cases = [
            (SamplingFactor::F_1_1, ChromaSubsampling::Yuv444, 16 * 16),
            (SamplingFactor::F_2_1, ChromaSubsampling::Yuv422, 8 * 16),
            (SamplingFactor::F_2_2, ChromaSubsampling::Yuv420, 8 * 8),
        ];
        for (i, (sampling, expected, chroma_len)) in cases.into_iter().enumerate() {
            let path = dir.path().join(format!("sampled_{}.jpg", i));
            fixture::write_jpeg_sampled(&path, i, 16, 16, sampling)?;

            let frame = JpegDecoder::default().decode(open_file(0, path).await?)?;
            assert_eq!(frame.subsampling(), expected);
            assert_eq!(frame.y().len(), 16 * 16);
            assert_eq!(frame.cb().len(), chroma_len);
            assert_eq!(frame.cr().len(), chroma_len);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_jpeg_decoder_444_chroma_is_not_averaged() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("stripes.jpg");
        // alternating red and blue columns: 4:4:4 keeps them apart
        let mut pixels: Vec<u8> = Vec::new();
        for _ in 0..16 {
            for x in 0..16 {
                pixels.extend_from_slice(if x % 2 == 0 { &[255, 0, 0] } else { &[0, 0, 255] });
            }
        }
        fixture::encode_jpeg(&path, &pixels, 16, 16, SamplingFactor::F_1_1)?;

        let frame = JpegDecoder::default().decode(open_file(0, path).await?)?;
        let (red_cr, blue_cr) = (frame.cr()[16 * 8 + 4], frame.cr()[16 * 8 + 5]);
        assert!(
            red_cr as i32 - blue_cr as i32 > 50,
            "red Cr {}, blue Cr {}",
            red_cr,
            blue_cr
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_jpeg_decoder_forced_subsampling() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("full.jpg");
        fixture::write_jpeg_sampled(&path, 0, 16, 16, SamplingFactor::F_1_1)?;

        let decoder = JpegDecoder::new(Some(ChromaSubsampling::Yuv420));
        let frame = decoder.decode(open_file(0, path).await?)?;
        assert_eq!(frame.subsampling(), ChromaSubsampling::Yuv420);
        assert_eq!(frame.cb().len(), 8 * 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_jpeg_decoder_grayscale() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("gray.jpg");
        let encoder = Encoder::new_file(&path, 90)?;
        encoder.encode(&[90; 8 * 6], 8, 6, ColorType::Luma)?;

        let frame = JpegDecoder::default().decode(open_file(0, path).await?)?;
        assert_eq!(frame.subsampling(), ChromaSubsampling::Yuv420);
        assert_eq!(frame.y().len(), 8 * 6);
        assert!(frame.y().iter().all(|&v| v.abs_diff(90) <= 2));
        assert_eq!(frame.cb().len(), 4 * 3);
        assert!(frame.cb().iter().chain(frame.cr()).all(|&v| v == 128));
        Ok(())
    }

    #[tokio::test]
    async fn test_jpeg_decoder_rejects_garbage() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let paths = fixture::write_blobs(dir.path(), &[64])?;
        let file = open_file(0, paths[0].clone()).await?;

        let err = JpegDecoder::default().decode(file).unwrap_err();
        assert!(matches!(err, BusError::Decode { .. }));
        assert_eq!(err.path(), Some(&paths[0]));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_emits_in_input_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let paths = fixture::write_blobs(dir.path(), &[1; 10])?;
        let decoder = Arc::new(SlowDecoder::new(4));

        let mode = DecodeMode::BatchParallel { batch_size: 4 };
        let (_, frames) = run_task(decoder.clone(), mode, true, &paths).await?;

        let order: Vec<usize> = frames.iter().map(|f| f.index()).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
        assert!(decoder.max_running.load(Ordering::SeqCst) <= 4);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_three_files_two_threads() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let paths = fixture::write_jpegs(dir.path(), 3, 16, 16)?;
        let decoder = Arc::new(JpegDecoder::default());

        let mode = DecodeMode::BatchParallel { batch_size: 2 };
        let (acc, batched) = run_task(decoder.clone(), mode, true, &paths).await?;
        let (_, sequential) = run_task(decoder, DecodeMode::Sequential, true, &paths).await?;

        assert_eq!(batched.len(), 3);
        assert_eq!(acc.files(), 3);
        assert_eq!(acc.total(), fixture::total_size(&paths)?);
        for (a, b) in batched.iter().zip(&sequential) {
            assert_eq!(a.index(), b.index());
            assert_eq!(a.planes(), b.planes());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_nodecode_only_counts_bytes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let paths = fixture::write_blobs(dir.path(), &[10, 20, 30])?;

        for mode in [
            DecodeMode::Sequential,
            DecodeMode::BatchParallel { batch_size: 2 },
        ] {
            let decoder = Arc::new(JpegDecoder::default());
            let (acc, frames) = run_task(decoder, mode, false, &paths).await?;
            assert!(frames.is_empty());
            assert_eq!(acc.total(), 60);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_input_is_clean() -> anyhow::Result<()> {
        for mode in [
            DecodeMode::Sequential,
            DecodeMode::BatchParallel { batch_size: 3 },
        ] {
            let decoder = Arc::new(JpegDecoder::default());
            let (acc, frames) = run_task(decoder, mode, true, &[]).await?;
            assert!(frames.is_empty());
            assert_eq!(acc.total(), 0);
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_decode_failure_is_reported() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut paths = fixture::write_jpegs(dir.path(), 2, 8, 8)?;
        paths.extend(fixture::write_blobs(&dir.path().join("bad"), &[16])?);

        for mode in [
            DecodeMode::Sequential,
            DecodeMode::BatchParallel { batch_size: 2 },
        ] {
            let decoder = Arc::new(JpegDecoder::default());
            let err = run_task(decoder, mode, true, &paths).await.unwrap_err();
            let err = err.downcast::<BusError>()?;
            assert!(matches!(err, BusError::Decode { .. }));
        }
        Ok(())
    }
}
