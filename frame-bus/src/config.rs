use crate::frame::ChromaSubsampling;

pub const DEFAULT_OPEN_QUEUE_CAPACITY: usize = 200;
pub const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 1;

/// How the decoder stage schedules work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    Sequential,
    BatchParallel { batch_size: usize },
}

/// Pipeline configuration, built once and handed to [`crate::pipeline::Pipeline::new`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    threads: usize,
    decode: bool,
    write: bool,
    open_queue_capacity: usize,
    frame_queue_capacity: usize,
    subsampling: Option<ChromaSubsampling>,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn decode(&self) -> bool {
        self.decode
    }

    pub fn write(&self) -> bool {
        self.write
    }

    pub fn open_queue_capacity(&self) -> usize {
        self.open_queue_capacity
    }

    pub fn frame_queue_capacity(&self) -> usize {
        self.frame_queue_capacity
    }

    /// Forced output subsampling; `None` keeps each image's own.
    pub fn subsampling(&self) -> Option<ChromaSubsampling> {
        self.subsampling
    }

    pub fn mode(&self) -> DecodeMode {
        if self.threads == 1 {
            DecodeMode::Sequential
        } else {
            DecodeMode::BatchParallel {
                batch_size: self.threads,
            }
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Number of threads to use when none was requested.
pub fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    threads: usize,
    decode: bool,
    write: bool,
    open_queue_capacity: usize,
    frame_queue_capacity: usize,
    subsampling: Option<ChromaSubsampling>,
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self {
            threads: 0,
            decode: true,
            write: true,
            open_queue_capacity: DEFAULT_OPEN_QUEUE_CAPACITY,
            frame_queue_capacity: DEFAULT_FRAME_QUEUE_CAPACITY,
            subsampling: None,
        }
    }
}

impl PipelineConfigBuilder {
    /// Batch size of the parallel decoder; 0 = all available cores, 1 = sequential
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn decode(mut self, decode: bool) -> Self {
        self.decode = decode;
        self
    }

    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    pub fn open_queue_capacity(mut self, capacity: usize) -> Self {
        self.open_queue_capacity = capacity;
        self
    }

    pub fn frame_queue_capacity(mut self, capacity: usize) -> Self {
        self.frame_queue_capacity = capacity;
        self
    }

    pub fn subsampling(mut self, subsampling: Option<ChromaSubsampling>) -> Self {
        self.subsampling = subsampling;
        self
    }

    pub fn build(self) -> PipelineConfig {
        let threads = if self.threads == 0 {
            available_threads()
        } else {
            self.threads
        };
        PipelineConfig {
            threads,
            decode: self.decode,
            write: self.write,
            // tokio channels reject a zero capacity
            open_queue_capacity: self.open_queue_capacity.max(1),
            frame_queue_capacity: self.frame_queue_capacity.max(1),
            subsampling: self.subsampling,
        }
    }
}
