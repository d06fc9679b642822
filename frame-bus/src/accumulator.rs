/// Running total of input bytes read from disk.
///
/// Owned by the decoder stage and only updated from its own loop, before any
/// concurrent decode work of a batch starts, so no synchronization is needed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ByteAccumulator {
    total: u64,
    files: usize,
}

impl ByteAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, size: u64) {
        self.total += size;
        self.files += 1;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn files(&self) -> usize {
        self.files
    }

    pub fn total_mib(&self) -> f64 {
        self.total as f64 / 1024.0 / 1024.0
    }
}
