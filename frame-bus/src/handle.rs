use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::BusError;

pub type FileSender = tokio::sync::mpsc::Sender<OpenedFile>;
pub type FileReceiver = tokio::sync::mpsc::Receiver<OpenedFile>;

/// An opened input file travelling from the opener to the decoder.
///
/// The handle owns the OS file; dropping it closes the file. `size` is the
/// on-disk length captured when the file was opened.
#[derive(Debug)]
pub struct OpenedFile {
    index: usize,
    path: PathBuf,
    file: File,
    size: u64,
}

impl OpenedFile {
    pub fn new(index: usize, path: PathBuf, file: File, size: u64) -> Self {
        Self {
            index,
            path,
            file,
            size,
        }
    }

    /// Position of this file in the input path list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads the whole file into memory and closes it.
    pub fn read_all(mut self) -> Result<(usize, PathBuf, Vec<u8>), BusError> {
        let mut data = Vec::with_capacity(self.size as usize);
        if let Err(source) = self.file.read_to_end(&mut data) {
            return Err(BusError::Read {
                path: self.path,
                source,
            });
        }
        Ok((self.index, self.path, data))
    }
}
