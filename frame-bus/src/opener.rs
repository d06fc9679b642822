use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::{
    error::BusError,
    handle::{FileSender, OpenedFile},
};

/// Opens the input files one by one, in list order, and hands them to the
/// decoder through a bounded queue. A full queue parks the opener.
pub struct FileOpener {
    cancel: CancellationToken,
}

impl FileOpener {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Returns the number of files handed over. The first open or stat
    /// failure stops the stage; the caller closes the queue by dropping
    /// `sender`.
    pub async fn run(&self, paths: Vec<PathBuf>, sender: &FileSender) -> Result<usize, BusError> {
        let mut opened = 0;
        for (index, path) in paths.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                log::debug!("FileOpener: cancelled after {} files", opened);
                break;
            }

            let file = open_file(index, path).await?;
            log::trace!(
                "FileOpener: opened {} ({} bytes)",
                file.path().display(),
                file.size()
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    log::debug!("FileOpener: cancelled after {} files", opened);
                    break;
                }
                result = sender.send(file) => {
                    if result.is_err() {
                        log::debug!("FileOpener: decoder gone, stop opening");
                        break;
                    }
                }
            }
            opened += 1;
        }
        Ok(opened)
    }
}

/// Opens `path` and captures its size.
pub async fn open_file(index: usize, path: PathBuf) -> Result<OpenedFile, BusError> {
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(source) => return Err(BusError::Open { path, source }),
    };
    let size = match file.metadata().await {
        Ok(metadata) => metadata.len(),
        Err(source) => return Err(BusError::Stat { path, source }),
    };
    let file = file.into_std().await;
    Ok(OpenedFile::new(index, path, file, size))
}
