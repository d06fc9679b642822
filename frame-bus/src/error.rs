use std::path::PathBuf;

use thiserror::Error;

/// Every failure a pipeline stage can report. None of them is recovered
/// locally; the driver cancels the whole pipeline on the first one.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: zune_jpeg::errors::DecodeErrors,
    },
    #[error("decode {}: {reason}", .path.display())]
    Unsupported { path: PathBuf, reason: String },
    #[error("write output: {0}")]
    Write(#[source] std::io::Error),
    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("pipeline cancelled")]
    Cancelled,
}

impl BusError {
    /// Path of the input file the error refers to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            BusError::Open { path, .. }
            | BusError::Stat { path, .. }
            | BusError::Read { path, .. }
            | BusError::Decode { path, .. }
            | BusError::Unsupported { path, .. } => Some(path),
            BusError::Write(_) | BusError::Task(_) | BusError::Cancelled => None,
        }
    }
}
