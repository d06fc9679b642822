use std::path::PathBuf;

use clap::Parser;
use frame_bus::{config::DEFAULT_OPEN_QUEUE_CAPACITY, ChromaSubsampling, PipelineConfig};

/// jpegstream - prepare a folder of JPEG files for x264
///
/// Reads one JPEG path per line from stdin and writes the decoded frames to
/// stdout as raw planar YCbCr, in input order.
#[derive(Debug, Parser)]
#[command(name = "jpegstream", version)]
pub struct Args {
    /// enable debugging output
    #[arg(long)]
    debug: bool,

    /// do not write data to stdout (for benchmarking)
    #[arg(long)]
    nowrite: bool,

    /// do not decode jpeg data (for benchmarking)
    #[arg(long)]
    nodecode: bool,

    /// number of threads [0 = all cores]
    #[arg(long, default_value_t = 0)]
    numthreads: usize,

    /// cd to this directory before starting
    #[arg(long = "cd", value_name = "DIR")]
    chdir: Option<PathBuf>,

    /// number of opened files buffered ahead of the decoder
    #[arg(long = "queue-size", default_value_t = DEFAULT_OPEN_QUEUE_CAPACITY)]
    queue_size: usize,

    /// force this chroma subsampling (420, 422, 444) instead of each JPEG's own
    #[arg(long)]
    chroma: Option<ChromaSubsampling>,
}

impl Args {
    pub fn chdir(&self) -> Option<&PathBuf> {
        self.chdir.as_ref()
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::builder()
            .threads(self.numthreads)
            .decode(!self.nodecode)
            .write(!self.nowrite)
            .open_queue_capacity(self.queue_size)
            .subsampling(self.chroma)
            .build()
    }
}
