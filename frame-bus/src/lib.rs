//! Ordered JPEG to planar YCbCr decode pipeline.
//!
//! Files are opened in list order, decoded one at a time or in fixed-size
//! parallel batches, and written out as raw Y, Cb, Cr planes in the same
//! order, with bounded queues between every stage.

pub mod accumulator;
pub mod config;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod handle;
pub mod header;
pub mod opener;
pub mod pipeline;
pub mod scaler;
pub mod sink;

#[cfg(test)]
pub(crate) mod fixture;

pub use config::{DecodeMode, PipelineConfig};
pub use error::BusError;
pub use frame::{ChromaSubsampling, YuvFrame};
pub use pipeline::{Pipeline, PipelineReport};
