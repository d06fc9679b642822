//! Test fixtures: small files and generated JPEGs on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use jpeg_encoder::{ColorType, Encoder, SamplingFactor};

/// Writes one file per entry of `sizes`, filled with that many bytes.
pub fn write_blobs(dir: &Path, sizes: &[usize]) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(sizes.len());
    for (i, size) in sizes.iter().enumerate() {
        let path = dir.join(format!("blob_{:03}.bin", i));
        std::fs::File::create(&path)?.write_all(&vec![0xAB; *size])?;
        paths.push(path);
    }
    Ok(paths)
}

/// Writes `count` JPEGs of `width` x `height`, each with a distinct gradient.
pub fn write_jpegs(
    dir: &Path,
    count: usize,
    width: u16,
    height: u16,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(count);
    for i in 0..count {
        let path = dir.join(format!("frame_{:03}.jpg", i));
        write_jpeg(&path, i, width, height)?;
        paths.push(path);
    }
    Ok(paths)
}

/// 4:2:0 JPEG with a gradient that differs per `seed`.
pub fn write_jpeg(path: &Path, seed: usize, width: u16, height: u16) -> anyhow::Result<()> {
    write_jpeg_sampled(path, seed, width, height, SamplingFactor::F_2_2)
}

pub fn write_jpeg_sampled(
    path: &Path,
    seed: usize,
    width: u16,
    height: u16,
    sampling: SamplingFactor,
) -> anyhow::Result<()> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height as usize {
        for x in 0..width as usize {
            pixels.push(((x * 255) / width as usize) as u8);
            pixels.push(((y * 255) / height as usize) as u8);
            pixels.push(((seed * 37) % 256) as u8);
        }
    }
    encode_jpeg(path, &pixels, width, height, sampling)
}

/// Encodes interleaved RGB `pixels` at quality 90.
pub fn encode_jpeg(
    path: &Path,
    pixels: &[u8],
    width: u16,
    height: u16,
    sampling: SamplingFactor,
) -> anyhow::Result<()> {
    let mut encoder = Encoder::new_file(path, 90)?;
    encoder.set_sampling_factor(sampling);
    encoder.encode(pixels, width, height, ColorType::Rgb)?;
    Ok(())
}

/// Sum of the on-disk sizes of `paths`.
pub fn total_size(paths: &[PathBuf]) -> anyhow::Result<u64> {
    let mut total = 0;
    for path in paths {
        total += std::fs::metadata(path)?.len();
    }
    Ok(total)
}
