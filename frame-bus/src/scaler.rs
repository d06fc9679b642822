use crate::frame::{ChromaSubsampling, YuvFrame};

/// Neutral chroma value, used for grayscale images.
const NEUTRAL_CHROMA: u8 = 128;

/// Splits decoded full-resolution YCbCr into planar Y, Cb and Cr, averaging
/// each block of chroma samples down to the target subsampling.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scaler {
    subsampling: ChromaSubsampling,
}

impl Scaler {
    pub fn new(subsampling: ChromaSubsampling) -> Self {
        Self { subsampling }
    }

    /// `pixels` holds `width * height` interleaved `[Y, Cb, Cr]` samples.
    pub fn run(&self, index: usize, width: u32, height: u32, pixels: &[u8]) -> YuvFrame {
        let (hs, vs) = self.subsampling.factors();
        let (cw, ch) = self.subsampling.chroma_size(width, height);
        let chroma_len = cw as usize * ch as usize;

        let mut y = Vec::with_capacity(width as usize * height as usize);
        let mut cb_sum = vec![0u32; chroma_len];
        let mut cr_sum = vec![0u32; chroma_len];
        let mut count = vec![0u32; chroma_len];

        let stride = width as usize * 3;
        for (row, line) in pixels.chunks_exact(stride).take(height as usize).enumerate() {
            let chroma_row = (row as u32 / vs) as usize * cw as usize;
            for (col, sample) in line.chunks_exact(3).enumerate() {
                y.push(sample[0]);

                let at = chroma_row + (col as u32 / hs) as usize;
                cb_sum[at] += sample[1] as u32;
                cr_sum[at] += sample[2] as u32;
                count[at] += 1;
            }
        }

        let cb = average(&cb_sum, &count);
        let cr = average(&cr_sum, &count);
        YuvFrame::new(index, width, height, self.subsampling, y, cb, cr)
    }

    /// Grayscale image: the luma plane as decoded, neutral chroma planes.
    pub fn run_luma(&self, index: usize, width: u32, height: u32, luma: Vec<u8>) -> YuvFrame {
        let (cw, ch) = self.subsampling.chroma_size(width, height);
        let chroma_len = cw as usize * ch as usize;
        YuvFrame::new(
            index,
            width,
            height,
            self.subsampling,
            luma,
            vec![NEUTRAL_CHROMA; chroma_len],
            vec![NEUTRAL_CHROMA; chroma_len],
        )
    }
}

fn average(sums: &[u32], count: &[u32]) -> Vec<u8> {
    sums.iter()
        .zip(count)
        .map(|(&sum, &n)| {
            if n == 0 {
                NEUTRAL_CHROMA
            } else {
                ((sum + n / 2) / n) as u8
            }
        })
        .collect()
}
