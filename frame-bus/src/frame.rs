use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bytes::Bytes;

pub type FrameSender = tokio::sync::mpsc::Sender<YuvFrame>;
pub type FrameReceiver = tokio::sync::mpsc::Receiver<YuvFrame>;

/// Chroma subsampling of a planar frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChromaSubsampling {
    #[default]
    Yuv420,
    Yuv422,
    Yuv444,
}

impl ChromaSubsampling {
    /// Horizontal and vertical luma samples per chroma sample.
    pub fn factors(&self) -> (u32, u32) {
        match self {
            ChromaSubsampling::Yuv420 => (2, 2),
            ChromaSubsampling::Yuv422 => (2, 1),
            ChromaSubsampling::Yuv444 => (1, 1),
        }
    }

    /// Inverse of [`ChromaSubsampling::factors`].
    pub fn from_factors(horizontal: u32, vertical: u32) -> Option<Self> {
        match (horizontal, vertical) {
            (2, 2) => Some(ChromaSubsampling::Yuv420),
            (2, 1) => Some(ChromaSubsampling::Yuv422),
            (1, 1) => Some(ChromaSubsampling::Yuv444),
            _ => None,
        }
    }

    /// Size of one chroma plane for a `width` x `height` image.
    pub fn chroma_size(&self, width: u32, height: u32) -> (u32, u32) {
        let (hs, vs) = self.factors();
        (width.div_ceil(hs), height.div_ceil(vs))
    }

    /// Total bytes of a frame: one luma plane plus two chroma planes.
    pub fn frame_len(&self, width: u32, height: u32) -> usize {
        let (cw, ch) = self.chroma_size(width, height);
        width as usize * height as usize + 2 * cw as usize * ch as usize
    }
}

impl Display for ChromaSubsampling {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        let s = match self {
            ChromaSubsampling::Yuv420 => "420",
            ChromaSubsampling::Yuv422 => "422",
            ChromaSubsampling::Yuv444 => "444",
        };
        f.write_str(s)
    }
}

impl FromStr for ChromaSubsampling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches("yuv") {
            "420" => Ok(ChromaSubsampling::Yuv420),
            "422" => Ok(ChromaSubsampling::Yuv422),
            "444" => Ok(ChromaSubsampling::Yuv444),
            other => Err(format!("unsupported chroma subsampling: {}", other)),
        }
    }
}

/// A decoded image as three independent planes: Y, then Cb, then Cr.
#[derive(Debug, Clone)]
pub struct YuvFrame {
    index: usize,
    width: u32,
    height: u32,
    subsampling: ChromaSubsampling,
    y: Bytes,
    cb: Bytes,
    cr: Bytes,
}

impl YuvFrame {
    pub fn new(
        index: usize,
        width: u32,
        height: u32,
        subsampling: ChromaSubsampling,
        y: Vec<u8>,
        cb: Vec<u8>,
        cr: Vec<u8>,
    ) -> Self {
        Self {
            index,
            width,
            height,
            subsampling,
            y: Bytes::from(y),
            cb: Bytes::from(cb),
            cr: Bytes::from(cr),
        }
    }

    /// Position of the source file in the input path list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn subsampling(&self) -> ChromaSubsampling {
        self.subsampling
    }

    pub fn y(&self) -> &[u8] {
        &self.y
    }

    pub fn cb(&self) -> &[u8] {
        &self.cb
    }

    pub fn cr(&self) -> &[u8] {
        &self.cr
    }

    /// Planes in output order.
    pub fn planes(&self) -> [&[u8]; 3] {
        [&self.y, &self.cb, &self.cr]
    }

    pub fn len(&self) -> usize {
        self.y.len() + self.cb.len() + self.cr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for YuvFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "YuvFrame index: {}, width: {}, height: {}, subsampling: {}, y: {}, cb: {}, cr: {}",
            self.index,
            self.width,
            self.height,
            self.subsampling,
            self.y.len(),
            self.cb.len(),
            self.cr.len()
        )
    }
}
