//! JPEG frame header lookup.
//!
//! Marker segments are `[0xFF][marker: u8][length: u16][payload: length - 2 bytes]`.
//! The frame header (SOFn) carries each component's sampling factors, which
//! fix the layout of the planes the image was encoded with.

use bytes::Buf;

use crate::frame::ChromaSubsampling;

/// Start of image (0xD8)
const MARKER_SOI: u8 = 0xD8;
/// End of image (0xD9)
const MARKER_EOI: u8 = 0xD9;
/// Start of scan (0xDA)
const MARKER_SOS: u8 = 0xDA;
/// Temporary private use (0x01), no length
const MARKER_TEM: u8 = 0x01;

/// Sampling factors of one frame component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSampling {
    pub id: u8,
    pub horizontal: u8,
    pub vertical: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: u16,
    pub height: u16,
    pub components: Vec<ComponentSampling>,
}

impl FrameHeader {
    /// Walks the marker segments up to the first scan and parses the frame
    /// header. Returns `None` if there is none or the data is malformed.
    pub fn parse(mut data: &[u8]) -> Option<FrameHeader> {
        if data.remaining() < 2 || data.get_u8() != 0xFF || data.get_u8() != MARKER_SOI {
            return None;
        }

        loop {
            if data.remaining() < 2 || data.get_u8() != 0xFF {
                return None;
            }
            let mut marker = data.get_u8();
            // any number of 0xFF fill bytes may precede a marker
            while marker == 0xFF {
                if !data.has_remaining() {
                    return None;
                }
                marker = data.get_u8();
            }

            match marker {
                MARKER_SOS | MARKER_EOI => return None,
                MARKER_TEM | 0xD0..=0xD7 => continue,
                _ => {}
            }

            if data.remaining() < 2 {
                return None;
            }
            let length = data.get_u16() as usize;
            if length < 2 || data.remaining() < length - 2 {
                return None;
            }
            let (payload, rest) = data.split_at(length - 2);
            data = rest;

            if is_start_of_frame(marker) {
                return parse_frame(payload);
            }
        }
    }

    pub fn is_grayscale(&self) -> bool {
        self.components.len() == 1
    }

    /// Chroma layout of a three-component image whose two chroma components
    /// share one sampling. `None` for anything else.
    pub fn subsampling(&self) -> Option<ChromaSubsampling> {
        let [luma, cb, cr] = self.components.as_slice() else {
            return None;
        };
        if (cb.horizontal, cb.vertical) != (cr.horizontal, cr.vertical)
            || cb.horizontal == 0
            || cb.vertical == 0
            || luma.horizontal % cb.horizontal != 0
            || luma.vertical % cb.vertical != 0
        {
            return None;
        }
        ChromaSubsampling::from_factors(
            (luma.horizontal / cb.horizontal) as u32,
            (luma.vertical / cb.vertical) as u32,
        )
    }
}

/// SOF0..SOF15, without DHT (0xC4), JPG (0xC8) and DAC (0xCC).
fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

/// `[precision: u8][height: u16][width: u16][count: u8]` followed by
/// `count` x `[id: u8][sampling: u8 (H << 4 | V)][quant table: u8]`.
fn parse_frame(mut payload: &[u8]) -> Option<FrameHeader> {
    if payload.remaining() < 6 {
        return None;
    }
    payload.advance(1);
    let height = payload.get_u16();
    let width = payload.get_u16();
    let count = payload.get_u8() as usize;
    if payload.remaining() < count * 3 {
        return None;
    }

    let components = (0..count)
        .map(|_| {
            let id = payload.get_u8();
            let sampling = payload.get_u8();
            payload.advance(1);
            ComponentSampling {
                id,
                horizontal: sampling >> 4,
                vertical: sampling & 0x0F,
            }
        })
        .collect();

    Some(FrameHeader {
        width,
        height,
        components,
    })
}
