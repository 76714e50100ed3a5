//! Video and audio decoding
//!
//! Video is decoded by FFmpeg and scaled to packed YUV420p for the window
//! texture; audio is decoded and resampled to interleaved `f32` for cpal.

pub mod audio;
pub mod video;

pub use audio::AudioStreamDecoder;
pub use video::VideoStreamDecoder;

use crate::assets::DEFAULT_FRAME_INTERVAL;
use std::fmt::Display;

/// Decoded video frame: Y plane, then U, then V, without stride padding.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// Presentation time in seconds, if the stream carried one.
    pub pts: Option<f64>,
}

impl VideoFrame {
    /// Width and height of the chroma planes.
    pub fn chroma_size(&self) -> (usize, usize) {
        chroma_size(self.width, self.height)
    }

    /// `(y, u, v)` plane slices. Each plane's pitch equals its width.
    pub fn planes(&self) -> (&[u8], &[u8], &[u8]) {
        let (cw, ch) = self.chroma_size();
        let y_size = self.width * self.height;
        let c_size = cw * ch;
        (
            &self.data[..y_size],
            &self.data[y_size..y_size + c_size],
            &self.data[y_size + c_size..y_size + 2 * c_size],
        )
    }
}

/// Chroma plane size for 4:2:0 subsampling, rounding odd dimensions up.
pub fn chroma_size(width: usize, height: usize) -> (usize, usize) {
    (width.div_ceil(2), height.div_ceil(2))
}

/// Byte length of a packed YUV420p frame.
pub fn yuv420_len(width: usize, height: usize) -> usize {
    let (cw, ch) = chroma_size(width, height);
    width * height + 2 * cw * ch
}

/// Copy `height` rows of `width` bytes from `src`, whose rows start every
/// `pitch` bytes, into the tightly packed `dst`.
///
/// Stops at the first row that does not fit in either buffer and returns
/// the number of rows copied.
pub fn copy_plane(dst: &mut [u8], src: &[u8], pitch: usize, width: usize, height: usize) -> usize {
    if width == 0 || height == 0 {
        return 0;
    }

    // no stride padding: single copy
    let size = width * height;
    if pitch == width && src.len() >= size && dst.len() >= size {
        dst[..size].copy_from_slice(&src[..size]);
        return height;
    }

    let mut rows = 0;
    for (row, out) in dst.chunks_exact_mut(width).take(height).enumerate() {
        let start = row * pitch;
        let Some(line) = src.get(start..start + width) else {
            break;
        };
        out.copy_from_slice(line);
        rows += 1;
    }
    rows
}

/// Gives every frame a presentation time.
///
/// Frames without one are placed one frame interval after the previous
/// frame. The interval follows the spacing of the last two stamped frames
/// and starts at [`DEFAULT_FRAME_INTERVAL`].
#[derive(Debug, Clone)]
pub struct PtsFiller {
    last: Option<f64>,
    interval: f64,
}

impl PtsFiller {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_FRAME_INTERVAL)
    }

    fn with_interval(interval: f64) -> Self {
        Self {
            last: None,
            interval,
        }
    }

    pub fn stamp(&mut self, pts: Option<f64>) -> f64 {
        let pts = match pts.filter(|p| p.is_finite()) {
            Some(pts) => {
                if let Some(last) = self.last {
                    let delta = pts - last;
                    // ignore gaps and reordering
                    if delta > 0.0 && delta < 1.0 {
                        self.interval = delta;
                    }
                }
                pts
            }
            None => self.last.map_or(0.0, |last| last + self.interval),
        };
        self.last = Some(pts);
        pts
    }
}

impl Default for PtsFiller {
    fn default() -> Self {
        Self::new()
    }
}

/// Unwrap the result of a decoder `take`, logging a failure and treating it
/// as "nothing more to take" so one bad packet does not end the stream.
pub(crate) fn take_or_skip<T, E: Display>(result: Result<Option<T>, E>, what: &str) -> Option<T> {
    match result {
        Ok(item) => item,
        Err(e) => {
            log::warn!("{} failed, skipping: {}", what, e);
            None
        }
    }
}
