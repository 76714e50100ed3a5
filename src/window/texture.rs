//! Streaming IYUV texture
//!
//! CPU-side copy of the texture the window draws. Updates bump a
//! generation counter which the GPU pipeline compares against the last
//! generation it uploaded.

use crate::decoder::{chroma_size, copy_plane, yuv420_len};
use anyhow::{Result, bail};

/// Source planes for a texture update, each with its own row pitch.
#[derive(Debug, Clone, Copy)]
pub struct YuvPlanes<'a> {
    pub y: &'a [u8],
    pub y_pitch: usize,
    pub u: &'a [u8],
    pub u_pitch: usize,
    pub v: &'a [u8],
    pub v_pitch: usize,
}

#[derive(Debug)]
pub struct YuvTexture {
    width: usize,
    height: usize,
    /// Y plane, then U, then V, tightly packed.
    data: Vec<u8>,
    generation: u64,
}

impl YuvTexture {
    pub fn new(width: usize, height: usize) -> Self {
        // black in limited range
        let y_size = width * height;
        let mut data = vec![128u8; yuv420_len(width, height)];
        data[..y_size].fill(16);

        Self {
            width,
            height,
            data,
            generation: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn chroma_size(&self) -> (usize, usize) {
        chroma_size(self.width, self.height)
    }

    /// `(y, u, v)` packed planes.
    pub fn planes(&self) -> (&[u8], &[u8], &[u8]) {
        let (cw, ch) = self.chroma_size();
        let y_size = self.width * self.height;
        let c_size = cw * ch;
        let (y, chroma) = self.data.split_at(y_size);
        let (u, v) = chroma.split_at(c_size);
        (y, u, v)
    }

    /// Replace the whole texture with `planes`.
    pub fn update(&mut self, planes: YuvPlanes<'_>) -> Result<()> {
        let (cw, ch) = self.chroma_size();
        check_plane("Y", planes.y, planes.y_pitch, self.width, self.height)?;
        check_plane("U", planes.u, planes.u_pitch, cw, ch)?;
        check_plane("V", planes.v, planes.v_pitch, cw, ch)?;

        let y_size = self.width * self.height;
        let c_size = cw * ch;
        let (y_dst, chroma) = self.data.split_at_mut(y_size);
        let (u_dst, v_dst) = chroma.split_at_mut(c_size);

        copy_plane(y_dst, planes.y, planes.y_pitch, self.width, self.height);
        copy_plane(u_dst, planes.u, planes.u_pitch, cw, ch);
        copy_plane(v_dst, planes.v, planes.v_pitch, cw, ch);

        self.generation += 1;
        Ok(())
    }
}

fn check_plane(name: &str, src: &[u8], pitch: usize, width: usize, height: usize) -> Result<()> {
    if pitch < width {
        bail!("{} plane pitch {} is smaller than its width {}", name, pitch, width);
    }
    let needed = if height == 0 {
        0
    } else {
        pitch * (height - 1) + width
    };
    if src.len() < needed {
        bail!(
            "{} plane holds {} bytes, {}x{} with pitch {} needs {}",
            name,
            src.len(),
            width,
            height,
            pitch,
            needed
        );
    }
    Ok(())
}
