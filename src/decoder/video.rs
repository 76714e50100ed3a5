use super::{PtsFiller, VideoFrame, chroma_size, copy_plane, take_or_skip, yuv420_len};
use ac_ffmpeg::codec::Decoder;
use ac_ffmpeg::codec::video::frame::{PixelFormat, get_pixel_format};
use ac_ffmpeg::codec::video::scaler::{Algorithm, VideoFrameScaler};
use ac_ffmpeg::codec::video::{self, VideoDecoder};
use ac_ffmpeg::format::stream::Stream;
use ac_ffmpeg::packet::Packet;
use anyhow::{Context, Result};

/// Decodes one video stream into packed YUV420p frames of a fixed size.
///
/// The scaler is (re)built from the first decoded frame and whenever the
/// source format or resolution changes mid-stream.
pub struct VideoStreamDecoder {
    decoder: VideoDecoder,
    scaler: Option<(ScalerKey, VideoFrameScaler)>,
    target_format: PixelFormat,
    width: usize,
    height: usize,
    pts: PtsFiller,
    frame_count: u64,
}

#[derive(Clone, Copy, PartialEq)]
struct ScalerKey {
    format: PixelFormat,
    width: usize,
    height: usize,
}

impl VideoStreamDecoder {
    /// Create a decoder for `stream` producing frames of `width` x `height`.
    pub fn new(stream: &Stream, width: usize, height: usize) -> Result<Self> {
        let decoder = VideoDecoder::from_stream(stream)
            .context("no video decoder for stream")?
            .build()
            .context("failed to open video decoder")?;

        Ok(Self {
            decoder,
            scaler: None,
            target_format: get_pixel_format("yuv420p"),
            width,
            height,
            pts: PtsFiller::new(),
            frame_count: 0,
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Push a packet and return every frame it completes.
    pub fn decode(&mut self, packet: &Packet) -> Result<Vec<VideoFrame>> {
        let mut frames = Vec::new();

        if let Err(e) = self.decoder.try_push(packet.clone()) {
            if !e.is_again() {
                log::warn!("Video decode error: {}", e);
                return Ok(frames);
            }
            // decoder is full, drain it before retrying
            self.drain(&mut frames)?;
            if let Err(e) = self.decoder.try_push(packet.clone()) {
                log::warn!("Video decode retry failed: {}", e);
            }
        }

        self.drain(&mut frames)?;
        Ok(frames)
    }

    /// Flush the decoder at end of stream.
    pub fn flush(&mut self) -> Result<Vec<VideoFrame>> {
        let mut frames = Vec::new();
        self.decoder.flush()?;
        self.drain(&mut frames)?;
        Ok(frames)
    }

    fn drain(&mut self, frames: &mut Vec<VideoFrame>) -> Result<()> {
        while let Some(frame) = take_or_skip(self.decoder.take(), "Video decode") {
            match self.convert(&frame) {
                Ok(converted) => frames.push(converted),
                Err(e) => log::warn!("Dropping undisplayable frame: {:#}", e),
            }
        }
        Ok(())
    }

    fn convert(&mut self, frame: &video::VideoFrame) -> Result<VideoFrame> {
        let key = ScalerKey {
            format: frame.pixel_format(),
            width: frame.width(),
            height: frame.height(),
        };

        let scaler = match &mut self.scaler {
            Some((current, scaler)) if *current == key => scaler,
            slot => {
                log::info!(
                    "Video scaler: {}x{} {} -> {}x{} yuv420p",
                    key.width,
                    key.height,
                    key.format.name(),
                    self.width,
                    self.height
                );
                let scaler = VideoFrameScaler::builder()
                    .source_pixel_format(key.format)
                    .source_width(key.width)
                    .source_height(key.height)
                    .target_pixel_format(self.target_format)
                    .target_width(self.width)
                    .target_height(self.height)
                    .algorithm(Algorithm::Bicubic)
                    .build()
                    .context("failed to create video scaler")?;
                &mut slot.insert((key, scaler)).1
            }
        };
        let scaled = scaler.scale(frame)?;

        let planes = scaled.planes();
        let (cw, ch) = chroma_size(self.width, self.height);
        let mut data = vec![0u8; yuv420_len(self.width, self.height)];
        pack_yuv420(
            &mut data,
            Plane {
                data: planes[0].data(),
                stride: planes[0].line_size(),
                width: self.width,
                height: self.height,
            },
            Plane {
                data: planes[1].data(),
                stride: planes[1].line_size(),
                width: cw,
                height: ch,
            },
            Plane {
                data: planes[2].data(),
                stride: planes[2].line_size(),
                width: cw,
                height: ch,
            },
        );

        self.frame_count += 1;

        Ok(VideoFrame {
            data,
            width: self.width,
            height: self.height,
            pts: Some(self.pts.stamp(frame.pts().as_f64())),
        })
    }
}

#[derive(Clone, Copy)]
struct Plane<'a> {
    data: &'a [u8],
    stride: usize,
    width: usize,
    height: usize,
}

fn pack_yuv420(dst: &mut [u8], y: Plane<'_>, u: Plane<'_>, v: Plane<'_>) {
    let y_size = y.width * y.height;
    let u_size = u.width * u.height;
    let (y_dst, chroma) = dst.split_at_mut(y_size);
    let (u_dst, v_dst) = chroma.split_at_mut(u_size);
    for (out, plane) in [(y_dst, y), (u_dst, u), (v_dst, v)] {
        copy_plane(out, plane.data, plane.stride, plane.width, plane.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::MediaSource;
    use crate::test_media::{Clip, write_clip};

    #[test]
    fn test_decode_clip_to_target_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        let clip = Clip::default();
        write_clip(&path, &clip).unwrap();

        let mut source = MediaSource::open(&path).unwrap();
        let video_index = source.video_stream();
        // scaled down with odd dimensions
        let mut decoder = source.video_decoder(33, 25).unwrap();

        let mut frames = Vec::new();
        while let Some(packet) = source.next_packet().unwrap() {
            if Some(packet.stream_index()) == video_index {
                frames.extend(decoder.decode(&packet).unwrap());
            }
        }
        frames.extend(decoder.flush().unwrap());

        assert_eq!(frames.len(), clip.frames);
        assert_eq!(decoder.frame_count(), clip.frames as u64);
        for frame in &frames {
            assert_eq!((frame.width, frame.height), (33, 25));
            assert_eq!(frame.data.len(), yuv420_len(33, 25));
        }
        let pts: Vec<f64> = frames.iter().filter_map(|f| f.pts).collect();
        assert_eq!(pts.len(), clip.frames);
        assert!(pts.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_pack_yuv420_layout() {
        let y = [10u8, 11, 0, 12, 13, 0];
        let u = [20u8, 0];
        let v = [30u8, 0];
        let mut dst = [0u8; 6];
        pack_yuv420(
            &mut dst,
            Plane {
                data: &y,
                stride: 3,
                width: 2,
                height: 2,
            },
            Plane {
                data: &u,
                stride: 2,
                width: 1,
                height: 1,
            },
            Plane {
                data: &v,
                stride: 2,
                width: 1,
                height: 1,
            },
        );
        assert_eq!(dst, [10, 11, 12, 13, 20, 30]);
    }
}
