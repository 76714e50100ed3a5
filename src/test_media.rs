//! Small media files written with FFmpeg's built-in encoders, for tests
//! that need a real container to demux and decode.

use ac_ffmpeg::codec::Encoder;
use ac_ffmpeg::codec::audio::frame::get_sample_format;
use ac_ffmpeg::codec::audio::{AudioEncoder, AudioFrameMut, ChannelLayout};
use ac_ffmpeg::codec::video::frame::get_pixel_format;
use ac_ffmpeg::codec::video::{VideoEncoder, VideoFrameMut};
use ac_ffmpeg::format::io::IO;
use ac_ffmpeg::format::muxer::{Muxer, OutputFormat};
use ac_ffmpeg::time::{TimeBase, Timestamp};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct Clip {
    pub width: usize,
    pub height: usize,
    /// Video frames at 25 fps.
    pub frames: usize,
    /// Mono `pcm_s16le` track covering the video, if set.
    pub sample_rate: Option<u32>,
}

impl Default for Clip {
    fn default() -> Self {
        Self {
            width: 64,
            height: 48,
            frames: 10,
            sample_rate: Some(8000),
        }
    }
}

impl Clip {
    pub fn secs(&self) -> f64 {
        self.frames as f64 / 25.0
    }
}

/// Write `clip` as Matroska: black mpeg4 video, then silent PCM audio.
pub fn write_clip(path: &Path, clip: &Clip) -> Result<()> {
    let video_tb = TimeBase::new(1, 25);
    let pixel_format = get_pixel_format("yuv420p");
    let mut video = VideoEncoder::builder("mpeg4")?
        .pixel_format(pixel_format)
        .width(clip.width)
        .height(clip.height)
        .time_base(video_tb)
        .build()?;

    let mut audio = match clip.sample_rate {
        Some(rate) => Some(
            AudioEncoder::builder("pcm_s16le")?
                .sample_rate(rate)
                .channel_layout(
                    ChannelLayout::from_channels(1).context("no mono channel layout")?,
                )
                .sample_format(get_sample_format("s16"))
                .time_base(TimeBase::new(1, rate as i32))
                .build()?,
        ),
        None => None,
    };

    let mut builder = Muxer::builder();
    let video_index = builder.add_stream(&video.codec_parameters().into())?;
    let audio_index = match &audio {
        Some(encoder) => Some(builder.add_stream(&encoder.codec_parameters().into())?),
        None => None,
    };
    let format = OutputFormat::find_by_name("matroska").context("matroska muxer not available")?;
    let file = File::create(path).with_context(|| format!("unable to create {}", path.display()))?;
    let mut muxer = builder.build(IO::from_seekable_write_stream(file), format)?;

    for n in 0..clip.frames {
        let frame = VideoFrameMut::black(pixel_format, clip.width, clip.height)
            .with_time_base(video_tb)
            .with_pts(Timestamp::new(n as i64, video_tb))
            .freeze();
        video.push(frame)?;
        while let Some(packet) = video.take()? {
            muxer.push(packet.with_stream_index(video_index))?;
        }
    }
    video.flush()?;
    while let Some(packet) = video.take()? {
        muxer.push(packet.with_stream_index(video_index))?;
    }

    if let (Some(encoder), Some(index)) = (audio.as_mut(), audio_index) {
        let params = encoder.codec_parameters();
        let rate = params.sample_rate();
        let audio_tb = TimeBase::new(1, rate as i32);
        let total = (clip.secs() * rate as f64) as usize;
        let chunk = (rate / 10) as usize;

        let mut written = 0;
        while written < total {
            let samples = chunk.min(total - written);
            let frame = AudioFrameMut::silence(
                params.channel_layout(),
                params.sample_format(),
                rate,
                samples,
            )
            .with_time_base(audio_tb)
            .with_pts(Timestamp::new(written as i64, audio_tb))
            .freeze();
            encoder.push(frame)?;
            while let Some(packet) = encoder.take()? {
                muxer.push(packet.with_stream_index(index))?;
            }
            written += samples;
        }
        encoder.flush()?;
        while let Some(packet) = encoder.take()? {
            muxer.push(packet.with_stream_index(index))?;
        }
    }

    muxer.flush()?;
    muxer.close()?;
    Ok(())
}
