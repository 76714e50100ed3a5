//! Media file inspection and packet dumping
//!
//! [`Player`] is the entry point for everything that reads a media file:
//! probing stream metadata, dumping the video and audio packets to their
//! own containers and opening a [`MediaSource`] for playback.

mod dump;
mod source;

pub use dump::{DumpReport, StreamDump};
pub use source::MediaSource;

use ac_ffmpeg::format::stream::Stream;
use ac_ffmpeg::time::Timestamp;
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Other,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::Other => "other",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoParams {
    pub width: usize,
    pub height: usize,
    pub pixel_format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioParams {
    pub sample_rate: u32,
    pub channels: u32,
    pub sample_format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamInfo {
    pub index: usize,
    pub kind: StreamKind,
    pub codec: String,
    /// `num/den` seconds per tick.
    pub time_base: String,
    pub start_secs: Option<f64>,
    pub duration_secs: Option<f64>,
    pub frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioParams>,
}

impl StreamInfo {
    fn from_stream(index: usize, stream: &Stream) -> Self {
        let params = stream.codec_parameters();
        let codec = params
            .decoder_name()
            .or_else(|| params.encoder_name())
            .unwrap_or("unknown")
            .to_string();

        let video = params.as_video_codec_parameters().map(|v| VideoParams {
            width: v.width(),
            height: v.height(),
            pixel_format: v.pixel_format().name().to_string(),
        });
        let audio = params.as_audio_codec_parameters().map(|a| AudioParams {
            sample_rate: a.sample_rate(),
            channels: a.channel_layout().channels(),
            sample_format: a.sample_format().name().to_string(),
        });

        let kind = if video.is_some() {
            StreamKind::Video
        } else if audio.is_some() {
            StreamKind::Audio
        } else {
            StreamKind::Other
        };

        let time_base = stream.time_base();

        StreamInfo {
            index,
            kind,
            codec,
            time_base: format!("{}/{}", time_base.num(), time_base.den()),
            start_secs: seconds(stream.start_time()),
            duration_secs: seconds(stream.duration()),
            frames: stream.frames(),
            video,
            audio,
        }
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream #{} [{}] {}", self.index, self.kind, self.codec)?;
        if let Some(v) = &self.video {
            write!(f, ", {}x{} {}", v.width, v.height, v.pixel_format)?;
        }
        if let Some(a) = &self.audio {
            write!(
                f,
                ", {} Hz, {} ch, {}",
                a.sample_rate, a.channels, a.sample_format
            )?;
        }
        write!(f, ", tb {}", self.time_base)?;
        if let Some(d) = self.duration_secs {
            write!(f, ", {}", format_secs(d))?;
        }
        if let Some(n) = self.frames {
            write!(f, ", {} frames", n)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    /// Longest stream duration.
    pub duration_secs: Option<f64>,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn audio(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.kind == StreamKind::Audio)
    }
}

impl fmt::Display for MediaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input: {}", self.path.display())?;
        if let Some(d) = self.duration_secs {
            write!(f, ", duration {}", format_secs(d))?;
        }
        for stream in &self.streams {
            write!(f, "\n  {}", stream)?;
        }
        Ok(())
    }
}

/// Reads media files. Holds no state: every call opens the file anew.
#[derive(Debug, Default)]
pub struct Player;

impl Player {
    pub fn new() -> Self {
        Player
    }

    /// Probe `path` and describe its streams.
    pub fn stream_info(&self, path: &Path) -> Result<MediaInfo> {
        let source = MediaSource::open(path)?;
        let streams: Vec<StreamInfo> = source
            .streams()
            .iter()
            .enumerate()
            .map(|(index, stream)| StreamInfo::from_stream(index, stream))
            .collect();

        let duration_secs = streams
            .iter()
            .filter_map(|s| s.duration_secs)
            .fold(None, |max: Option<f64>, d| Some(max.map_or(d, |m| m.max(d))));

        Ok(MediaInfo {
            path: path.to_path_buf(),
            duration_secs,
            streams,
        })
    }

    /// Remux the video and audio packets of `path` into separate files in `out_dir`.
    pub fn dump_streams(&self, path: &Path, out_dir: &Path) -> Result<DumpReport> {
        let source = MediaSource::open(path)?;
        dump::dump(source, out_dir)
    }

    /// Open `path` for decoding.
    pub fn open(&self, path: &Path) -> Result<MediaSource> {
        MediaSource::open(path)
    }
}

fn seconds(ts: Timestamp) -> Option<f64> {
    if ts.is_null() {
        return None;
    }
    ts.as_f64().filter(|s| s.is_finite() && *s >= 0.0)
}

/// Format seconds as `HH:MM:SS.mmm`.
pub fn format_secs(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let s = (total_ms / 1000) % 60;
    let m = (total_ms / 60_000) % 60;
    let h = total_ms / 3_600_000;
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_media::{Clip, write_clip};

    fn video_stream() -> StreamInfo {
        StreamInfo {
            index: 0,
            kind: StreamKind::Video,
            codec: String::from("h264"),
            time_base: String::from("1/12800"),
            start_secs: Some(0.0),
            duration_secs: Some(10.0),
            frames: Some(250),
            video: Some(VideoParams {
                width: 1280,
                height: 720,
                pixel_format: String::from("yuv420p"),
            }),
            audio: None,
        }
    }

    fn audio_stream() -> StreamInfo {
        StreamInfo {
            index: 1,
            kind: StreamKind::Audio,
            codec: String::from("aac"),
            time_base: String::from("1/48000"),
            start_secs: Some(0.0),
            duration_secs: Some(10.02),
            frames: None,
            video: None,
            audio: Some(AudioParams {
                sample_rate: 48000,
                channels: 2,
                sample_format: String::from("fltp"),
            }),
        }
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(0.0), "00:00:00.000");
        assert_eq!(format_secs(61.5), "00:01:01.500");
        assert_eq!(format_secs(3725.0049), "01:02:05.005");
        assert_eq!(format_secs(-3.0), "00:00:00.000");
    }

    #[test]
    fn test_stream_display() {
        assert_eq!(
            video_stream().to_string(),
            "Stream #0 [video] h264, 1280x720 yuv420p, tb 1/12800, 00:00:10.000, 250 frames"
        );
        assert_eq!(
            audio_stream().to_string(),
            "Stream #1 [audio] aac, 48000 Hz, 2 ch, fltp, tb 1/48000, 00:00:10.020"
        );
    }

    #[test]
    fn test_media_info_lookup_and_report() {
        let info = MediaInfo {
            path: PathBuf::from("clip.mp4"),
            duration_secs: Some(10.02),
            streams: vec![video_stream(), audio_stream()],
        };
        assert_eq!(info.audio().map(|s| s.index), Some(1));

        let report = info.to_string();
        assert!(report.starts_with("Input: clip.mp4, duration 00:00:10.020"));
        assert_eq!(report.lines().count(), 3);
    }

    #[test]
    fn test_stream_info_of_clip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        let clip = Clip::default();
        write_clip(&path, &clip).unwrap();

        let info = Player::new().stream_info(&path).unwrap();
        assert_eq!(info.path, path);
        assert_eq!(info.streams.len(), 2);

        let video = &info.streams[0];
        assert_eq!(video.kind, StreamKind::Video);
        assert_eq!(video.codec, "mpeg4");
        let params = video.video.as_ref().unwrap();
        assert_eq!((params.width, params.height), (clip.width, clip.height));

        let audio = &info.streams[1];
        assert_eq!(audio.kind, StreamKind::Audio);
        let params = audio.audio.as_ref().unwrap();
        assert_eq!((params.sample_rate, params.channels), (8000, 1));

        // matroska may not carry per-stream durations
        if let Some(duration) = info.duration_secs {
            assert!((duration - clip.secs()).abs() < 0.1, "duration {}", duration);
        }
        assert!(info.to_string().contains("[video] mpeg4, 64x48"));
    }

    #[test]
    fn test_media_info_json() {
        let info = MediaInfo {
            path: PathBuf::from("clip.mp4"),
            duration_secs: None,
            streams: vec![audio_stream()],
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["streams"][0]["kind"], "audio");
        assert_eq!(json["streams"][0]["audio"]["sample_rate"], 48000);
        assert!(json["streams"][0].get("video").is_none());
    }
}
