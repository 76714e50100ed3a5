use super::MediaSource;
use crate::assets::{DUMP_AUDIO_SUFFIX, DUMP_VIDEO_SUFFIX};
use ac_ffmpeg::format::io::IO;
use ac_ffmpeg::format::muxer::{Muxer, OutputFormat};
use ac_ffmpeg::packet::Packet;
use anyhow::{Context, Result, bail};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct StreamDump {
    pub stream_index: usize,
    pub output: PathBuf,
    pub packets: u64,
    pub bytes: u64,
    pub key_packets: u64,
}

impl fmt::Display for StreamDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stream #{} -> {}: {} packets ({} key), {} bytes",
            self.stream_index,
            self.output.display(),
            self.packets,
            self.key_packets,
            self.bytes
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumpReport {
    pub video: Option<StreamDump>,
    pub audio: Option<StreamDump>,
    /// Packets of streams that were not dumped.
    pub skipped: u64,
}

impl fmt::Display for DumpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = &self.video {
            writeln!(f, "video {}", v)?;
        }
        if let Some(a) = &self.audio {
            writeln!(f, "audio {}", a)?;
        }
        write!(f, "skipped {} packets of other streams", self.skipped)
    }
}

/// Single-stream Matroska writer.
struct StreamWriter {
    muxer: Muxer<File>,
    dump: StreamDump,
}

impl StreamWriter {
    fn create(source: &MediaSource, stream_index: usize, output: PathBuf) -> Result<Self> {
        let params = source.streams()[stream_index].codec_parameters();

        let file = File::create(&output)
            .with_context(|| format!("unable to create {}", output.display()))?;
        let io = IO::from_seekable_write_stream(file);

        let format = OutputFormat::find_by_name("matroska")
            .context("matroska muxer not available")?;

        let mut builder = Muxer::builder();
        builder.add_stream(&params)?;
        let muxer = builder
            .build(io, format)
            .with_context(|| format!("unable to start muxer for {}", output.display()))?;

        log::info!("Dumping stream #{} to {}", stream_index, output.display());

        Ok(Self {
            muxer,
            dump: StreamDump {
                stream_index,
                output,
                packets: 0,
                bytes: 0,
                key_packets: 0,
            },
        })
    }

    fn push(&mut self, packet: Packet) -> Result<()> {
        log::trace!(
            "stream #{} packet {}: pts={:?} dts={:?} size={} key={}",
            self.dump.stream_index,
            self.dump.packets,
            packet.pts().as_f64(),
            packet.dts().as_f64(),
            packet.data().len(),
            packet.is_key()
        );

        self.dump.packets += 1;
        self.dump.bytes += packet.data().len() as u64;
        if packet.is_key() {
            self.dump.key_packets += 1;
        }

        self.muxer.push(packet.with_stream_index(0))?;
        Ok(())
    }

    fn finish(mut self) -> Result<StreamDump> {
        self.muxer.flush()?;
        self.muxer.close()?;
        Ok(self.dump)
    }
}

/// Output file for one stream: `<out_dir>/<stem>.<suffix>`.
pub(super) fn output_path(input: &Path, out_dir: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("stream");
    out_dir.join(format!("{}.{}", stem, suffix))
}

fn ensure_dumpable(input: &Path, video: Option<usize>, audio: Option<usize>) -> Result<()> {
    if video.is_none() && audio.is_none() {
        bail!("{} has neither video nor audio", input.display());
    }
    Ok(())
}

pub(super) fn dump(mut source: MediaSource, out_dir: &Path) -> Result<DumpReport> {
    let video_index = source.video_stream();
    let audio_index = source.audio_stream();
    ensure_dumpable(source.path(), video_index, audio_index)?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("unable to create {}", out_dir.display()))?;

    let input = source.path().to_path_buf();
    let mut video = match video_index {
        Some(index) => Some(StreamWriter::create(
            &source,
            index,
            output_path(&input, out_dir, DUMP_VIDEO_SUFFIX),
        )?),
        None => None,
    };
    let mut audio = match audio_index {
        Some(index) => Some(StreamWriter::create(
            &source,
            index,
            output_path(&input, out_dir, DUMP_AUDIO_SUFFIX),
        )?),
        None => None,
    };

    let mut skipped = 0u64;
    while let Some(packet) = source.next_packet()? {
        let index = packet.stream_index();
        let writer = if Some(index) == video_index {
            video.as_mut()
        } else if Some(index) == audio_index {
            audio.as_mut()
        } else {
            None
        };

        match writer {
            Some(writer) => writer.push(packet)?,
            None => skipped += 1,
        }
    }

    let report = DumpReport {
        video: video.map(StreamWriter::finish).transpose()?,
        audio: audio.map(StreamWriter::finish).transpose()?,
        skipped,
    };

    log::info!("Dump of {} finished", input.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{Player, StreamKind};
    use crate::test_media::{Clip, write_clip};

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/media/clip.mp4"), Path::new("out"), "video.mkv"),
            PathBuf::from("out/clip.video.mkv")
        );
        assert_eq!(
            output_path(Path::new("noext"), Path::new("."), "audio.mka"),
            PathBuf::from("./noext.audio.mka")
        );
    }

    #[test]
    fn test_report_display() {
        let report = DumpReport {
            video: Some(StreamDump {
                stream_index: 0,
                output: PathBuf::from("clip.video.mkv"),
                packets: 250,
                bytes: 1024,
                key_packets: 3,
            }),
            audio: None,
            skipped: 7,
        };
        assert_eq!(
            report.to_string(),
            "video stream #0 -> clip.video.mkv: 250 packets (3 key), 1024 bytes\n\
             skipped 7 packets of other streams"
        );
    }

    #[test]
    fn test_neither_video_nor_audio() {
        let err = ensure_dumpable(Path::new("data.bin"), None, None).unwrap_err();
        assert_eq!(err.to_string(), "data.bin has neither video nor audio");
        assert!(ensure_dumpable(Path::new("a.mka"), None, Some(0)).is_ok());
        assert!(ensure_dumpable(Path::new("v.mkv"), Some(0), None).is_ok());
    }

    #[test]
    fn test_dump_clip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mkv");
        let clip = Clip::default();
        write_clip(&input, &clip).unwrap();

        let out_dir = dir.path().join("out");
        let player = Player::new();
        let report = player.dump_streams(&input, &out_dir).unwrap();

        let video = report.video.as_ref().unwrap();
        assert_eq!(video.stream_index, 0);
        assert_eq!(video.packets, clip.frames as u64);
        assert!(video.key_packets >= 1);
        assert!(video.bytes > 0);

        let audio = report.audio.as_ref().unwrap();
        assert_eq!(audio.stream_index, 1);
        assert!(audio.packets > 0);
        // 16 bit mono
        assert_eq!(audio.bytes, (clip.secs() * 8000.0) as u64 * 2);
        assert_eq!(report.skipped, 0);

        // each dump is a playable single-stream file
        let info = player.stream_info(&video.output).unwrap();
        assert_eq!(info.streams.len(), 1);
        assert_eq!(info.streams[0].kind, StreamKind::Video);
        assert_eq!(info.streams[0].codec, "mpeg4");

        let info = player.stream_info(&audio.output).unwrap();
        assert_eq!(info.streams.len(), 1);
        assert_eq!(info.streams[0].kind, StreamKind::Audio);
    }

    #[test]
    fn test_dump_video_only_clip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("silent.mkv");
        let clip = Clip {
            sample_rate: None,
            ..Clip::default()
        };
        write_clip(&input, &clip).unwrap();

        let report = Player::new().dump_streams(&input, dir.path()).unwrap();
        assert!(report.audio.is_none());
        assert_eq!(report.video.map(|v| v.packets), Some(clip.frames as u64));
        assert!(!dir.path().join("silent.audio.mka").exists());
    }
}
