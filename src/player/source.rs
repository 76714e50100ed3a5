use crate::audio::AudioSpec;
use crate::decoder::{AudioStreamDecoder, VideoStreamDecoder};
use ac_ffmpeg::format::demuxer::{Demuxer, DemuxerWithStreamInfo};
use ac_ffmpeg::format::io::IO;
use ac_ffmpeg::format::stream::Stream;
use ac_ffmpeg::packet::Packet;
use anyhow::{Context, Result, anyhow};
use std::fs::File;
use std::path::{Path, PathBuf};

/// An opened media file with its stream info probed and the streams to
/// play selected.
pub struct MediaSource {
    path: PathBuf,
    demuxer: DemuxerWithStreamInfo<File>,
    video: Option<usize>,
    audio: Option<usize>,
}

impl MediaSource {
    pub fn open(path: &Path) -> Result<Self> {
        let input = File::open(path).with_context(|| format!("unable to open {}", path.display()))?;
        let io = IO::from_seekable_read_stream(input);

        let demuxer = Demuxer::builder()
            .build(io)
            .with_context(|| format!("unrecognized media file {}", path.display()))?
            .find_stream_info(None)
            .map_err(|(_, err)| err)
            .context("failed to probe stream info")?;

        let video = pick_best(demuxer.streams().iter().enumerate().filter_map(|(i, s)| {
            let params = s.codec_parameters();
            let video = params.as_video_codec_parameters()?;
            Some((i, video.width() * video.height()))
        }));
        let audio = pick_best(demuxer.streams().iter().enumerate().filter_map(|(i, s)| {
            let params = s.codec_parameters();
            let audio = params.as_audio_codec_parameters()?;
            Some((i, (audio.channel_layout().channels(), audio.sample_rate())))
        }));

        log::debug!(
            "Opened {}: {} streams, video={:?}, audio={:?}",
            path.display(),
            demuxer.streams().len(),
            video,
            audio
        );

        Ok(Self {
            path: path.to_path_buf(),
            demuxer,
            video,
            audio,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn streams(&self) -> &[Stream] {
        self.demuxer.streams()
    }

    /// Index of the stream selected for video.
    pub fn video_stream(&self) -> Option<usize> {
        self.video
    }

    /// Index of the stream selected for audio.
    pub fn audio_stream(&self) -> Option<usize> {
        self.audio
    }

    /// Coded size of the selected video stream.
    pub fn video_size(&self) -> Option<(usize, usize)> {
        let stream = &self.streams()[self.video?];
        let params = stream.codec_parameters();
        let video = params.as_video_codec_parameters()?;
        Some((video.width(), video.height()))
    }

    pub fn video_decoder(&self, width: usize, height: usize) -> Result<VideoStreamDecoder> {
        let index = self.video.ok_or_else(|| anyhow!("no video stream"))?;
        VideoStreamDecoder::new(&self.streams()[index], width, height)
    }

    pub fn audio_decoder(&self, target: AudioSpec) -> Result<AudioStreamDecoder> {
        let index = self.audio.ok_or_else(|| anyhow!("no audio stream"))?;
        AudioStreamDecoder::new(&self.streams()[index], target)
    }

    /// Next demuxed packet, or `None` at end of file.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        Ok(self.demuxer.take()?)
    }
}

/// Index of the candidate with the highest rank. Ties go to the earlier stream.
fn pick_best<K: Ord>(candidates: impl Iterator<Item = (usize, K)>) -> Option<usize> {
    candidates
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_media::{Clip, write_clip};

    #[test]
    fn test_pick_best_prefers_higher_rank() {
        let sizes = [(0, 320 * 240), (2, 1920 * 1080), (3, 1280 * 720)];
        assert_eq!(pick_best(sizes.into_iter()), Some(2));

        let layouts = [(1, (1u32, 48000u32)), (4, (6, 48000)), (5, (2, 96000))];
        assert_eq!(pick_best(layouts.into_iter()), Some(4));
    }

    #[test]
    fn test_pick_best_ties_go_to_first() {
        let sizes = [(1, 100), (3, 100), (4, 50)];
        assert_eq!(pick_best(sizes.into_iter()), Some(1));
        assert_eq!(pick_best(std::iter::empty::<(usize, u32)>()), None);
    }

    #[test]
    fn test_open_selects_clip_streams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        write_clip(&path, &Clip::default()).unwrap();

        let source = MediaSource::open(&path).unwrap();
        assert_eq!(source.streams().len(), 2);
        assert_eq!(source.video_stream(), Some(0));
        assert_eq!(source.audio_stream(), Some(1));
        assert_eq!(source.video_size(), Some((64, 48)));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = MediaSource::open(&dir.path().join("missing.mkv")).err().unwrap();
        assert!(err.to_string().contains("unable to open"));
    }
}
