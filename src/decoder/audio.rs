use super::take_or_skip;
use crate::audio::AudioSpec;
use ac_ffmpeg::codec::Decoder;
use ac_ffmpeg::codec::audio::frame::get_sample_format;
use ac_ffmpeg::codec::audio::{AudioDecoder, AudioFrame, AudioResampler, ChannelLayout};
use ac_ffmpeg::format::stream::Stream;
use ac_ffmpeg::packet::Packet;
use anyhow::{Context, Result, anyhow, bail};

/// Decodes one audio stream into interleaved `f32` samples matching the
/// output device's rate and channel count.
pub struct AudioStreamDecoder {
    decoder: AudioDecoder,
    resampler: AudioResampler,
    target: AudioSpec,
}

impl AudioStreamDecoder {
    pub fn new(stream: &Stream, target: AudioSpec) -> Result<Self> {
        if target.sample_rate == 0 || target.channels == 0 {
            bail!("invalid output spec {:?}", target);
        }

        let params = stream.codec_parameters();
        let params = params
            .as_audio_codec_parameters()
            .ok_or_else(|| anyhow!("stream is not an audio stream"))?;

        let decoder = AudioDecoder::from_stream(stream)
            .context("no audio decoder for stream")?
            .build()
            .context("failed to open audio decoder")?;

        let target_layout = ChannelLayout::from_channels(target.channels as u32)
            .ok_or_else(|| anyhow!("unsupported channel count {}", target.channels))?;

        let resampler = AudioResampler::builder()
            .source_channel_layout(params.channel_layout().to_owned())
            .source_sample_format(params.sample_format())
            .source_sample_rate(params.sample_rate())
            .target_channel_layout(target_layout)
            .target_sample_format(get_sample_format("flt"))
            .target_sample_rate(target.sample_rate)
            .build()
            .context("failed to create audio resampler")?;

        log::info!(
            "Audio resampler: {}Hz {} -> {}Hz flt, {} channels",
            params.sample_rate(),
            params.sample_format().name(),
            target.sample_rate,
            target.channels
        );

        Ok(Self {
            decoder,
            resampler,
            target,
        })
    }

    /// Push a packet and return the interleaved samples it produced.
    pub fn decode(&mut self, packet: &Packet) -> Result<Vec<f32>> {
        let mut samples = Vec::new();

        if let Err(e) = self.decoder.try_push(packet.clone()) {
            if !e.is_again() {
                log::warn!("Audio decode error: {}", e);
                return Ok(samples);
            }
            self.drain(&mut samples)?;
            if let Err(e) = self.decoder.try_push(packet.clone()) {
                log::warn!("Audio decode retry failed: {}", e);
            }
        }

        self.drain(&mut samples)?;
        Ok(samples)
    }

    /// Flush decoder and resampler at end of stream.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let mut samples = Vec::new();
        self.decoder.flush()?;
        self.drain(&mut samples)?;
        self.resampler.flush()?;
        self.take_resampled(&mut samples)?;
        Ok(samples)
    }

    fn drain(&mut self, samples: &mut Vec<f32>) -> Result<()> {
        while let Some(frame) = take_or_skip(self.decoder.take(), "Audio decode") {
            if frame.samples() == 0 {
                continue;
            }
            if let Err(e) = self.resampler.push(frame) {
                log::warn!("Audio resample failed, skipping frame: {}", e);
                continue;
            }
            self.take_resampled(samples)?;
        }
        Ok(())
    }

    fn take_resampled(&mut self, samples: &mut Vec<f32>) -> Result<()> {
        while let Some(frame) = take_or_skip(self.resampler.take(), "Audio resample") {
            if !append_packed_f32(samples, &frame, self.target.channels as usize) {
                log::warn!(
                    "Resampled audio too small for {} samples",
                    frame.samples()
                );
            }
        }
        Ok(())
    }
}

fn append_packed_f32(out: &mut Vec<f32>, frame: &AudioFrame, channels: usize) -> bool {
    let planes = frame.planes();
    let Some(plane) = planes.first() else {
        return false;
    };
    append_ne_f32(out, plane.data(), frame.samples() * channels)
}

/// Append `count` native-endian `f32` values decoded from `bytes`.
fn append_ne_f32(out: &mut Vec<f32>, bytes: &[u8], count: usize) -> bool {
    let needed = count * size_of::<f32>();
    if bytes.len() < needed {
        return false;
    }
    out.extend(
        bytes[..needed]
            .chunks_exact(size_of::<f32>())
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
    );
    true
}
