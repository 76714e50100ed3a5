//! Audio output through cpal
//!
//! The device pulls interleaved `f32` samples from the reader half of a
//! sample ring on the cpal callback thread; producers push into the writer
//! half through an [`AudioSink`].

mod ring;

pub use ring::{SampleReader, SampleWriter, sample_ring};

use crate::assets::AUDIO_BUFFER_SECS;
use crate::utils::StopSignal;
use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Back-off while the ring is full.
const QUEUE_RETRY: Duration = Duration::from_millis(5);

/// Requested (or obtained) output format. Samples are always interleaved `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioSpec {
    /// Number of interleaved samples covering `secs` of audio.
    pub fn samples_for(&self, secs: f32) -> usize {
        (self.sample_rate as f32 * self.channels as f32 * secs).ceil() as usize
    }
}

/// Cloneable producer side of an open audio device. Only producers share
/// the writer lock; the output callback owns the reader outright.
#[derive(Clone)]
pub struct AudioSink {
    writer: Arc<Mutex<SampleWriter>>,
    spec: AudioSpec,
}

impl AudioSink {
    /// Create a sink and the reader the output callback drains.
    pub fn new(spec: AudioSpec) -> (Self, SampleReader) {
        let (writer, reader) = sample_ring(spec.samples_for(AUDIO_BUFFER_SECS));
        let sink = Self {
            writer: Arc::new(Mutex::new(writer)),
            spec,
        };
        (sink, reader)
    }

    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    /// Queue what fits without blocking, returning the number of samples taken.
    pub fn queue(&self, samples: &[f32]) -> usize {
        self.writer().write(samples)
    }

    /// Queue all samples, waiting for the device to drain the ring.
    /// Returns `false` if `stop` fired before everything was queued.
    pub fn queue_blocking(&self, mut samples: &[f32], stop: &StopSignal) -> bool {
        loop {
            let written = self.queue(samples);
            samples = &samples[written..];
            if samples.is_empty() {
                return true;
            }
            if stop.wait_timeout(QUEUE_RETRY) {
                return false;
            }
        }
    }

    /// Seconds of audio waiting to be played.
    pub fn queued_secs(&self) -> f64 {
        let per_sec = self.spec.sample_rate as f64 * self.spec.channels as f64;
        if per_sec <= 0.0 {
            return 0.0;
        }
        self.writer().available() as f64 / per_sec
    }

    fn writer(&self) -> MutexGuard<'_, SampleWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// An open output device. Created paused; dropping it closes the device.
pub struct AudioDevice {
    stream: cpal::Stream,
    sink: AudioSink,
}

impl AudioDevice {
    /// Open the default output device.
    ///
    /// Any format change is allowed: if the device rejects `desired`, its
    /// default configuration is used instead and reported by the sink's
    /// [`spec`](AudioSink::spec).
    pub fn open(desired: AudioSpec) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output audio device"))?;

        let wanted = StreamConfig {
            channels: desired.channels,
            sample_rate: desired.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        match Self::build(&device, &wanted) {
            Ok(device) => Ok(device),
            Err(e) => {
                log::warn!(
                    "Audio device rejected {}Hz/{}ch ({}), falling back to its default config",
                    desired.sample_rate,
                    desired.channels,
                    e
                );

                let supported = device
                    .default_output_config()
                    .map_err(|e| anyhow!("Failed to get default output config: {}", e))?;
                if supported.sample_format() != SampleFormat::F32 {
                    return Err(anyhow!(
                        "Unsupported output sample format: {:?}",
                        supported.sample_format()
                    ));
                }
                Self::build(&device, &supported.config())
            }
        }
    }

    fn build(device: &cpal::Device, config: &StreamConfig) -> Result<Self> {
        let (sink, mut reader) = AudioSink::new(AudioSpec {
            sample_rate: config.sample_rate,
            channels: config.channels,
        });

        let stream = device.build_output_stream(
            config,
            move |output: &mut [f32], _| {
                reader.read(output);
            },
            |err| log::error!("Audio output error: {}", err),
            None,
        )?;
        stream.pause()?;

        log::info!(
            "Audio device opened: {}Hz, {} channels",
            config.sample_rate,
            config.channels
        );

        Ok(Self { stream, sink })
    }

    pub fn sink(&self) -> AudioSink {
        self.sink.clone()
    }

    pub fn pause(&mut self, pause_on: bool) -> Result<()> {
        if pause_on {
            self.stream.pause()?;
        } else {
            self.stream.play()?;
        }
        Ok(())
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        let _ = self.stream.pause();
        log::info!("Audio device closed");
    }
}
