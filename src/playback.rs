//! File playback
//!
//! A decode thread demuxes the file, feeds audio straight into the device
//! ring and hands video frames to the window over a bounded channel. The
//! window callback shows each frame once its presentation time is reached
//! on a wall clock anchored at the first frame.

use crate::assets::{FRAME_QUEUE_DEPTH, OVERLAY_COLOR, OVERLAY_MARGIN};
use crate::audio::AudioSink;
use crate::config::Config;
use crate::decoder::{PtsFiller, VideoFrame};
use crate::player::{MediaSource, Player, format_secs};
use crate::utils::StopSignal;
use crate::window::Window;
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError, sync_channel};
use std::thread;
use std::time::{Duration, Instant};

/// Back-off while the frame queue is full.
const SEND_RETRY: Duration = Duration::from_millis(5);

const END_OF_STREAM: &str = "end of stream";

/// Releases decoded frames when they are due.
///
/// Frames arriving without a pts are spaced one frame interval after the
/// previous frame.
pub struct FramePacer {
    frames: Receiver<VideoFrame>,
    pts: PtsFiller,
    /// Wall clock instant and pts of the first frame.
    origin: Option<(Instant, f64)>,
    pending: Option<VideoFrame>,
    disconnected: bool,
    dropped: u64,
}

impl FramePacer {
    pub fn new(frames: Receiver<VideoFrame>) -> Self {
        Self {
            frames,
            pts: PtsFiller::new(),
            origin: None,
            pending: None,
            disconnected: false,
            dropped: 0,
        }
    }

    /// The newest frame due at `now`. Older due frames are skipped.
    pub fn poll(&mut self, now: Instant) -> Option<VideoFrame> {
        let mut due: Option<VideoFrame> = None;

        loop {
            let frame = match self.pending.take() {
                Some(frame) => frame,
                None => match self.frames.try_recv() {
                    Ok(mut frame) => {
                        frame.pts = Some(self.pts.stamp(frame.pts));
                        frame
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.disconnected = true;
                        break;
                    }
                },
            };

            if self.due_at(&frame, now) > now {
                self.pending = Some(frame);
                break;
            }
            if due.replace(frame).is_some() {
                self.dropped += 1;
            }
        }

        due
    }

    fn due_at(&mut self, frame: &VideoFrame, now: Instant) -> Instant {
        let pts = frame.pts.unwrap_or_default();
        let (start, first_pts) = *self.origin.get_or_insert((now, pts));
        let offset = pts - first_pts;
        if offset.is_finite() && offset > 0.0 {
            start + Duration::from_secs_f64(offset)
        } else {
            start
        }
    }

    /// All frames were shown and the decoder is gone.
    pub fn is_finished(&self) -> bool {
        self.disconnected && self.pending.is_none()
    }

    /// Frames skipped because a newer one was already due.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Play `path` in a window until it is closed.
pub fn play(config: &Config, path: &Path) -> Result<()> {
    let player = Player::new();
    let info = player.stream_info(path)?;
    log::info!("{}", info);

    let (width, height) = {
        let source = player.open(path)?;
        source
            .video_size()
            .ok_or_else(|| anyhow!("{} has no video stream", path.display()))?
    };

    let mut window = Window::new(config.window.clone());
    window.init(
        config.window.width,
        config.window.height,
        width as u32,
        height as u32,
    )?;

    let sink = if config.audio_enabled && info.audio().is_some() {
        match window.open_audio(config.audio) {
            Ok(sink) => {
                log::info!("Audio output: {:?}", sink.spec());
                Some(sink)
            }
            Err(e) => {
                log::warn!("Playing without audio, error: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let stop = StopSignal::new();
    let (tx, rx) = sync_channel(FRAME_QUEUE_DEPTH);

    let audio_out = sink.clone();
    let decoder = {
        let path = path.to_path_buf();
        let stop = stop.clone();
        thread::Builder::new()
            .name(String::from("decoder"))
            .spawn(move || {
                if let Err(e) = decode_loop(path, (width, height), sink, tx, stop) {
                    log::error!("Decoder stopped, error: {:#}", e);
                }
            })?
    };

    let duration = info.duration_secs.map(format_secs);
    let text_step = config.window.font_size as i32 + OVERLAY_MARGIN / 2;
    let mut pacer = FramePacer::new(rx);
    let mut shown_end = false;

    let result = window.run(move |window| {
        if let Some(frame) = pacer.poll(Instant::now()) {
            let (y, u, v) = frame.planes();
            let (chroma_width, _) = frame.chroma_size();
            if let Err(e) = window.video_refresh(y, frame.width, u, chroma_width, v, chroma_width)
            {
                log::warn!("Dropping frame, error: {:#}", e);
                return;
            }
            let position = frame.pts.map(format_secs).unwrap_or_else(|| String::from("--:--:--"));
            let label = match &duration {
                Some(total) => format!("{} / {}", position, total),
                None => position,
            };
            window.add_text(label, OVERLAY_MARGIN, OVERLAY_MARGIN, OVERLAY_COLOR);
            window.render();
        } else if pacer.is_finished() && !shown_end {
            shown_end = true;
            log::info!("End of stream, {} frames dropped", pacer.dropped());
            if let Some(sink) = &audio_out {
                log::debug!("{:.2}s of audio left to play", sink.queued_secs());
            }
            window.add_text(
                END_OF_STREAM,
                OVERLAY_MARGIN,
                OVERLAY_MARGIN + text_step,
                OVERLAY_COLOR,
            );
            window.render();
        }
    });

    stop.stop();
    if decoder.join().is_err() {
        log::error!("Decoder thread panicked");
    }
    window.destroy();

    result
}

fn decode_loop(
    path: PathBuf,
    (width, height): (usize, usize),
    sink: Option<AudioSink>,
    frames: SyncSender<VideoFrame>,
    stop: StopSignal,
) -> Result<()> {
    let mut source = MediaSource::open(&path)?;
    let video_index = source.video_stream();
    let audio_index = source.audio_stream();

    let mut video = source.video_decoder(width, height)?;
    let mut audio = match (&sink, audio_index) {
        (Some(sink), Some(_)) => match source.audio_decoder(sink.spec()) {
            Ok(decoder) => Some(decoder),
            Err(e) => {
                log::warn!("Playing video only, audio decoder failed: {:#}", e);
                None
            }
        },
        _ => None,
    };

    while !stop.is_stopped() {
        let Some(packet) = source.next_packet()? else {
            break;
        };
        let index = Some(packet.stream_index());

        if index == video_index {
            for frame in video.decode(&packet)? {
                if !send_frame(&frames, frame, &stop) {
                    return Ok(());
                }
            }
        } else if index == audio_index
            && let (Some(decoder), Some(sink)) = (audio.as_mut(), sink.as_ref())
        {
            let samples = decoder.decode(&packet)?;
            if !sink.queue_blocking(&samples, &stop) {
                return Ok(());
            }
        }
    }
    if stop.is_stopped() {
        return Ok(());
    }

    for frame in video.flush()? {
        if !send_frame(&frames, frame, &stop) {
            return Ok(());
        }
    }
    if let (Some(decoder), Some(sink)) = (audio.as_mut(), sink.as_ref()) {
        let samples = decoder.flush()?;
        sink.queue_blocking(&samples, &stop);
    }

    log::debug!("Decoded {} video frames", video.frame_count());
    Ok(())
}

/// Returns `false` once the receiver is gone or `stop` fired.
fn send_frame(frames: &SyncSender<VideoFrame>, mut frame: VideoFrame, stop: &StopSignal) -> bool {
    loop {
        match frames.try_send(frame) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(_)) => return false,
            Err(TrySendError::Full(back)) => {
                frame = back;
                if stop.wait_timeout(SEND_RETRY) {
                    return false;
                }
            }
        }
    }
}
