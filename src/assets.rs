use iced::font::{Family, Stretch, Style, Weight};
use iced::{Color, Font};

pub const WINDOW_TITLE: &str = "ffmpeg player demo";
pub const WINDOW_WIDTH: u32 = 1280;
pub const WINDOW_HEIGHT: u32 = 720;

// overlay text
pub const FONT_SIZE: u16 = 16;
pub const FONT_OVERLAY: Font = Font {
    family: Family::Monospace,
    weight: Weight::Normal,
    stretch: Stretch::Normal,
    style: Style::Normal,
};
pub const OVERLAY_COLOR: Color = Color::WHITE;
pub const OVERLAY_MARGIN: i32 = 8;

// audio
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
pub const AUDIO_CHANNELS: u16 = 2;
/// Seconds of interleaved samples the output ring can hold.
pub const AUDIO_BUFFER_SECS: f32 = 0.5;

/// Decoded frames queued between the decode thread and the window loop.
pub const FRAME_QUEUE_DEPTH: usize = 8;
/// Frame spacing assumed for streams without timestamps, in seconds (25 fps).
pub const DEFAULT_FRAME_INTERVAL: f64 = 0.04;

/// File extensions of the remuxed packet dumps.
pub const DUMP_VIDEO_SUFFIX: &str = "video.mkv";
pub const DUMP_AUDIO_SUFFIX: &str = "audio.mka";
