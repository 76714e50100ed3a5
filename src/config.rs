use crate::assets::{
    AUDIO_CHANNELS, AUDIO_SAMPLE_RATE, FONT_SIZE, WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH,
};
use crate::audio::AudioSpec;
use std::path::PathBuf;

/// Settings of the playback window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub font_size: u16,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            title: String::from(WINDOW_TITLE),
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
            font_size: FONT_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub window: WindowConfig,
    pub audio_enabled: bool,
    pub audio: AudioSpec,
    pub dump_dir: PathBuf,
}

impl Config {
    pub fn new() -> Self {
        Config {
            window: WindowConfig::default(),
            audio_enabled: true,
            audio: AudioSpec {
                sample_rate: AUDIO_SAMPLE_RATE,
                channels: AUDIO_CHANNELS,
            },
            dump_dir: PathBuf::from("."),
        }
    }

    /// Override the window size, ignoring zero values.
    pub fn with_window_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        if let Some(width) = width.filter(|w| *w > 0) {
            self.window.width = width;
        }
        if let Some(height) = height.filter(|h| *h > 0) {
            self.window.height = height;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
