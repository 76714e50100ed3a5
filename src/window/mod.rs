//! Playback window
//!
//! [`Window`] keeps the imperative shape of a classic render loop: set it
//! up with [`init`](Window::init), then inside the per-frame callback of
//! [`run`](Window::run) upload a frame with [`video_refresh`](Window::video_refresh),
//! overlay text with [`add_text`](Window::add_text) and present with
//! [`render`](Window::render). The iced event loop displays whatever was
//! presented last.

mod event_loop;
pub mod geometry;
mod pipeline;
mod scene;
mod surface;
pub mod texture;

pub use geometry::{Rect, letterbox};
pub use scene::{Scene, TextItem};
pub use texture::{YuvPlanes, YuvTexture};

use crate::audio::{AudioDevice, AudioSink, AudioSpec};
use crate::config::WindowConfig;
use anyhow::{Result, anyhow};
use iced::{Color, Font};
use std::sync::{Arc, Mutex};

pub struct Window {
    config: WindowConfig,
    window_rect: Rect,
    texture_rect: Rect,
    texture: Option<Arc<Mutex<YuvTexture>>>,
    font: Option<Font>,
    pending: Scene,
    presented: Scene,
    audio: Option<AudioDevice>,
    initialized: bool,
    running: bool,
}

impl Window {
    pub fn new(config: WindowConfig) -> Self {
        Window {
            config,
            window_rect: Rect::default(),
            texture_rect: Rect::default(),
            texture: None,
            font: None,
            pending: Scene::default(),
            presented: Scene::default(),
            audio: None,
            initialized: false,
            running: false,
        }
    }

    /// Set up the display and texture rectangles, the streaming texture and the font.
    pub fn init(
        &mut self,
        window_width: u32,
        window_height: u32,
        texture_width: u32,
        texture_height: u32,
    ) -> Result<()> {
        if window_width == 0 || window_height == 0 {
            log::error!(
                "Failed to create window, error: invalid size {}x{}",
                window_width,
                window_height
            );
            return Err(anyhow!(
                "invalid window size {}x{}",
                window_width,
                window_height
            ));
        }
        if texture_width == 0 || texture_height == 0 {
            log::error!(
                "Failed to create texture, error: invalid size {}x{}",
                texture_width,
                texture_height
            );
            return Err(anyhow!(
                "invalid texture size {}x{}",
                texture_width,
                texture_height
            ));
        }
        let to_i32 = |v: u32| i32::try_from(v).map_err(|_| anyhow!("size {} out of range", v));

        if self.initialized {
            self.destroy();
        }

        self.window_rect = Rect::sized(to_i32(window_width)?, to_i32(window_height)?);
        self.texture_rect = Rect::sized(to_i32(texture_width)?, to_i32(texture_height)?);
        self.texture = Some(Arc::new(Mutex::new(YuvTexture::new(
            texture_width as usize,
            texture_height as usize,
        ))));
        self.font = Some(crate::assets::FONT_OVERLAY);
        self.pending.clear();
        self.presented.clear();
        self.initialized = true;

        log::debug!(
            "Window initialized: window {}x{}, texture {}x{}",
            window_width,
            window_height,
            texture_width,
            texture_height
        );
        Ok(())
    }

    /// Release everything `init` and `open_audio` created.
    pub fn destroy(&mut self) {
        self.close_audio();
        self.texture = None;
        self.font = None;
        self.pending.clear();
        self.presented.clear();
        self.initialized = false;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.initialized {
            return;
        }
        self.window_rect.w = width.min(i32::MAX as u32) as i32;
        self.window_rect.h = height.min(i32::MAX as u32) as i32;

        let dest = letterbox(self.texture_rect, self.window_rect);
        for scene in [&mut self.pending, &mut self.presented] {
            if scene.video.is_some() {
                scene.video = Some(dest);
            }
        }
    }

    /// Open the window and call `on_frame` once per displayed frame until
    /// the window is closed, Escape is pressed or the callback calls [`quit`](Self::quit).
    pub fn run<F>(&mut self, on_frame: F) -> Result<()>
    where
        F: FnMut(&mut Window) + 'static,
    {
        event_loop::run(self, Box::new(on_frame))
    }

    /// Stop the loop after the current iteration.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Upload a frame into the texture and place it, letterboxed, in the
    /// pending scene. Clears whatever was drawn before.
    pub fn video_refresh(
        &mut self,
        y: &[u8],
        y_pitch: usize,
        u: &[u8],
        u_pitch: usize,
        v: &[u8],
        v_pitch: usize,
    ) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        let Some(texture) = &self.texture else {
            return Ok(());
        };

        texture
            .lock()
            .map_err(|_| anyhow!("texture lock poisoned"))?
            .update(YuvPlanes {
                y,
                y_pitch,
                u,
                u_pitch,
                v,
                v_pitch,
            })?;

        self.pending.clear();
        self.pending.video = Some(letterbox(self.texture_rect, self.window_rect));
        Ok(())
    }

    pub fn add_text(&mut self, text: impl Into<String>, x: i32, y: i32, color: Color) {
        if !self.initialized || self.font.is_none() {
            return;
        }
        self.pending.texts.push(TextItem {
            text: text.into(),
            x,
            y,
            color,
        });
    }

    /// Present the pending scene.
    pub fn render(&mut self) {
        if !self.initialized {
            return;
        }
        self.presented.clone_from(&self.pending);
    }

    /// Open the default audio device and start playback. The obtained
    /// format may differ from `spec`; check [`AudioSink::spec`].
    pub fn open_audio(&mut self, spec: AudioSpec) -> Result<AudioSink> {
        self.close_audio();

        let mut device = AudioDevice::open(spec)
            .inspect_err(|e| log::error!("Failed to open audio device, error: {:#}", e))?;
        device
            .pause(false)
            .inspect_err(|e| log::error!("Failed to start audio device, error: {:#}", e))?;

        let sink = device.sink();
        self.audio = Some(device);
        Ok(sink)
    }

    pub fn close_audio(&mut self) {
        self.audio = None;
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn window_rect(&self) -> Rect {
        self.window_rect
    }

    pub fn texture_rect(&self) -> Rect {
        self.texture_rect
    }

    pub fn font(&self) -> Option<Font> {
        self.font
    }

    pub fn presented(&self) -> &Scene {
        &self.presented
    }

    pub fn texture(&self) -> Option<Arc<Mutex<YuvTexture>>> {
        self.texture.clone()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::new(WindowConfig::default())
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if self.initialized {
            self.destroy();
        }
    }
}
