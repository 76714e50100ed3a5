use super::geometry::Rect;
use iced::Color;

#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub color: Color,
}

/// Draw list of one frame: the video texture placement, then text on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub video: Option<Rect>,
    pub texts: Vec<TextItem>,
}

impl Scene {
    pub fn clear(&mut self) {
        self.video = None;
        self.texts.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.texts.is_empty()
    }
}
