use super::geometry::Rect;
use super::pipeline::VideoPrimitive;
use super::texture::YuvTexture;
use iced::advanced::{self, Widget, layout, widget};
use iced::{Element, Length, Rectangle, Size};
use iced_wgpu::primitive::Renderer as PrimitiveRenderer;
use std::sync::{Arc, Mutex};

/// Widget filling its parent and drawing the window texture at `dest`,
/// relative to its own top-left corner.
pub struct VideoSurface {
    texture: Arc<Mutex<YuvTexture>>,
    dest: Rect,
}

impl VideoSurface {
    pub fn new(texture: Arc<Mutex<YuvTexture>>, dest: Rect) -> Self {
        VideoSurface { texture, dest }
    }

    fn target(&self, bounds: Rectangle) -> Option<Rectangle> {
        if self.dest.is_empty() {
            return None;
        }
        Some(Rectangle {
            x: bounds.x + self.dest.x as f32,
            y: bounds.y + self.dest.y as f32,
            width: self.dest.w as f32,
            height: self.dest.h as f32,
        })
    }
}

impl<Message, Theme, Renderer> Widget<Message, Theme, Renderer> for VideoSurface
where
    Renderer: PrimitiveRenderer,
{
    fn size(&self) -> Size<Length> {
        Size {
            width: Length::Fill,
            height: Length::Fill,
        }
    }

    fn layout(
        &mut self,
        _tree: &mut widget::Tree,
        _renderer: &Renderer,
        limits: &layout::Limits,
    ) -> layout::Node {
        layout::Node::new(limits.resolve(Length::Fill, Length::Fill, limits.max()))
    }

    fn draw(
        &self,
        _tree: &widget::Tree,
        renderer: &mut Renderer,
        _theme: &Theme,
        _style: &advanced::renderer::Style,
        layout: advanced::Layout<'_>,
        _cursor: advanced::mouse::Cursor,
        _viewport: &Rectangle,
    ) {
        if let Some(target) = self.target(layout.bounds()) {
            renderer.draw_primitive(target, VideoPrimitive::new(Arc::clone(&self.texture)));
        }
    }
}

impl<'a, Message, Theme, Renderer> From<VideoSurface> for Element<'a, Message, Theme, Renderer>
where
    Message: 'a,
    Theme: 'a,
    Renderer: 'a + PrimitiveRenderer,
{
    fn from(surface: VideoSurface) -> Self {
        Self::new(surface)
    }
}
