/// Integer rectangle in window coordinates (logical pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    /// Rectangle at the origin.
    pub const fn sized(w: i32, h: i32) -> Self {
        Rect { x: 0, y: 0, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.w <= self.x + self.w
            && other.y + other.h <= self.y + self.h
    }
}

/// Largest rectangle with the aspect ratio of `texture` that fits inside
/// `window`, centered on the free axis. Empty inputs give an empty rectangle.
pub fn letterbox(texture: Rect, window: Rect) -> Rect {
    if texture.is_empty() || window.is_empty() {
        return Rect::new(window.x, window.y, 0, 0);
    }

    let ratio = texture.w as f64 / texture.h as f64;
    let window_ratio = window.w as f64 / window.h as f64;

    let (w, h) = if window_ratio > ratio {
        // window is wider: fill the height, pillarbox
        let h = window.h;
        (((h as f64 * ratio).round() as i32).clamp(1, window.w), h)
    } else {
        // window is taller (or equal): fill the width, letterbox
        let w = window.w;
        (w, ((w as f64 / ratio).round() as i32).clamp(1, window.h))
    };

    Rect {
        x: window.x + (window.w - w) / 2,
        y: window.y + (window.h - h) / 2,
        w,
        h,
    }
}
