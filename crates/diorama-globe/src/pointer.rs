//! Pointer input normalized to device-independent coordinates.

/// A pointer position in normalized device coordinates.
///
/// Both axes span [-1, 1]; `y` points up, so the top edge of the window is
/// `y = 1` and the bottom edge is `y = -1`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
}

impl PointerSample {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Convert a window-space pixel position into a normalized sample.
    ///
    /// A zero-sized window is treated as one pixel wide/tall so a minimized
    /// window never produces NaN.
    pub fn from_pixels(px: f64, py: f64, width: u32, height: u32) -> Self {
        let w = f64::from(width.max(1));
        let h = f64::from(height.max(1));
        Self {
            x: ((px / w) * 2.0 - 1.0) as f32,
            y: (-(py / h) * 2.0 + 1.0) as f32,
        }
    }
}

/// Input events routed to the globe and focus controllers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(PointerSample),
    Move(PointerSample),
    Up,
    /// The pointer left the window; ends a drag like `Up`.
    Leave,
}
