//! The per-frame rendering seam between the core and the GPU backend.

use serde::Serialize;

use crate::scene::FrameSnapshot;

/// Timing for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds since the driver started.
    pub elapsed: f64,
    /// Zero-based frame index.
    pub frame: u64,
}

/// Draw statistics from the most recent frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RenderStats {
    pub frame: u64,
    pub triangles: u64,
    pub draw_calls: u32,
}

/// Which path a frame took through the post-processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPath {
    /// Scene → depth of field → color grade → screen.
    Composed,
    /// Scene straight to the screen.
    Direct,
}

/// Draws the scene, either through an effect chain `C` or directly.
pub trait FrameRenderer<C> {
    /// Upload this frame's scene state before anything is drawn.
    fn prepare(&mut self, frame: &FrameSnapshot);

    fn render_composed(&mut self, chain: &mut C, delta: f32);

    /// Render the scene with the base camera and no effects.
    fn render_direct(&mut self);

    fn stats(&self) -> RenderStats;
}
