//! The per-frame tick.

use glam::Vec3;

use crate::context::GlobeApp;
use crate::focus::FocusSink;
use crate::frame::{FrameRenderer, FrameTime, RenderPath};
use crate::post::EffectChain;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub path: RenderPath,
    /// Sun direction pushed to the terrain, once materials are ready.
    pub sun_direction: Option<Vec3>,
    /// Focus pushed by auto-focus this frame.
    pub focus: Option<f32>,
}

/// Sequences one frame of the viewer.
#[derive(Debug, Default)]
pub struct AnimationDriver {
    ticks: u64,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance and render one frame.
    ///
    /// Order: sun direction, interaction, cloud spin, auto-focus, optional
    /// frame-stat logging, then render. The sun and the rotation are both
    /// settled before anything is drawn.
    pub fn tick<C, R>(
        &mut self,
        app: &mut GlobeApp<C>,
        time: FrameTime,
        renderer: &mut R,
    ) -> TickReport
    where
        C: EffectChain,
        R: FrameRenderer<C>,
    {
        let sun_direction = app.scene.update_sun_direction();

        app.interaction.update(time.elapsed);
        app.scene.group_rotation = app.interaction.orientation();

        app.scene.spin_clouds();

        let focus = app.focus.update(Some(&mut app.post as &mut dyn FocusSink));

        if app.flags.log_frame_info {
            let stats = renderer.stats();
            tracing::info!(
                "Frame: {}, Tris: {}, Calls: {}",
                stats.frame,
                stats.triangles,
                stats.draw_calls
            );
        }

        let snapshot = app.scene.snapshot(&app.camera);
        renderer.prepare(&snapshot);
        let path = app.post.render(time.delta, renderer);

        self.ticks += 1;
        TickReport {
            path,
            sun_direction,
            focus,
        }
    }
}
