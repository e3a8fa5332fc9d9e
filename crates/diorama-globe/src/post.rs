//! Post-processing pipeline: depth of field followed by a color grade.
//!
//! [`PostProcessing`] owns an optional effect chain. When the chain fails to
//! build the pipeline keeps accepting parameter updates but renders the scene
//! directly for the rest of its lifetime.

use std::fmt::Display;

use diorama_config::PostProcessingConfig;
use serde::Serialize;

use crate::focus::FocusSink;
use crate::frame::{FrameRenderer, RenderPath};

/// Converts the user-facing aperture into the bokeh shader's units.
pub const APERTURE_UNIT_SCALE: f32 = 0.00005;

/// User-facing post-processing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PostParams {
    pub focus: f32,
    pub aperture: f32,
    pub maxblur: f32,
    pub saturation: f32,
}

impl Default for PostParams {
    fn default() -> Self {
        Self {
            focus: 9.0,
            aperture: 4.5,
            maxblur: 0.01,
            saturation: 1.3,
        }
    }
}

impl PostParams {
    pub fn from_config(config: &PostProcessingConfig) -> Self {
        Self {
            focus: config.focus,
            aperture: config.aperture,
            maxblur: config.maxblur,
            saturation: config.saturation,
        }
    }

    /// Merge the present fields of `update`; last write wins per field.
    pub fn apply(&mut self, update: &PostParamsUpdate) {
        if let Some(focus) = update.focus {
            self.focus = focus;
        }
        if let Some(aperture) = update.aperture {
            self.aperture = aperture;
        }
        if let Some(maxblur) = update.maxblur {
            self.maxblur = maxblur;
        }
        if let Some(saturation) = update.saturation {
            self.saturation = saturation;
        }
    }
}

/// A partial parameter update. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PostParamsUpdate {
    pub focus: Option<f32>,
    pub aperture: Option<f32>,
    pub maxblur: Option<f32>,
    pub saturation: Option<f32>,
}

impl PostParamsUpdate {
    /// An update that sets every field.
    pub fn full(params: PostParams) -> Self {
        Self {
            focus: Some(params.focus),
            aperture: Some(params.aperture),
            maxblur: Some(params.maxblur),
            saturation: Some(params.saturation),
        }
    }

    pub fn focus(mut self, value: f32) -> Self {
        self.focus = Some(value);
        self
    }

    pub fn aperture(mut self, value: f32) -> Self {
        self.aperture = Some(value);
        self
    }

    pub fn maxblur(mut self, value: f32) -> Self {
        self.maxblur = Some(value);
        self
    }

    pub fn saturation(mut self, value: f32) -> Self {
        self.saturation = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.focus.is_none()
            && self.aperture.is_none()
            && self.maxblur.is_none()
            && self.saturation.is_none()
    }

    fn touches_dof(&self) -> bool {
        self.focus.is_some() || self.aperture.is_some() || self.maxblur.is_some()
    }
}

/// Live uniforms of the depth-of-field stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DofUniforms {
    /// Focus distance in world units.
    pub focus: f32,
    /// Already scaled by [`APERTURE_UNIT_SCALE`].
    pub aperture: f32,
    pub maxblur: f32,
    /// Viewport width / height.
    pub aspect: f32,
}

impl DofUniforms {
    /// Values the chain starts with before any parameters are pushed.
    pub fn initial(aspect: f32) -> Self {
        Self {
            focus: 9.0,
            aperture: 5.0 * APERTURE_UNIT_SCALE,
            maxblur: 0.01,
            aspect,
        }
    }
}

/// Live uniforms of the color-grade stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorGradeUniforms {
    pub saturation: f32,
    pub vignette: f32,
    pub brightness: f32,
    pub contrast: f32,
}

impl Default for ColorGradeUniforms {
    fn default() -> Self {
        Self {
            saturation: 1.2,
            vignette: 0.35,
            brightness: 1.05,
            contrast: 1.05,
        }
    }
}

/// Blur radius the bokeh pass applies at `distance` from the eye.
///
/// Negative values mean the point is behind the focus plane. The result is
/// bounded by `maxblur` on both sides.
pub fn dof_blur_extent(uniforms: &DofUniforms, distance: f32) -> f32 {
    let factor = uniforms.focus - distance;
    (factor * uniforms.aperture)
        .max(-uniforms.maxblur)
        .min(uniforms.maxblur)
}

/// The effect chain behind a [`PostProcessing`] pipeline.
pub trait EffectChain {
    fn dof(&self) -> &DofUniforms;
    fn dof_mut(&mut self) -> &mut DofUniforms;
    fn color_grade(&self) -> &ColorGradeUniforms;
    fn color_grade_mut(&mut self) -> &mut ColorGradeUniforms;
    /// Resize the chain's intermediate targets.
    fn set_size(&mut self, width: u32, height: u32);
}

/// Parameters plus live DOF uniforms, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DofSnapshot {
    pub params: PostParams,
    pub uniforms: DofUniforms,
}

/// Wraps an optional effect chain behind a stable parameter contract.
pub struct PostProcessing<C> {
    chain: Option<C>,
    params: PostParams,
    fault: Option<String>,
}

impl<C: EffectChain> PostProcessing<C> {
    /// Build the chain with `build`. A failure is logged and leaves the
    /// pipeline in degraded mode for good.
    pub fn new<E, F>(params: PostParams, build: F) -> Self
    where
        E: Display,
        F: FnOnce() -> Result<C, E>,
    {
        match build() {
            Ok(chain) => Self {
                chain: Some(chain),
                params,
                fault: None,
            },
            Err(e) => {
                tracing::error!(
                    "Failed to build the post-processing chain, falling back to direct rendering: {e}"
                );
                Self {
                    chain: None,
                    params,
                    fault: Some(e.to_string()),
                }
            }
        }
    }

    /// Merge `update` into the parameters and push its present fields to the
    /// chain.
    pub fn set_parameters(&mut self, update: &PostParamsUpdate) {
        self.params.apply(update);
        let Some(chain) = self.chain.as_mut() else {
            return;
        };

        if update.touches_dof() {
            let dof = chain.dof_mut();
            if let Some(focus) = update.focus {
                dof.focus = focus;
            }
            if let Some(aperture) = update.aperture {
                dof.aperture = aperture * APERTURE_UNIT_SCALE;
            }
            if let Some(maxblur) = update.maxblur {
                dof.maxblur = maxblur;
            }
        }
        if let Some(saturation) = update.saturation {
            chain.color_grade_mut().saturation = saturation;
        }
    }

    /// Write the DOF focus directly. Called every frame by auto-focus.
    pub fn update_focus(&mut self, focus: f32) {
        if let Some(chain) = self.chain.as_mut() {
            chain.dof_mut().focus = focus;
        }
    }

    /// Render one frame through the chain, or directly when degraded.
    pub fn render<R: FrameRenderer<C>>(&mut self, delta: f32, renderer: &mut R) -> RenderPath {
        match self.chain.as_mut() {
            Some(chain) => {
                renderer.render_composed(chain, delta);
                RenderPath::Composed
            }
            None => {
                renderer.render_direct();
                RenderPath::Direct
            }
        }
    }

    pub fn on_window_resize(&mut self, width: u32, height: u32) {
        let Some(chain) = self.chain.as_mut() else {
            return;
        };
        chain.set_size(width, height);
        chain.dof_mut().aspect = width as f32 / height.max(1) as f32;
    }

    pub fn debug_dof(&self) -> Option<DofSnapshot> {
        let Some(chain) = self.chain.as_ref() else {
            tracing::info!("BokehPass not active.");
            return None;
        };
        let snapshot = DofSnapshot {
            params: self.params,
            uniforms: *chain.dof(),
        };
        tracing::info!(
            focus = snapshot.uniforms.focus,
            aperture = snapshot.uniforms.aperture,
            maxblur = snapshot.uniforms.maxblur,
            params = ?snapshot.params,
            "DOF debug"
        );
        Some(snapshot)
    }

    /// Release the chain. Later frames take the direct path.
    pub fn dispose(&mut self) -> Option<C> {
        self.chain.take()
    }

    pub fn params(&self) -> PostParams {
        self.params
    }

    pub fn is_degraded(&self) -> bool {
        self.chain.is_none()
    }

    /// Construction error text, when the chain failed to build.
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn chain(&self) -> Option<&C> {
        self.chain.as_ref()
    }

    pub fn chain_mut(&mut self) -> Option<&mut C> {
        self.chain.as_mut()
    }
}

impl<C: EffectChain> FocusSink for PostProcessing<C> {
    fn update_focus(&mut self, focus: f32) {
        PostProcessing::update_focus(self, focus);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::frame::RenderStats;
    use crate::scene::FrameSnapshot;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct MockChain {
        pub dof: DofUniforms,
        pub grade: ColorGradeUniforms,
        pub size: (u32, u32),
    }

    impl MockChain {
        pub(crate) fn new() -> Self {
            Self {
                dof: DofUniforms::initial(16.0 / 9.0),
                grade: ColorGradeUniforms::default(),
                size: (1280, 720),
            }
        }
    }

    impl EffectChain for MockChain {
        fn dof(&self) -> &DofUniforms {
            &self.dof
        }
        fn dof_mut(&mut self) -> &mut DofUniforms {
            &mut self.dof
        }
        fn color_grade(&self) -> &ColorGradeUniforms {
            &self.grade
        }
        fn color_grade_mut(&mut self) -> &mut ColorGradeUniforms {
            &mut self.grade
        }
        fn set_size(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }
    }

    /// Records what it was asked to draw.
    #[derive(Debug, Default)]
    pub(crate) struct MockRenderer {
        pub prepared: Vec<FrameSnapshot>,
        pub composed: u32,
        pub direct: u32,
        pub composed_focus: Vec<f32>,
        pub stats: RenderStats,
    }

    impl FrameRenderer<MockChain> for MockRenderer {
        fn prepare(&mut self, frame: &FrameSnapshot) {
            self.prepared.push(frame.clone());
        }
        fn render_composed(&mut self, chain: &mut MockChain, _delta: f32) {
            self.composed += 1;
            self.composed_focus.push(chain.dof.focus);
            self.stats.frame += 1;
        }
        fn render_direct(&mut self) {
            self.direct += 1;
            self.stats.frame += 1;
        }
        fn stats(&self) -> RenderStats {
            self.stats
        }
    }

    pub(crate) fn working() -> PostProcessing<MockChain> {
        PostProcessing::new(PostParams::default(), || Ok::<_, String>(MockChain::new()))
    }

    pub(crate) fn degraded() -> PostProcessing<MockChain> {
        PostProcessing::new(PostParams::default(), || {
            Err::<MockChain, _>("composer unavailable")
        })
    }

    #[test]
    fn test_chain_starts_with_initial_uniforms() {
        let post = working();
        let chain = post.chain().unwrap();
        assert_eq!(chain.dof.focus, 9.0);
        assert!((chain.dof.aperture - 0.00025).abs() < 1e-9);
        assert_eq!(chain.dof.maxblur, 0.01);
        assert_eq!(chain.grade, ColorGradeUniforms::default());
        assert!(!post.is_degraded());
        assert_eq!(post.fault(), None);
    }

    #[test]
    fn test_empty_update_is_idempotent() {
        let mut post = working();
        post.set_parameters(&PostParamsUpdate::full(PostParams::default()));
        let params = post.params();
        let chain = post.chain().cloned();

        post.set_parameters(&PostParamsUpdate::default());
        assert_eq!(post.params(), params);
        assert_eq!(post.chain().cloned(), chain);
    }

    #[test]
    fn test_partial_update_changes_only_focus() {
        let mut post = working();
        post.set_parameters(&PostParamsUpdate::full(PostParams::default()));
        let before = post.chain().cloned().unwrap();

        post.set_parameters(&PostParamsUpdate::default().focus(5.0));
        let after = post.chain().cloned().unwrap();
        assert_eq!(after.dof.focus, 5.0);
        assert_eq!(after.dof.aperture, before.dof.aperture);
        assert_eq!(after.dof.maxblur, before.dof.maxblur);
        assert_eq!(after.grade, before.grade);
        assert_eq!(post.params().focus, 5.0);
        assert_eq!(post.params().aperture, 4.5);
    }

    #[test]
    fn test_aperture_is_scaled() {
        let mut post = working();
        for aperture in [0.5f32, 4.5, 12.0] {
            post.set_parameters(&PostParamsUpdate::default().aperture(aperture));
            let uniform = post.chain().unwrap().dof.aperture;
            assert_eq!(uniform, aperture * APERTURE_UNIT_SCALE);
            assert_eq!(post.params().aperture, aperture);
        }
    }

    #[test]
    fn test_saturation_goes_to_color_grade() {
        let mut post = working();
        post.set_parameters(&PostParamsUpdate::default().saturation(0.4));
        let chain = post.chain().unwrap();
        assert_eq!(chain.grade.saturation, 0.4);
        assert_eq!(chain.grade.vignette, 0.35);
        assert_eq!(chain.dof, DofUniforms::initial(16.0 / 9.0));
    }

    #[test]
    fn test_update_focus_is_unscaled_and_skips_params() {
        let mut post = working();
        post.update_focus(7.25);
        assert_eq!(post.chain().unwrap().dof.focus, 7.25);
        assert_eq!(post.params().focus, 9.0);
    }

    #[test]
    fn test_degraded_mode_keeps_params_and_renders_direct() {
        let mut post = degraded();
        assert!(post.is_degraded());
        assert_eq!(post.fault(), Some("composer unavailable"));

        post.set_parameters(&PostParamsUpdate::default().focus(3.0).saturation(2.0));
        assert_eq!(post.params().focus, 3.0);
        assert_eq!(post.params().saturation, 2.0);

        post.update_focus(4.0);
        post.on_window_resize(640, 480);
        assert_eq!(post.debug_dof(), None);

        let mut renderer = MockRenderer::default();
        assert_eq!(post.render(0.016, &mut renderer), RenderPath::Direct);
        assert_eq!(renderer.direct, 1);
        assert_eq!(renderer.composed, 0);
    }

    #[test]
    fn test_render_uses_chain_when_present() {
        let mut post = working();
        let mut renderer = MockRenderer::default();
        assert_eq!(post.render(0.016, &mut renderer), RenderPath::Composed);
        assert_eq!(renderer.composed, 1);
        assert_eq!(renderer.direct, 0);
    }

    #[test]
    fn test_resize_updates_size_and_aspect() {
        let mut post = working();
        post.on_window_resize(1000, 500);
        let chain = post.chain().unwrap();
        assert_eq!(chain.size, (1000, 500));
        assert_eq!(chain.dof.aspect, 2.0);

        post.on_window_resize(800, 0);
        assert!(post.chain().unwrap().dof.aspect.is_finite());
    }

    #[test]
    fn test_debug_dof_snapshot() {
        let mut post = working();
        post.set_parameters(&PostParamsUpdate::default().maxblur(0.02));
        let snapshot = post.debug_dof().unwrap();
        assert_eq!(snapshot.params.maxblur, 0.02);
        assert_eq!(snapshot.uniforms.maxblur, 0.02);
    }

    #[test]
    fn test_dispose_switches_to_direct() {
        let mut post = working();
        assert!(post.dispose().is_some());
        let mut renderer = MockRenderer::default();
        assert_eq!(post.render(0.016, &mut renderer), RenderPath::Direct);
        assert!(post.dispose().is_none());
    }

    #[test]
    fn test_blur_extent_is_bounded() {
        let uniforms = DofUniforms {
            focus: 9.0,
            aperture: 4.5 * APERTURE_UNIT_SCALE,
            maxblur: 0.01,
            aspect: 1.0,
        };
        assert_eq!(dof_blur_extent(&uniforms, 9.0), 0.0);
        // Far background saturates at the blur cap.
        assert_eq!(dof_blur_extent(&uniforms, 1000.0), -0.01);
        assert_eq!(dof_blur_extent(&uniforms, -500.0), 0.01);

        let near = dof_blur_extent(&uniforms, 8.0);
        assert!((near - 4.5 * APERTURE_UNIT_SCALE).abs() < 1e-9);
    }
}
