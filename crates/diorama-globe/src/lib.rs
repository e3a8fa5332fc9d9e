//! Core of the diorama globe viewer.
//!
//! Everything here is GPU-free: the pointer-driven interaction and focus
//! controllers, the post-processing contract, the scene state, debug commands,
//! the application context and the per-frame animation driver. Rendering is
//! reached through the [`FrameRenderer`] and [`EffectChain`] traits.

pub mod camera;
pub mod color_grade;
pub mod context;
pub mod debug;
pub mod driver;
pub mod events;
pub mod focus;
pub mod frame;
pub mod interaction;
pub mod material;
pub mod pointer;
pub mod post;
pub mod scene;

pub use camera::{Camera, Ray};
pub use color_grade::grade_pixel;
pub use context::{GlobeApp, StateReport};
pub use debug::{CommandParseError, DebugCommand, DebugFlags, Tunable};
pub use driver::{AnimationDriver, TickReport};
pub use events::{DebugFlag, Notification};
pub use focus::{FocusController, FocusSink, FocusState};
pub use frame::{FrameRenderer, FrameTime, RenderPath, RenderStats};
pub use hit_test::{GlobeHitTest, SphereHitTest};
pub use interaction::{CursorHint, GlobeInteraction, InteractionSettings, RotationState};
pub use material::{
    CloudUniforms, ColorDebugMode, DisplacementScale, ShaderAnchor, ShaderPatch, TerrainUniforms,
    cloud_patches, terrain_patches,
};
pub use pointer::{PointerEvent, PointerSample};
pub use post::{
    APERTURE_UNIT_SCALE, ColorGradeUniforms, DofSnapshot, DofUniforms, EffectChain, PostParams,
    PostParamsUpdate, PostProcessing, dof_blur_extent,
};
pub use scene::{FrameSnapshot, GlobeScene, SunLight, TEST_OBJECTS, TestObject};
