//! wgpu backend for the diorama globe.
//!
//! [`SceneRenderer`] draws the globe, clouds, atmosphere, stars and test
//! objects. [`GpuEffectChain`] is the depth-of-field and color-grade chain
//! behind [`diorama_globe::PostProcessing`], and [`GpuFrame`] ties both to the
//! driver's [`diorama_globe::FrameRenderer`] seam.

pub mod depth;
pub mod effects;
pub mod frame;
pub mod gpu;
pub mod scene_renderer;
pub mod shader;
pub mod sphere;
pub mod stars;
pub mod texture;
pub mod uniforms;

pub use depth::DepthBuffer;
pub use effects::{ChainSettings, EffectChainError, GpuEffectChain, HDR_FORMAT};
pub use frame::{GpuFrame, clear_frame};
pub use gpu::{RenderContext, RenderError, SurfaceError, init_render_context_blocking};
pub use scene_renderer::SceneRenderer;
pub use shader::{STANDARD_MATERIAL_TEMPLATE, ShaderError, compose_material};
pub use sphere::{GpuMesh, SphereMesh, SphereVertex};
pub use stars::StarField;
pub use texture::{
    GlobeTextureKind, GlobeTextures, GpuTexture, TextureError, TextureImage, load_texture_image,
};

#[cfg(test)]
pub(crate) mod test_support;
