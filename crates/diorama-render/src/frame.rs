//! One frame's worth of GPU handles, presented to the driver as a
//! [`FrameRenderer`].

use diorama_globe::{FrameRenderer, FrameSnapshot, RenderStats};

use crate::depth::DepthBuffer;
use crate::effects::{GpuEffectChain, HDR_FORMAT};
use crate::scene_renderer::SceneRenderer;

/// Borrowed for the duration of a single driver tick.
pub struct GpuFrame<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Swapchain image for this frame.
    pub target: &'a wgpu::TextureView,
    pub target_format: wgpu::TextureFormat,
    pub scene: &'a mut SceneRenderer,
    /// Depth for the direct path, sized to the swapchain.
    pub direct_depth: &'a DepthBuffer,
}

impl FrameRenderer<GpuEffectChain> for GpuFrame<'_> {
    fn prepare(&mut self, frame: &FrameSnapshot) {
        self.scene.update(self.queue, frame);
    }

    fn render_composed(&mut self, chain: &mut GpuEffectChain, _delta: f32) {
        chain.prepare(self.device, self.queue);
        self.scene.draw(
            self.device,
            self.encoder,
            chain.scene_color_view(),
            HDR_FORMAT,
            chain.scene_depth(),
        );
        chain.execute(self.encoder, self.target);
    }

    fn render_direct(&mut self) {
        self.scene.draw(
            self.device,
            self.encoder,
            self.target,
            self.target_format,
            self.direct_depth,
        );
    }

    fn stats(&self) -> RenderStats {
        self.scene.stats()
    }
}

/// Clear `view` to black. Shown while the globe textures are loading.
pub fn clear_frame(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
    let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("loading-clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}
