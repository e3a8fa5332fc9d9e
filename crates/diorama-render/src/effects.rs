//! Depth-of-field and color-grade chain.
//!
//! The scene is drawn into an HDR color target with its own reverse-Z depth
//! buffer. The bokeh pass reads both and writes a blurred copy; the grade pass
//! reads that copy and writes the swapchain image.
//!
//! Uniform values live on the CPU side, where [`PostProcessing`] mutates them
//! through [`EffectChain`]. They are uploaded once per frame in
//! [`GpuEffectChain::prepare`], together with any pending resize.
//!
//! [`PostProcessing`]: diorama_globe::PostProcessing

use bytemuck::{Pod, Zeroable};
use diorama_config::Config;
use diorama_globe::{ColorGradeUniforms, DofUniforms, EffectChain};
use std::num::NonZeroU64;

use crate::depth::DepthBuffer;

/// Format of the offscreen scene and bokeh targets.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Bokeh blur with 41 taps, matching [`diorama_globe::dof_blur_extent`].
pub const DOF_SHADER_SOURCE: &str = r#"
struct DofParams {
    focus: f32,
    aperture: f32,
    maxblur: f32,
    aspect: f32,
    near: f32,
    far: f32,
    _padding: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: DofParams;

@group(1) @binding(0) var scene_color: texture_2d<f32>;
@group(1) @binding(1) var color_sampler: sampler;
@group(1) @binding(2) var scene_depth: texture_depth_2d;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

// Reverse-Z depth to distance along the view axis.
fn eye_distance(depth: f32) -> f32 {
    return params.near * params.far / (depth * (params.far - params.near) + params.near);
}

fn tap(uv: vec2<f32>) -> vec4<f32> {
    return textureSampleLevel(scene_color, color_sampler, uv, 0.0);
}

@fragment
fn fs_bokeh(in: VertexOutput) -> @location(0) vec4<f32> {
    let depth = textureLoad(scene_depth, vec2<i32>(in.position.xy), 0);
    let factor = params.focus - eye_distance(depth);
    let extent = clamp(factor * params.aperture, -params.maxblur, params.maxblur);
    let blur = vec2<f32>(extent) * vec2<f32>(1.0, params.aspect);

    var offsets = array<vec2<f32>, 16>(
        vec2<f32>(0.0, 0.4),
        vec2<f32>(0.15, 0.37),
        vec2<f32>(0.29, 0.29),
        vec2<f32>(-0.37, 0.15),
        vec2<f32>(0.4, 0.0),
        vec2<f32>(0.37, -0.15),
        vec2<f32>(0.29, -0.29),
        vec2<f32>(-0.15, -0.37),
        vec2<f32>(0.0, -0.4),
        vec2<f32>(-0.15, 0.37),
        vec2<f32>(-0.29, 0.29),
        vec2<f32>(0.37, 0.15),
        vec2<f32>(-0.4, 0.0),
        vec2<f32>(-0.37, -0.15),
        vec2<f32>(-0.29, -0.29),
        vec2<f32>(0.15, -0.37),
    );

    var sum = tap(in.uv);
    for (var i = 0u; i < 16u; i = i + 1u) {
        let offset = offsets[i] * blur;
        sum = sum + tap(in.uv + offset);
        if ((i & 1u) == 1u) {
            sum = sum + tap(in.uv + offset * 0.9);
        } else {
            sum = sum + tap(in.uv + offset * 0.7) + tap(in.uv + offset * 0.4);
        }
    }
    return vec4<f32>(sum.rgb / 41.0, 1.0);
}
"#;

/// Mirrors [`diorama_globe::grade_pixel`] step for step.
pub const COLOR_GRADE_SHADER_SOURCE: &str = r#"
struct GradeParams {
    saturation: f32,
    vignette: f32,
    brightness: f32,
    contrast: f32,
};

@group(0) @binding(0) var<uniform> grade: GradeParams;

@group(1) @binding(0) var input_color: texture_2d<f32>;
@group(1) @binding(1) var color_sampler: sampler;

const LUMA_WEIGHTS = vec3<f32>(0.299, 0.587, 0.114);
const COOL_TINT = vec3<f32>(0.95, 1.0, 1.05);
const WARM_TINT = vec3<f32>(1.05, 1.0, 0.95);

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_grade(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(input_color, color_sampler, in.uv);
    var color = texel.rgb;

    color = (color - vec3<f32>(0.5)) * grade.contrast + vec3<f32>(0.5);
    color = color * grade.brightness;
    let gray = dot(color, LUMA_WEIGHTS);
    color = mix(vec3<f32>(gray), color, grade.saturation);

    let luma = dot(color, LUMA_WEIGHTS);
    color = color * mix(COOL_TINT, WARM_TINT, vec3<f32>(luma));

    let dist = length((in.uv - vec2<f32>(0.5)) * 1.2);
    let vig = 1.0 - smoothstep(0.2, 0.8, dist);
    color = mix(color * (1.0 - grade.vignette), color, vec3<f32>(vig));

    return vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), texel.a);
}
"#;

/// Bokeh uniforms. Must match `DofParams` in [`DOF_SHADER_SOURCE`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DofParams {
    pub focus: f32,
    pub aperture: f32,
    pub maxblur: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub _padding: [f32; 2],
}

impl DofParams {
    pub fn new(uniforms: &DofUniforms, near: f32, far: f32) -> Self {
        Self {
            focus: uniforms.focus,
            aperture: uniforms.aperture,
            maxblur: uniforms.maxblur,
            aspect: uniforms.aspect,
            near,
            far,
            _padding: [0.0; 2],
        }
    }
}

/// Grade uniforms. Must match `GradeParams` in [`COLOR_GRADE_SHADER_SOURCE`].
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GradeParams {
    pub saturation: f32,
    pub vignette: f32,
    pub brightness: f32,
    pub contrast: f32,
}

impl From<&ColorGradeUniforms> for GradeParams {
    fn from(u: &ColorGradeUniforms) -> Self {
        Self {
            saturation: u.saturation,
            vignette: u.vignette,
            brightness: u.brightness,
            contrast: u.contrast,
        }
    }
}

/// Why the chain could not be built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EffectChainError {
    #[error("post-processing is disabled")]
    Disabled,

    #[error("{0:?} cannot be both rendered to and sampled on this adapter")]
    UnsupportedFormat(wgpu::TextureFormat),

    #[error("{width}x{height} exceeds the maximum texture size {max}")]
    Oversize { width: u32, height: u32, max: u32 },
}

/// Construction inputs that do not come from the GPU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub enabled: bool,
    /// Camera clip planes, for depth linearization.
    pub near: f32,
    pub far: f32,
}

impl ChainSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.post_processing.enabled,
            near: config.camera.near,
            far: config.camera.far,
        }
    }
}

fn check_target_size(width: u32, height: u32, max: u32) -> Result<(), EffectChainError> {
    if width > max || height > max {
        return Err(EffectChainError::Oversize { width, height, max });
    }
    Ok(())
}

/// Intermediate targets and the bind groups that read them.
struct Targets {
    scene_color_view: wgpu::TextureView,
    depth: DepthBuffer,
    dof_view: wgpu::TextureView,
    dof_input: wgpu::BindGroup,
    grade_input: wgpu::BindGroup,
}

impl Targets {
    fn new(
        device: &wgpu::Device,
        layouts: (&wgpu::BindGroupLayout, &wgpu::BindGroupLayout),
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> Self {
        let (dof_layout, grade_layout) = layouts;
        let scene_color_view = create_color_target(device, "scene-color", width, height);
        let depth = DepthBuffer::new(device, "scene-depth", width, height);
        let dof_view = create_color_target(device, "dof-output", width, height);

        let dof_input = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("dof-input-bg"),
            layout: dof_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&scene_color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&depth.view),
                },
            ],
        });
        let grade_input = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grade-input-bg"),
            layout: grade_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&dof_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Self {
            scene_color_view,
            depth,
            dof_view,
            dof_input,
            grade_input,
        }
    }
}

/// The GPU effect chain driven by `PostProcessing`.
pub struct GpuEffectChain {
    dof: DofUniforms,
    grade: ColorGradeUniforms,
    near: f32,
    far: f32,
    size: (u32, u32),
    pending_size: Option<(u32, u32)>,
    max_dimension: u32,

    targets: Targets,
    sampler: wgpu::Sampler,
    dof_input_layout: wgpu::BindGroupLayout,
    grade_input_layout: wgpu::BindGroupLayout,

    dof_params_buffer: wgpu::Buffer,
    grade_params_buffer: wgpu::Buffer,
    dof_params_bind_group: wgpu::BindGroup,
    grade_params_bind_group: wgpu::BindGroup,

    dof_pipeline: wgpu::RenderPipeline,
    grade_pipeline: wgpu::RenderPipeline,
}

impl GpuEffectChain {
    /// Build the chain for an `output_format` swapchain of `width` x `height`.
    pub fn new(
        device: &wgpu::Device,
        adapter: &wgpu::Adapter,
        output_format: wgpu::TextureFormat,
        settings: ChainSettings,
        width: u32,
        height: u32,
    ) -> Result<Self, EffectChainError> {
        if !settings.enabled {
            return Err(EffectChainError::Disabled);
        }

        let needed = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if !adapter
            .get_texture_format_features(HDR_FORMAT)
            .allowed_usages
            .contains(needed)
        {
            return Err(EffectChainError::UnsupportedFormat(HDR_FORMAT));
        }

        let max_dimension = device.limits().max_texture_dimension_2d;
        let width = width.max(1);
        let height = height.max(1);
        check_target_size(width, height, max_dimension)?;

        let params_layout = |label: &str, size: u64| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(size),
                    },
                    count: None,
                }],
            })
        };
        let dof_params_layout = params_layout(
            "dof-params-bgl",
            std::mem::size_of::<DofParams>() as u64,
        );
        let grade_params_layout = params_layout(
            "grade-params-bgl",
            std::mem::size_of::<GradeParams>() as u64,
        );

        let color_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let dof_input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("dof-input-bgl"),
            entries: &[
                color_entry(0),
                sampler_entry,
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });
        let grade_input_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("grade-input-bgl"),
                entries: &[color_entry(0), sampler_entry],
            });

        let dof = DofUniforms::initial(width as f32 / height as f32);
        let grade = ColorGradeUniforms::default();

        let dof_params_buffer = {
            use wgpu::util::DeviceExt;
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("dof-params"),
                contents: bytemuck::cast_slice(&[DofParams::new(&dof, settings.near, settings.far)]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };
        let grade_params_buffer = {
            use wgpu::util::DeviceExt;
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("grade-params"),
                contents: bytemuck::cast_slice(&[GradeParams::from(&grade)]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };
        let params_bind_group =
            |label: &str, layout: &wgpu::BindGroupLayout, buffer: &wgpu::Buffer| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            };
        let dof_params_bind_group =
            params_bind_group("dof-params-bg", &dof_params_layout, &dof_params_buffer);
        let grade_params_bind_group =
            params_bind_group("grade-params-bg", &grade_params_layout, &grade_params_buffer);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let dof_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("dof-shader"),
            source: wgpu::ShaderSource::Wgsl(DOF_SHADER_SOURCE.into()),
        });
        let grade_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grade-shader"),
            source: wgpu::ShaderSource::Wgsl(COLOR_GRADE_SHADER_SOURCE.into()),
        });

        let dof_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("dof-pipeline-layout"),
            bind_group_layouts: &[&dof_params_layout, &dof_input_layout],
            immediate_size: 0,
        });
        let grade_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grade-pipeline-layout"),
            bind_group_layouts: &[&grade_params_layout, &grade_input_layout],
            immediate_size: 0,
        });

        let dof_pipeline = create_fullscreen_pipeline(
            device,
            &dof_shader,
            &dof_layout,
            "fs_bokeh",
            HDR_FORMAT,
            "dof-pipeline",
        );
        let grade_pipeline = create_fullscreen_pipeline(
            device,
            &grade_shader,
            &grade_layout,
            "fs_grade",
            output_format,
            "grade-pipeline",
        );

        let targets = Targets::new(
            device,
            (&dof_input_layout, &grade_input_layout),
            &sampler,
            width,
            height,
        );

        log::info!("Effect chain ready at {width}x{height}");

        Ok(Self {
            dof,
            grade,
            near: settings.near,
            far: settings.far,
            size: (width, height),
            pending_size: None,
            max_dimension,
            targets,
            sampler,
            dof_input_layout,
            grade_input_layout,
            dof_params_buffer,
            grade_params_buffer,
            dof_params_bind_group,
            grade_params_bind_group,
            dof_pipeline,
            grade_pipeline,
        })
    }

    /// Apply a pending resize and upload this frame's uniforms.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if let Some((width, height)) = self.pending_size.take()
            && (width, height) != self.size
        {
            self.targets = Targets::new(
                device,
                (&self.dof_input_layout, &self.grade_input_layout),
                &self.sampler,
                width,
                height,
            );
            self.size = (width, height);
            log::debug!("Effect chain resized to {width}x{height}");
        }

        let dof = DofParams::new(&self.dof, self.near, self.far);
        queue.write_buffer(&self.dof_params_buffer, 0, bytemuck::cast_slice(&[dof]));
        let grade = GradeParams::from(&self.grade);
        queue.write_buffer(&self.grade_params_buffer, 0, bytemuck::cast_slice(&[grade]));
    }

    /// Where the scene pass draws its color.
    pub fn scene_color_view(&self) -> &wgpu::TextureView {
        &self.targets.scene_color_view
    }

    pub fn scene_depth(&self) -> &DepthBuffer {
        &self.targets.depth
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Bokeh into the intermediate target, then grade into `surface_view`.
    pub fn execute(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView) {
        self.run_pass(
            encoder,
            &self.dof_pipeline,
            &self.dof_params_bind_group,
            &self.targets.dof_input,
            &self.targets.dof_view,
            "dof-bokeh",
        );
        self.run_pass(
            encoder,
            &self.grade_pipeline,
            &self.grade_params_bind_group,
            &self.targets.grade_input,
            surface_view,
            "color-grade",
        );
    }

    fn run_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        params: &wgpu::BindGroup,
        input: &wgpu::BindGroup,
        target_view: &wgpu::TextureView,
        label: &str,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
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
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, params, &[]);
        pass.set_bind_group(1, input, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl EffectChain for GpuEffectChain {
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

    /// Deferred to the next [`GpuEffectChain::prepare`]. Sizes beyond the
    /// device limit are clamped.
    fn set_size(&mut self, width: u32, height: u32) {
        let clamped = (
            width.clamp(1, self.max_dimension),
            height.clamp(1, self.max_dimension),
        );
        if clamped != (width, height) {
            log::warn!(
                "Effect chain size {width}x{height} clamped to {}x{}",
                clamped.0,
                clamped.1
            );
        }
        self.pending_size = Some(clamped);
    }
}

pub(crate) fn create_color_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HDR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    fragment_entry: &str,
    target_format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}
