//! Draws the globe scene: terrain, test objects, stars, clouds and atmosphere.
//!
//! Shaders share four bind groups. Group 0 is the [`SceneUniform`], group 1
//! the material, group 2 the per-draw [`ObjectUniform`] and group 3 the globe
//! uniform and maps read by the terrain and cloud patches. Pipelines are
//! built per color target format on first use, so the same renderer can feed
//! the HDR effect chain or the swapchain directly.

use std::num::NonZeroU64;

use diorama_config::{Config, LightingConfig};
use diorama_globe::{FrameSnapshot, RenderStats, TEST_OBJECTS, cloud_patches, terrain_patches};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::depth::DepthBuffer;
use crate::shader::{
    ATMOSPHERE_SHADER_SOURCE, STANDARD_MATERIAL_TEMPLATE, STARS_SHADER_SOURCE, ShaderError,
    compose_material, with_scene_uniform,
};
use crate::sphere::{GpuMesh, SphereMesh, SphereVertex};
use crate::stars::StarField;
use crate::texture::{GlobeTextureKind, GlobeTextures, GpuTexture};
use crate::uniforms::{GlobeUniform, MaterialUniform, ObjectUniform, SceneUniform};

const EARTH_ROUGHNESS: f32 = 1.0;
const EARTH_METALNESS: f32 = 0.1;
const TEST_OBJECT_SEGMENTS: u32 = 32;

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    size: usize,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn texture_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// A uniform buffer and the bind group exposing it.
struct UniformBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformBinding {
    fn object(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let uniform = ObjectUniform::new(Mat4::IDENTITY, Mat4::IDENTITY);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn material(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        uniform: MaterialUniform,
        maps: (&wgpu::TextureView, &wgpu::TextureView),
        sampler: &wgpu::Sampler,
    ) -> Self {
        let (base_map, roughness_map) = maps;
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(base_map),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(roughness_map),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        Self { buffer, bind_group }
    }
}

struct SceneShaders {
    terrain: wgpu::ShaderModule,
    clouds: wgpu::ShaderModule,
    standard: wgpu::ShaderModule,
    atmosphere: wgpu::ShaderModule,
    stars: wgpu::ShaderModule,
}

impl SceneShaders {
    fn new(device: &wgpu::Device) -> Result<Self, ShaderError> {
        let module = |label: &str, source: String| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };
        let terrain = compose_material(STANDARD_MATERIAL_TEMPLATE, &terrain_patches())?;
        let clouds = compose_material(STANDARD_MATERIAL_TEMPLATE, &cloud_patches())?;
        let standard = compose_material(STANDARD_MATERIAL_TEMPLATE, &[])?;
        Ok(Self {
            terrain: module("terrain-shader", with_scene_uniform(&terrain)),
            clouds: module("cloud-shader", with_scene_uniform(&clouds)),
            standard: module("standard-shader", with_scene_uniform(&standard)),
            atmosphere: module(
                "atmosphere-shader",
                with_scene_uniform(ATMOSPHERE_SHADER_SOURCE),
            ),
            stars: module("stars-shader", with_scene_uniform(STARS_SHADER_SOURCE)),
        })
    }
}

struct PipelineLayouts {
    globe: wgpu::PipelineLayout,
    standard: wgpu::PipelineLayout,
    atmosphere: wgpu::PipelineLayout,
    stars: wgpu::PipelineLayout,
}

/// Fixed-function state of one scene pipeline.
struct PipelineSpec<'a> {
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    layout: &'a wgpu::PipelineLayout,
    vertex_layout: wgpu::VertexBufferLayout<'static>,
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
}

fn create_scene_pipeline(
    device: &wgpu::Device,
    pipeline: PipelineSpec<'_>,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(pipeline.label),
        layout: Some(pipeline.layout),
        vertex: wgpu::VertexState {
            module: pipeline.module,
            entry_point: Some("vs_main"),
            buffers: &[pipeline.vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: pipeline.topology,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: pipeline.cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(DepthBuffer::stencil_state(pipeline.depth_write)),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: pipeline.module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: pipeline.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

/// Additive glow: source scaled by its alpha, added to the destination.
const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

/// A back-culled triangle pipeline over [`SphereVertex`] meshes.
fn lit<'a>(
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    layout: &'a wgpu::PipelineLayout,
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
) -> PipelineSpec<'a> {
    PipelineSpec {
        label,
        module,
        layout,
        vertex_layout: SphereVertex::layout(),
        topology: wgpu::PrimitiveTopology::TriangleList,
        cull_mode: Some(wgpu::Face::Back),
        blend,
        depth_write,
    }
}

/// Every scene pipeline for one color target format.
struct ScenePipelines {
    format: wgpu::TextureFormat,
    terrain: wgpu::RenderPipeline,
    clouds: wgpu::RenderPipeline,
    standard: wgpu::RenderPipeline,
    atmosphere: wgpu::RenderPipeline,
    stars: wgpu::RenderPipeline,
}

impl ScenePipelines {
    fn new(
        device: &wgpu::Device,
        shaders: &SceneShaders,
        layouts: &PipelineLayouts,
        format: wgpu::TextureFormat,
    ) -> Self {
        let terrain = lit(
            "terrain-pipeline",
            &shaders.terrain,
            &layouts.globe,
            Some(wgpu::BlendState::REPLACE),
            true,
        );
        let clouds = lit(
            "cloud-pipeline",
            &shaders.clouds,
            &layouts.globe,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            false,
        );
        let standard = lit(
            "standard-pipeline",
            &shaders.standard,
            &layouts.standard,
            Some(wgpu::BlendState::REPLACE),
            true,
        );
        let atmosphere = PipelineSpec {
            cull_mode: Some(wgpu::Face::Front),
            ..lit(
                "atmosphere-pipeline",
                &shaders.atmosphere,
                &layouts.atmosphere,
                Some(ADDITIVE_BLEND),
                false,
            )
        };
        let stars = PipelineSpec {
            label: "stars-pipeline",
            module: &shaders.stars,
            layout: &layouts.stars,
            vertex_layout: StarField::layout(),
            topology: wgpu::PrimitiveTopology::PointList,
            cull_mode: None,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            depth_write: false,
        };

        log::debug!("Building scene pipelines for {format:?}");
        Self {
            format,
            terrain: create_scene_pipeline(device, terrain, format),
            clouds: create_scene_pipeline(device, clouds, format),
            standard: create_scene_pipeline(device, standard, format),
            atmosphere: create_scene_pipeline(device, atmosphere, format),
            stars: create_scene_pipeline(device, stars, format),
        }
    }
}

struct TestObjectDraw {
    material: UniformBinding,
    object: UniformBinding,
}

/// GPU state for the whole globe scene.
pub struct SceneRenderer {
    lighting: LightingConfig,
    shaders: SceneShaders,
    layouts: PipelineLayouts,
    pipelines: Vec<ScenePipelines>,

    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    globe_buffer: wgpu::Buffer,
    globe_bind_group: wgpu::BindGroup,

    terrain_material: UniformBinding,
    cloud_material: UniformBinding,
    earth_object: UniformBinding,
    cloud_object: UniformBinding,
    atmosphere_object: UniformBinding,
    test_objects: Vec<TestObjectDraw>,

    earth_mesh: GpuMesh,
    atmosphere_mesh: GpuMesh,
    unit_sphere: GpuMesh,
    star_buffer: Option<wgpu::Buffer>,
    star_count: u32,

    show_test_objects: bool,
    frame: u64,
    stats: RenderStats,
}

impl SceneRenderer {
    /// Upload meshes and textures and compile the scene shaders.
    ///
    /// Textures larger than the device allows are downscaled first.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        textures: &GlobeTextures,
        config: &Config,
        stars: &StarField,
    ) -> Result<Self, ShaderError> {
        let shaders = SceneShaders::new(device)?;

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene-bgl"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                std::mem::size_of::<SceneUniform>(),
            )],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-bgl"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    std::mem::size_of::<MaterialUniform>(),
                ),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT),
                texture_entry(2, wgpu::ShaderStages::FRAGMENT),
                sampler_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bgl"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX,
                std::mem::size_of::<ObjectUniform>(),
            )],
        });
        let globe_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globe-bgl"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    std::mem::size_of::<GlobeUniform>(),
                ),
                texture_entry(1, wgpu::ShaderStages::VERTEX_FRAGMENT),
                texture_entry(2, wgpu::ShaderStages::FRAGMENT),
                sampler_entry(3, wgpu::ShaderStages::VERTEX_FRAGMENT),
            ],
        });

        let pipeline_layout = |label: &str, groups: &[&wgpu::BindGroupLayout]| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: groups,
                immediate_size: 0,
            })
        };
        let layouts = PipelineLayouts {
            globe: pipeline_layout(
                "globe-pipeline-layout",
                &[&scene_layout, &material_layout, &object_layout, &globe_layout],
            ),
            standard: pipeline_layout(
                "standard-pipeline-layout",
                &[&scene_layout, &material_layout, &object_layout],
            ),
            atmosphere: pipeline_layout(
                "atmosphere-pipeline-layout",
                &[&scene_layout, &object_layout],
            ),
            stars: pipeline_layout("stars-pipeline-layout", &[&scene_layout]),
        };

        // Longitude wraps, latitude stops at the poles.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("globe-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let max_dimension = device.limits().max_texture_dimension_2d;
        let upload = |kind: GlobeTextureKind| {
            let image = textures.get(kind).clone().fit_within(max_dimension);
            GpuTexture::upload(device, queue, kind.file_name(), &image, kind.is_srgb())
        };
        let day = upload(GlobeTextureKind::Day);
        let height = upload(GlobeTextureKind::Height);
        let specular = upload(GlobeTextureKind::Specular);
        let clouds = upload(GlobeTextureKind::Clouds);
        let night = upload(GlobeTextureKind::Night);
        let white = GpuTexture::white(device, queue);

        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene-uniform"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene-bg"),
            layout: &scene_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let globe_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globe-uniform"),
            size: std::mem::size_of::<GlobeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globe_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globe-bg"),
            layout: &globe_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globe_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&height.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&night.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let terrain_material = UniformBinding::material(
            device,
            &material_layout,
            "terrain-material",
            MaterialUniform::textured(EARTH_ROUGHNESS, EARTH_METALNESS, 1.0),
            (&day.view, &specular.view),
            &sampler,
        );
        let cloud_material = UniformBinding::material(
            device,
            &material_layout,
            "cloud-material",
            MaterialUniform::textured(1.0, 0.0, config.earth.cloud_opacity),
            (&clouds.view, &white.view),
            &sampler,
        );

        let test_objects = TEST_OBJECTS
            .iter()
            .map(|object| {
                let draw = TestObjectDraw {
                    material: UniformBinding::material(
                        device,
                        &material_layout,
                        "test-object-material",
                        MaterialUniform::solid(object.color, object.emissive),
                        (&white.view, &white.view),
                        &sampler,
                    ),
                    object: UniformBinding::object(device, &object_layout, "test-object"),
                };
                let uniform = ObjectUniform::new(object.model_matrix(), Mat4::IDENTITY);
                queue.write_buffer(&draw.object.buffer, 0, bytemuck::cast_slice(&[uniform]));
                draw
            })
            .collect();

        let earth = &config.earth;
        let earth_mesh = GpuMesh::upload(
            device,
            "earth-mesh",
            &SphereMesh::uv_sphere(earth.radius, earth.segments, earth.segments),
        );
        let atmosphere_mesh = GpuMesh::upload(
            device,
            "atmosphere-mesh",
            &SphereMesh::uv_sphere(
                earth.radius * earth.atmosphere_scale,
                earth.segments,
                earth.segments,
            ),
        );
        let unit_sphere = GpuMesh::upload(
            device,
            "test-object-mesh",
            &SphereMesh::uv_sphere(1.0, TEST_OBJECT_SEGMENTS, TEST_OBJECT_SEGMENTS),
        );

        let star_buffer = (!stars.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("star-positions"),
                contents: bytemuck::cast_slice(stars.positions()),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        log::info!(
            "Scene ready: {} earth triangles, {} stars",
            earth_mesh.triangle_count(),
            stars.len()
        );

        Ok(Self {
            lighting: config.lighting.clone(),
            shaders,
            layouts,
            pipelines: Vec::new(),
            scene_buffer,
            scene_bind_group,
            globe_buffer,
            globe_bind_group,
            terrain_material,
            cloud_material,
            earth_object: UniformBinding::object(device, &object_layout, "earth-object"),
            cloud_object: UniformBinding::object(device, &object_layout, "cloud-object"),
            atmosphere_object: UniformBinding::object(device, &object_layout, "atmosphere-object"),
            test_objects,
            earth_mesh,
            atmosphere_mesh,
            unit_sphere,
            star_buffer,
            star_count: stars.len() as u32,
            show_test_objects: false,
            frame: 0,
            stats: RenderStats::default(),
        })
    }

    /// Upload the per-frame uniforms.
    pub fn update(&mut self, queue: &wgpu::Queue, frame: &FrameSnapshot) {
        let write = |buffer: &wgpu::Buffer, bytes: &[u8]| queue.write_buffer(buffer, 0, bytes);

        write(
            &self.scene_buffer,
            bytemuck::cast_slice(&[SceneUniform::new(frame, &self.lighting)]),
        );
        write(
            &self.globe_buffer,
            bytemuck::cast_slice(&[GlobeUniform::new(frame)]),
        );
        write(
            &self.earth_object.buffer,
            bytemuck::cast_slice(&[ObjectUniform::new(frame.earth_model, frame.earth_local)]),
        );
        write(
            &self.cloud_object.buffer,
            bytemuck::cast_slice(&[ObjectUniform::new(frame.cloud_model, frame.cloud_local)]),
        );
        write(
            &self.atmosphere_object.buffer,
            bytemuck::cast_slice(&[ObjectUniform::new(frame.atmosphere_model, Mat4::IDENTITY)]),
        );
        write(
            &self.cloud_material.buffer,
            bytemuck::cast_slice(&[MaterialUniform::textured(1.0, 0.0, frame.cloud_opacity)]),
        );
        self.show_test_objects = frame.show_test_objects;
    }

    fn pipeline_index(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) -> usize {
        if let Some(index) = self.pipelines.iter().position(|p| p.format == format) {
            return index;
        }
        self.pipelines.push(ScenePipelines::new(
            device,
            &self.shaders,
            &self.layouts,
            format,
        ));
        self.pipelines.len() - 1
    }

    /// Draw the scene into `target`, clearing color and depth first.
    ///
    /// Order: terrain, test objects, stars, clouds, atmosphere.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        depth: &DepthBuffer,
    ) {
        let index = self.pipeline_index(device, format);
        let pipelines = &self.pipelines[index];

        let mut triangles = 0u64;
        let mut draw_calls = 0u32;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(depth.attachment()),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_bind_group(0, &self.scene_bind_group, &[]);

            pass.set_pipeline(&pipelines.terrain);
            pass.set_bind_group(1, &self.terrain_material.bind_group, &[]);
            pass.set_bind_group(2, &self.earth_object.bind_group, &[]);
            pass.set_bind_group(3, &self.globe_bind_group, &[]);
            self.earth_mesh.draw(&mut pass);
            triangles += self.earth_mesh.triangle_count();
            draw_calls += 1;

            if self.show_test_objects {
                pass.set_pipeline(&pipelines.standard);
                for draw in &self.test_objects {
                    pass.set_bind_group(1, &draw.material.bind_group, &[]);
                    pass.set_bind_group(2, &draw.object.bind_group, &[]);
                    self.unit_sphere.draw(&mut pass);
                    triangles += self.unit_sphere.triangle_count();
                    draw_calls += 1;
                }
            }

            if let Some(buffer) = &self.star_buffer {
                pass.set_pipeline(&pipelines.stars);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..self.star_count, 0..1);
                draw_calls += 1;
            }

            pass.set_pipeline(&pipelines.clouds);
            pass.set_bind_group(1, &self.cloud_material.bind_group, &[]);
            pass.set_bind_group(2, &self.cloud_object.bind_group, &[]);
            pass.set_bind_group(3, &self.globe_bind_group, &[]);
            self.earth_mesh.draw(&mut pass);
            triangles += self.earth_mesh.triangle_count();
            draw_calls += 1;

            pass.set_pipeline(&pipelines.atmosphere);
            pass.set_bind_group(1, &self.atmosphere_object.bind_group, &[]);
            self.atmosphere_mesh.draw(&mut pass);
            triangles += self.atmosphere_mesh.triangle_count();
            draw_calls += 1;
        }

        self.frame += 1;
        self.stats = RenderStats {
            frame: self.frame,
            triangles,
            draw_calls,
        };
    }

    /// Counts from the most recent [`SceneRenderer::draw`]. Star points are
    /// counted as one draw call and no triangles.
    pub fn stats(&self) -> RenderStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_device;
    use diorama_config::StarsConfig;
    use diorama_globe::{Camera, GlobeScene};

    fn small_config() -> Config {
        let mut config = Config::default();
        config.earth.segments = 16;
        config.stars = StarsConfig {
            count: 64,
            ..StarsConfig::default()
        };
        config
    }

    fn small_textures() -> GlobeTextures {
        GlobeTextures::try_from_fn(|_| {
            Ok::<_, ()>(crate::texture::TextureImage::solid(4, 2, [128; 4]))
        })
        .unwrap()
    }

    #[test]
    fn test_every_scene_shader_composes() {
        assert!(compose_material(STANDARD_MATERIAL_TEMPLATE, &terrain_patches()).is_ok());
        assert!(compose_material(STANDARD_MATERIAL_TEMPLATE, &cloud_patches()).is_ok());
    }

    #[test]
    fn test_draw_counts_visible_meshes() {
        let Some((device, queue)) = create_test_device() else {
            return;
        };
        let config = small_config();
        let stars = StarField::generate(&config.stars);
        let mut renderer =
            SceneRenderer::new(&device, &queue, &small_textures(), &config, &stars).unwrap();

        let mut scene = GlobeScene::from_config(&config);
        scene.show_test_objects = false;
        renderer.update(&queue, &scene.snapshot(&Camera::default()));

        let color = crate::effects::create_color_target(&device, "test-color", 64, 64);
        let depth = DepthBuffer::new(&device, "test-depth", 64, 64);
        let mut encoder = device.create_command_encoder(&Default::default());
        renderer.draw(&device, &mut encoder, &color, crate::HDR_FORMAT, &depth);
        queue.submit([encoder.finish()]);

        let sphere_tris = SphereMesh::uv_sphere(1.0, 16, 16).triangle_count();
        let stats = renderer.stats();
        assert_eq!(stats.frame, 1);
        assert_eq!(stats.draw_calls, 4);
        assert_eq!(stats.triangles, sphere_tris * 3);

        scene.show_test_objects = true;
        renderer.update(&queue, &scene.snapshot(&Camera::default()));
        let mut encoder = device.create_command_encoder(&Default::default());
        renderer.draw(&device, &mut encoder, &color, crate::HDR_FORMAT, &depth);
        queue.submit([encoder.finish()]);
        assert_eq!(renderer.stats().draw_calls, 4 + TEST_OBJECTS.len() as u32);
        assert_eq!(renderer.stats().frame, 2);
    }
}
