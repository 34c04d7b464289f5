//! Point-lit textured meshes rendered into the HDR scene pass.
//!
//! Bind groups:
//! - 0: per-frame uniform (camera, light, lighting mode, bright threshold)
//! - 1: per-draw model + normal matrix (dynamic offset into one buffer)
//! - 2: material (diffuse, specular, sampler)

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::assets::{load_image, ColorSpace, ModelData, Texture, TextureSource};

use super::common::{
    alpha_blend, aligned_stride, sampler_layout_entry, texture_layout_entry, uniform_layout_entry,
    uniform_size, MeshVertex,
};
use super::targets::{DEPTH_FORMAT, HDR_FORMAT};
use super::RenderCtx;

/// Specular exponent used by both lighting models.
pub const SHININESS: f32 = 32.0;

/// Single point light with distance attenuation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(4.0, 4.0, 4.0),
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(1.0),
            specular: Vec3::splat(1.0),
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl PointLight {
    /// Attenuation factor at `distance`; matches the shader.
    pub fn attenuation(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

/// Fragment shader flavor for a draw.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ShaderVariant {
    /// Opaque, back faces culled.
    #[default]
    Lit,
    /// Discards texels with alpha below 0.1 and blends the rest; no culling.
    Blended,
}

/// Per-frame inputs of the lit pass.
#[derive(Debug, Copy, Clone)]
pub struct LitFrame {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_position: Vec3,
    pub light: PointLight,
    pub blinn: bool,
    pub bright_threshold: f32,
}

/// One model drawn with one world matrix.
#[derive(Copy, Clone)]
pub struct LitInstance<'a> {
    pub model: &'a GpuModel,
    pub world: Mat4,
    pub variant: ShaderVariant,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct LightUniform {
    position: [f32; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    attenuation: [f32; 4], // constant, linear, quadratic, shininess
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FrameUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    view_pos: [f32; 4],
    light: LightUniform,
    blinn: u32,
    bright_threshold: f32,
    _pad: [f32; 2],
}

impl FrameUniform {
    fn new(frame: &LitFrame) -> Self {
        let l = &frame.light;
        Self {
            view: frame.view.to_cols_array_2d(),
            projection: frame.projection.to_cols_array_2d(),
            view_pos: frame.view_position.extend(1.0).to_array(),
            light: LightUniform {
                position: l.position.extend(1.0).to_array(),
                ambient: l.ambient.extend(0.0).to_array(),
                diffuse: l.diffuse.extend(0.0).to_array(),
                specular: l.specular.extend(0.0).to_array(),
                attenuation: [l.constant, l.linear, l.quadratic, SHININESS],
            },
            blinn: u32::from(frame.blinn),
            bright_threshold: frame.bright_threshold,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ModelUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

impl ModelUniform {
    fn new(world: Mat4) -> Self {
        Self {
            model: world.to_cols_array_2d(),
            normal: normal_matrix(world).to_cols_array_2d(),
        }
    }
}

/// Inverse transpose of `world`, used to transform normals.
///
/// Falls back to `world` itself when it is singular.
pub fn normal_matrix(world: Mat4) -> Mat4 {
    if world.determinant().abs() <= f32::EPSILON * f32::EPSILON {
        return world;
    }
    world.inverse().transpose()
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    material: usize,
}

/// Uploaded model: meshes plus one material bind group per material slot.
///
/// The last material slot is the fallback used by meshes without a material.
pub struct GpuModel {
    meshes: Vec<GpuMesh>,
    materials: Vec<wgpu::BindGroup>,
    _textures: Vec<Texture>,
}

/// Renderer for [`GpuModel`]s inside the HDR scene pass.
pub struct LitRenderer {
    lit_pipeline: wgpu::RenderPipeline,
    blended_pipeline: wgpu::RenderPipeline,

    material_layout: wgpu::BindGroupLayout,
    material_sampler: wgpu::Sampler,

    frame_ubo: wgpu::Buffer,
    frame_group: wgpu::BindGroup,

    model_layout: wgpu::BindGroupLayout,
    model_ubo: wgpu::Buffer,
    model_group: wgpu::BindGroup,
    model_stride: u64,
    model_capacity: usize,
}

impl LitRenderer {
    pub fn new(ctx: &RenderCtx<'_>) -> Self {
        let device = ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("skyhaven lit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/lit.wgsl").into()),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skyhaven lit frame bgl"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                false,
                uniform_size::<FrameUniform>(),
            )],
        });

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skyhaven lit model bgl"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::VERTEX,
                true,
                uniform_size::<ModelUniform>(),
            )],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skyhaven lit material bgl"),
            entries: &[
                texture_layout_entry(0, wgpu::TextureViewDimension::D2),
                texture_layout_entry(1, wgpu::TextureViewDimension::D2),
                sampler_layout_entry(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skyhaven lit pipeline layout"),
            bind_group_layouts: &[&frame_layout, &model_layout, &material_layout],
            immediate_size: 0,
        });

        let make_pipeline = |label: &str, entry: &str, blend: Option<wgpu::BlendState>, cull: Option<wgpu::Face>| {
            let target = Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[MeshVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry),
                    compilation_options: Default::default(),
                    targets: &[target.clone(), target],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: cull,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        let lit_pipeline = make_pipeline("skyhaven lit pipeline", "fs_main", None, Some(wgpu::Face::Back));
        let blended_pipeline =
            make_pipeline("skyhaven lit blended pipeline", "fs_blend", Some(alpha_blend()), None);

        let frame_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("skyhaven lit frame ubo"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skyhaven lit frame"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_ubo.as_entire_binding(),
            }],
        });

        let model_stride = aligned_stride(
            std::mem::size_of::<ModelUniform>() as u64,
            device.limits().min_uniform_buffer_offset_alignment,
        );
        let (model_ubo, model_group) = create_model_buffer(device, &model_layout, model_stride, 64);

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("skyhaven material sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            lit_pipeline,
            blended_pipeline,
            material_layout,
            material_sampler,
            frame_ubo,
            frame_group,
            model_layout,
            model_ubo,
            model_group,
            model_stride,
            model_capacity: 64,
        }
    }

    /// Uploads `data` to the GPU.
    ///
    /// Unreadable textures are replaced by 1×1 fallbacks (white diffuse,
    /// black specular) and logged.
    pub fn upload_model(&self, ctx: &RenderCtx<'_>, data: &ModelData) -> GpuModel {
        let mut textures = Vec::new();
        let mut materials = Vec::new();

        for material in &data.materials {
            let diffuse = self.load_or_fallback(ctx, material.diffuse.as_ref(), ColorSpace::Srgb, [255; 4]);
            let specular =
                self.load_or_fallback(ctx, material.specular.as_ref(), ColorSpace::Linear, [0, 0, 0, 255]);
            materials.push(self.material_group(ctx.device, &diffuse, &specular, &material.name));
            textures.push(diffuse);
            textures.push(specular);
        }

        let fallback_slot = materials.len();
        let diffuse = Texture::solid(ctx.device, ctx.queue, [255; 4], ColorSpace::Srgb, "skyhaven fallback diffuse");
        let specular =
            Texture::solid(ctx.device, ctx.queue, [0, 0, 0, 255], ColorSpace::Linear, "skyhaven fallback specular");
        materials.push(self.material_group(ctx.device, &diffuse, &specular, "fallback"));
        textures.push(diffuse);
        textures.push(specular);

        let meshes = data
            .meshes
            .iter()
            .map(|mesh| GpuMesh {
                vertex_buffer: ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(mesh.name.as_str()),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                index_buffer: ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(mesh.name.as_str()),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: mesh.indices.len() as u32,
                material: mesh.material.unwrap_or(fallback_slot),
            })
            .collect();

        log::debug!(
            "uploaded {} ({} meshes, {} materials, {} triangles)",
            data.path.display(),
            data.meshes.len(),
            data.materials.len(),
            data.triangle_count()
        );

        GpuModel {
            meshes,
            materials,
            _textures: textures,
        }
    }

    fn load_or_fallback(
        &self,
        ctx: &RenderCtx<'_>,
        source: Option<&TextureSource>,
        color_space: ColorSpace,
        fallback: [u8; 4],
    ) -> Texture {
        match source {
            Some(TextureSource::File(path)) => match load_image(path) {
                Ok(img) => {
                    let label = path.to_string_lossy();
                    return Texture::from_image(ctx.device, ctx.queue, &img, color_space, &label);
                }
                Err(e) => log::warn!("{e}; using fallback texture"),
            },
            Some(TextureSource::Decoded(img)) => {
                return Texture::from_image(ctx.device, ctx.queue, img, color_space, "skyhaven embedded texture");
            }
            None => {}
        }
        Texture::solid(ctx.device, ctx.queue, fallback, color_space, "skyhaven fallback texture")
    }

    fn material_group(
        &self,
        device: &wgpu::Device,
        diffuse: &Texture,
        specular: &Texture,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.material_sampler),
                },
            ],
        })
    }

    /// Writes the frame uniform and one model uniform slot per instance.
    ///
    /// Must run before [`LitRenderer::draw`] with the same `instances`.
    pub fn prepare(&mut self, ctx: &RenderCtx<'_>, frame: &LitFrame, instances: &[LitInstance<'_>]) {
        ctx.queue
            .write_buffer(&self.frame_ubo, 0, bytemuck::bytes_of(&FrameUniform::new(frame)));

        self.ensure_model_capacity(ctx.device, instances.len());

        let stride = self.model_stride as usize;
        let mut bytes = vec![0u8; stride * instances.len()];
        for (i, inst) in instances.iter().enumerate() {
            let u = ModelUniform::new(inst.world);
            let at = i * stride;
            bytes[at..at + std::mem::size_of::<ModelUniform>()].copy_from_slice(bytemuck::bytes_of(&u));
        }
        if !bytes.is_empty() {
            ctx.queue.write_buffer(&self.model_ubo, 0, &bytes);
        }
    }

    fn ensure_model_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.model_capacity {
            return;
        }
        let capacity = required.next_power_of_two();
        let (ubo, group) = create_model_buffer(device, &self.model_layout, self.model_stride, capacity);
        self.model_ubo = ubo;
        self.model_group = group;
        self.model_capacity = capacity;
    }

    /// Records draws for `instances` into the open scene pass.
    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>, instances: &[LitInstance<'_>]) {
        rpass.set_bind_group(0, &self.frame_group, &[]);

        for (i, inst) in instances.iter().enumerate() {
            let pipeline = match inst.variant {
                ShaderVariant::Lit => &self.lit_pipeline,
                ShaderVariant::Blended => &self.blended_pipeline,
            };
            rpass.set_pipeline(pipeline);

            let offset = (i as u64 * self.model_stride) as u32;
            rpass.set_bind_group(1, &self.model_group, &[offset]);

            for mesh in &inst.model.meshes {
                let Some(material) = inst.model.materials.get(mesh.material) else { continue };
                rpass.set_bind_group(2, material, &[]);
                rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rpass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
    }
}

fn create_model_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("skyhaven lit model ubo"),
        size: stride * capacity as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("skyhaven lit model"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: uniform_size::<ModelUniform>(),
            }),
        }],
    });
    (buffer, group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn frame_uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 80);
        assert_eq!(std::mem::size_of::<FrameUniform>(), 240);
        assert_eq!(std::mem::size_of::<ModelUniform>(), 128);
    }

    #[test]
    fn default_light_does_not_attenuate() {
        let light = PointLight::default();
        assert_eq!(light.attenuation(0.0), 1.0);
        assert_eq!(light.attenuation(50.0), 1.0);
    }

    #[test]
    fn quadratic_attenuation_falls_off() {
        let light = PointLight { quadratic: 0.5, ..PointLight::default() };
        assert_relative_eq!(light.attenuation(2.0), 1.0 / 3.0);
        assert!(light.attenuation(4.0) < light.attenuation(2.0));
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let world = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = normal_matrix(world);
        let transformed = n.transform_vector3(Vec3::X);
        assert_relative_eq!(transformed.x, 0.5);
    }

    #[test]
    fn normal_matrix_of_rotation_is_rotation() {
        let world = Mat4::from_rotation_y(0.7);
        let n = normal_matrix(world);
        assert!(n.abs_diff_eq(world, 1e-5));
    }

    #[test]
    fn frame_uniform_packs_flags() {
        let frame = LitFrame {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_position: Vec3::new(1.0, 2.0, 3.0),
            light: PointLight::default(),
            blinn: true,
            bright_threshold: 1.5,
        };
        let u = FrameUniform::new(&frame);
        assert_eq!(u.blinn, 1);
        assert_eq!(u.bright_threshold, 1.5);
        assert_eq!(u.light.attenuation, [1.0, 0.0, 0.0, SHININESS]);
        assert_eq!(u.view_pos, [1.0, 2.0, 3.0, 1.0]);
    }
}
