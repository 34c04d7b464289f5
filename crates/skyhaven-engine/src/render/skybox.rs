//! Cubemap background, drawn last in the scene pass at the far plane.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};
use wgpu::util::DeviceExt;

use crate::assets::{CubemapData, ImageData, Texture};

use super::common::{
    linear_clamp_sampler, sampler_layout_entry, texture_layout_entry, uniform_layout_entry,
    uniform_size,
};
use super::targets::{DEPTH_FORMAT, HDR_FORMAT};
use super::RenderCtx;

/// Color of the 1×1 cubemap used when the face images cannot be loaded.
const FALLBACK_SKY: [u8; 4] = [110, 150, 200, 255];

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SkyUniform {
    view_projection: [[f32; 4]; 4],
    bright_threshold: f32,
    _pad: [f32; 3],
}

/// View-projection with the camera translation removed, so the cube stays
/// centered on the eye.
pub fn sky_view_projection(view: Mat4, projection: Mat4) -> Mat4 {
    projection * Mat4::from_mat3(Mat3::from_mat4(view))
}

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

#[rustfmt::skip]
const CUBE_VERTICES: [[f32; 3]; 36] = [
    [-1.0,  1.0, -1.0], [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0],

    [-1.0, -1.0,  1.0], [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0],
    [-1.0,  1.0, -1.0], [-1.0,  1.0,  1.0], [-1.0, -1.0,  1.0],

    [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0], [ 1.0, -1.0, -1.0],

    [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0],

    [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0], [-1.0,  1.0, -1.0],

    [-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0],
];

pub struct SkyboxRenderer {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    _cubemap: Texture,
}

impl SkyboxRenderer {
    /// Creates the renderer; `faces = None` uses a flat fallback color.
    pub fn new(ctx: &RenderCtx<'_>, faces: Option<&CubemapData>) -> Self {
        let device = ctx.device;

        let fallback;
        let faces = match faces {
            Some(faces) => faces,
            None => {
                fallback = CubemapData {
                    size: 1,
                    faces: vec![ImageData::solid(FALLBACK_SKY); 6],
                };
                &fallback
            }
        };
        let cubemap = Texture::cubemap(device, ctx.queue, faces, "skyhaven skybox cubemap");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("skyhaven skybox shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/skybox.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skyhaven skybox bgl"),
            entries: &[
                uniform_layout_entry(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    false,
                    uniform_size::<SkyUniform>(),
                ),
                texture_layout_entry(1, wgpu::TextureViewDimension::Cube),
                sampler_layout_entry(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skyhaven skybox pipeline layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let target = Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("skyhaven skybox pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &POSITION_ATTRS,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[target.clone(), target],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // Depth is 1.0 everywhere; LessEqual passes only where nothing was drawn.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("skyhaven skybox vbo"),
            contents: bytemuck::cast_slice(&CUBE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("skyhaven skybox ubo"),
            size: std::mem::size_of::<SkyUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = linear_clamp_sampler(device, "skyhaven skybox sampler");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skyhaven skybox"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&cubemap.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            pipeline,
            vertex_buffer,
            ubo,
            bind_group,
            _cubemap: cubemap,
        }
    }

    pub fn prepare(&self, ctx: &RenderCtx<'_>, view: Mat4, projection: Mat4, bright_threshold: f32) {
        let u = SkyUniform {
            view_projection: sky_view_projection(view, projection).to_cols_array_2d(),
            bright_threshold,
            _pad: [0.0; 3],
        };
        ctx.queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&u));
    }

    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.draw(0..CUBE_VERTICES.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn sky_uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<SkyUniform>(), 80);
    }

    #[test]
    fn camera_translation_does_not_move_sky() {
        let projection = Mat4::perspective_rh(45f32.to_radians(), 4.0 / 3.0, 0.1, 100.0);
        let at_origin = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let far_away = Mat4::look_at_rh(Vec3::new(70.0, -10.0, 30.0), Vec3::new(70.0, -10.0, 29.0), Vec3::Y);

        let a = sky_view_projection(at_origin, projection);
        let b = sky_view_projection(far_away, projection);
        assert!(a.abs_diff_eq(b, 1e-4));
    }
}
