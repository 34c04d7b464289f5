use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::render::common::{
    fullscreen_primitive, linear_clamp_sampler, sampler_layout_entry, texture_layout_entry,
    uniform_layout_entry, uniform_size, FULLSCREEN_WGSL,
};
use crate::render::targets::{HdrTarget, PingPongPair, HDR_FORMAT};

use super::schedule::{BlurDirection, BlurSchedule, BlurSource};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct BlurParams {
    direction: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

/// Source-texture bind groups, one per image a blur step may read.
///
/// Rebuilt whenever the offscreen targets are recreated.
pub(super) struct BlurSources {
    bright: wgpu::BindGroup,
    ping_pong: [wgpu::BindGroup; 2],
}

impl BlurSources {
    fn get(&self, source: BlurSource) -> &wgpu::BindGroup {
        match source {
            BlurSource::BrightPass => &self.bright,
            BlurSource::PingPong(i) => &self.ping_pong[i & 1],
        }
    }
}

/// Separable Gaussian blur over the ping-pong pair.
///
/// Both direction uniforms are written once at creation. Queue writes are
/// applied before the submission, not between passes.
pub(super) struct BlurPass {
    pipeline: wgpu::RenderPipeline,
    source_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    _direction_buffers: [wgpu::Buffer; 2],
    direction_groups: [wgpu::BindGroup; 2],
}

impl BlurPass {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        let source = format!("{FULLSCREEN_WGSL}{}", include_str!("../shaders/blur.wgsl"));
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("skyhaven blur shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let source_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skyhaven blur source bgl"),
            entries: &[
                texture_layout_entry(0, wgpu::TextureViewDimension::D2),
                sampler_layout_entry(1),
            ],
        });

        let direction_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skyhaven blur direction bgl"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::FRAGMENT,
                false,
                uniform_size::<BlurParams>(),
            )],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skyhaven blur pipeline layout"),
            bind_group_layouts: &[&source_layout, &direction_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("skyhaven blur pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_fullscreen"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: fullscreen_primitive(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let make_direction = |direction: BlurDirection, label: &str| {
            let params = BlurParams { direction: direction.step(), _pad: [0.0; 2] };
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &direction_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            (buffer, group)
        };

        let (h_buf, h_group) = make_direction(BlurDirection::Horizontal, "skyhaven blur horizontal");
        let (v_buf, v_group) = make_direction(BlurDirection::Vertical, "skyhaven blur vertical");

        Self {
            pipeline,
            source_layout,
            sampler: linear_clamp_sampler(device, "skyhaven blur sampler"),
            _direction_buffers: [h_buf, v_buf],
            direction_groups: [h_group, v_group],
        }
    }

    pub(super) fn bind_sources(
        &self,
        device: &wgpu::Device,
        hdr: &HdrTarget,
        ping_pong: &PingPongPair,
    ) -> BlurSources {
        let make = |view: &wgpu::TextureView, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.source_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        };

        BlurSources {
            bright: make(hdr.bright().view(), "skyhaven blur src bright"),
            ping_pong: [
                make(ping_pong.get(0).view(), "skyhaven blur src ping-pong 0"),
                make(ping_pong.get(1).view(), "skyhaven blur src ping-pong 1"),
            ],
        }
    }

    /// Records one render pass per scheduled step.
    pub(super) fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        sources: &BlurSources,
        ping_pong: &PingPongPair,
        schedule: BlurSchedule,
    ) {
        for step in schedule.steps() {
            let destination = ping_pong.get(step.destination);
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("skyhaven blur pass"),
                color_attachments: &[Some(destination.attachment(wgpu::Color::BLACK))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let direction = match step.direction {
                BlurDirection::Horizontal => &self.direction_groups[0],
                BlurDirection::Vertical => &self.direction_groups[1],
            };

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, sources.get(step.source), &[]);
            rpass.set_bind_group(1, direction, &[]);
            rpass.draw(0..3, 0..1);
        }
    }
}
