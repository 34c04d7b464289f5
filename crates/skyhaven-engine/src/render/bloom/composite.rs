use bytemuck::{Pod, Zeroable};

use crate::render::common::{
    fullscreen_primitive, linear_clamp_sampler, sampler_layout_entry, texture_layout_entry,
    uniform_layout_entry, uniform_size, FULLSCREEN_WGSL,
};
use crate::render::targets::{HdrTarget, PingPongPair};

use super::schedule::BlurSource;
use super::BloomSettings;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CompositeParams {
    exposure: f32,
    bloom_enabled: u32,
    gamma: f32,
    apply_gamma: u32,
}

/// Scene + bloom bind groups, one per possible final blur buffer.
pub(super) struct CompositeSources {
    bright: wgpu::BindGroup,
    ping_pong: [wgpu::BindGroup; 2],
}

impl CompositeSources {
    fn get(&self, source: BlurSource) -> &wgpu::BindGroup {
        match source {
            BlurSource::BrightPass => &self.bright,
            BlurSource::PingPong(i) => &self.ping_pong[i & 1],
        }
    }
}

/// Tone-mapping pass from the HDR targets to the surface.
pub(super) struct CompositePass {
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params_ubo: wgpu::Buffer,
    params_group: wgpu::BindGroup,
    apply_gamma: bool,
}

impl CompositePass {
    pub(super) fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let source = format!("{FULLSCREEN_WGSL}{}", include_str!("../shaders/composite.wgsl"));
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("skyhaven composite shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skyhaven composite textures bgl"),
            entries: &[
                texture_layout_entry(0, wgpu::TextureViewDimension::D2),
                texture_layout_entry(1, wgpu::TextureViewDimension::D2),
                sampler_layout_entry(2),
            ],
        });

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skyhaven composite params bgl"),
            entries: &[uniform_layout_entry(
                0,
                wgpu::ShaderStages::FRAGMENT,
                false,
                uniform_size::<CompositeParams>(),
            )],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skyhaven composite pipeline layout"),
            bind_group_layouts: &[&texture_layout, &params_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("skyhaven composite pipeline"),
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
                    format: surface_format,
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

        let params_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("skyhaven composite params ubo"),
            size: std::mem::size_of::<CompositeParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let params_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skyhaven composite params"),
            layout: &params_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_ubo.as_entire_binding(),
            }],
        });

        let apply_gamma = !surface_format.is_srgb();
        log::debug!("composite targets {surface_format:?}, shader gamma: {apply_gamma}");

        Self {
            pipeline,
            texture_layout,
            sampler: linear_clamp_sampler(device, "skyhaven composite sampler"),
            params_ubo,
            params_group,
            apply_gamma,
        }
    }

    /// Whether the shader applies gamma itself (false on sRGB surfaces).
    pub(super) fn applies_gamma(&self) -> bool {
        self.apply_gamma
    }

    pub(super) fn bind_sources(
        &self,
        device: &wgpu::Device,
        hdr: &HdrTarget,
        ping_pong: &PingPongPair,
    ) -> CompositeSources {
        let make = |bloom: &wgpu::TextureView, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(hdr.scene().view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(bloom),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        };

        CompositeSources {
            bright: make(hdr.bright().view(), "skyhaven composite bloom=bright"),
            ping_pong: [
                make(ping_pong.get(0).view(), "skyhaven composite bloom=ping-pong 0"),
                make(ping_pong.get(1).view(), "skyhaven composite bloom=ping-pong 1"),
            ],
        }
    }

    /// Clears `surface_view` and writes the tone-mapped image into it.
    pub(super) fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        sources: &CompositeSources,
        bloom: BlurSource,
        settings: &BloomSettings,
    ) {
        let params = CompositeParams {
            exposure: settings.exposure,
            bloom_enabled: u32::from(settings.enabled),
            gamma: settings.gamma,
            apply_gamma: u32::from(self.apply_gamma),
        };
        queue.write_buffer(&self.params_ubo, 0, bytemuck::bytes_of(&params));

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("skyhaven composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
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

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, sources.get(bloom), &[]);
        rpass.set_bind_group(1, &self.params_group, &[]);
        rpass.draw(0..3, 0..1);
    }
}
