//! HDR bloom: bright-pass split, separable Gaussian blur, tone-mapped composite.
//!
//! Per frame, in order:
//! 1. [`BloomCompositor::begin_scene_pass`] opens the pass that renders the
//!    scene into the HDR target (scene color + bright color + depth). The lit
//!    and skybox shaders perform the bright-pass split themselves.
//! 2. [`BloomCompositor::blur`] ping-pongs the bright image through the blur.
//! 3. [`BloomCompositor::composite`] tone maps scene + bloom onto the surface.

mod blur;
mod composite;
pub mod reference;
mod schedule;

pub use schedule::{BlurDirection, BlurSchedule, BlurSource, BlurStep, BlurSteps};

use crate::render::targets::{
    create_hdr_target, create_ping_pong_pair, HdrTarget, PingPongPair, TargetError,
};
use crate::render::RenderCtx;

use blur::{BlurPass, BlurSources};
use composite::{CompositePass, CompositeSources};

/// Knobs read once per frame by the compositor and the scene shaders.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BloomSettings {
    pub enabled: bool,
    pub exposure: f32,
    /// Luminance above which a fragment feeds the bloom.
    pub threshold: f32,
    pub iterations: u32,
    pub gamma: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            exposure: 1.0,
            threshold: 1.0,
            iterations: 10,
            gamma: 2.2,
        }
    }
}

impl BloomSettings {
    pub fn schedule(&self) -> BlurSchedule {
        BlurSchedule::new(self.iterations)
    }
}

struct Targets {
    hdr: HdrTarget,
    ping_pong: PingPongPair,
    blur_sources: BlurSources,
    composite_sources: CompositeSources,
}

/// Owns the offscreen targets and the blur/composite pipelines.
pub struct BloomCompositor {
    blur: BlurPass,
    composite: CompositePass,
    targets: Targets,
}

impl BloomCompositor {
    /// Builds pipelines and allocates targets at the current surface size.
    ///
    /// Errors when the adapter cannot provide complete HDR targets.
    pub fn new(ctx: &RenderCtx<'_>) -> Result<Self, TargetError> {
        let blur = BlurPass::new(ctx.device);
        let composite = CompositePass::new(ctx.device, ctx.surface_format);
        let (width, height) = ctx.surface_size;
        let targets = Self::create_targets(ctx, &blur, &composite, width, height)?;

        log::info!(
            "bloom compositor ready ({width}x{height}, shader gamma: {})",
            composite.applies_gamma()
        );

        Ok(Self { blur, composite, targets })
    }

    fn create_targets(
        ctx: &RenderCtx<'_>,
        blur: &BlurPass,
        composite: &CompositePass,
        width: u32,
        height: u32,
    ) -> Result<Targets, TargetError> {
        let hdr = create_hdr_target(ctx, width, height)?;
        let ping_pong = create_ping_pong_pair(ctx, width, height)?;
        let blur_sources = blur.bind_sources(ctx.device, &hdr, &ping_pong);
        let composite_sources = composite.bind_sources(ctx.device, &hdr, &ping_pong);
        Ok(Targets { hdr, ping_pong, blur_sources, composite_sources })
    }

    /// Recreates the targets when the surface size changed.
    ///
    /// A zero-sized surface (minimized window) keeps the previous targets.
    pub fn ensure_targets(&mut self, ctx: &RenderCtx<'_>) -> Result<(), TargetError> {
        let (width, height) = ctx.surface_size;
        if width == 0 || height == 0 || self.targets.hdr.size() == (width, height) {
            return Ok(());
        }

        self.targets = Self::create_targets(ctx, &self.blur, &self.composite, width, height)?;
        log::debug!("bloom targets resized to {width}x{height}");
        Ok(())
    }

    /// Opens the scene pass over the HDR target: scene color cleared to
    /// `clear`, bright color cleared to zero, depth cleared to 1.0.
    pub fn begin_scene_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        let hdr = &self.targets.hdr;
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("skyhaven scene pass"),
            color_attachments: &hdr.color_attachments(clear),
            depth_stencil_attachment: Some(hdr.depth_attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }

    /// Runs `settings.iterations` blur steps over the bright image.
    pub fn blur(&self, encoder: &mut wgpu::CommandEncoder, settings: &BloomSettings) {
        let t = &self.targets;
        self.blur.encode(encoder, &t.blur_sources, &t.ping_pong, settings.schedule());
    }

    /// Clears `surface_view` and writes the tone-mapped scene (+ bloom) into it.
    pub fn composite(
        &self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        settings: &BloomSettings,
    ) {
        self.composite.encode(
            ctx.queue,
            encoder,
            surface_view,
            &self.targets.composite_sources,
            settings.schedule().final_source(),
            settings,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo() {
        let s = BloomSettings::default();
        assert!(s.enabled);
        assert_eq!(s.iterations, 10);
        assert_eq!(s.threshold, 1.0);
        assert_eq!(s.gamma, 2.2);
    }

    #[test]
    fn composite_reads_buffer_chosen_by_schedule() {
        let s = BloomSettings { iterations: 3, ..BloomSettings::default() };
        assert_eq!(s.schedule().final_source(), BlurSource::PingPong(1));

        let s = BloomSettings { iterations: 0, ..BloomSettings::default() };
        assert_eq!(s.schedule().final_source(), BlurSource::BrightPass);
    }
}
