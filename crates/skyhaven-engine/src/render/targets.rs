//! Offscreen render targets for the HDR scene pass and the bloom blur.
//!
//! All color targets use [`HDR_FORMAT`] so light values above 1.0 survive
//! until tone mapping. Targets are sized in physical pixels and owned by the
//! bloom compositor; dropping them releases the GPU memory.

use super::RenderCtx;

/// Floating-point color format for every offscreen color target.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Depth format of the HDR scene target.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Number of color attachments in the HDR scene target (scene + bright).
pub const HDR_COLOR_ATTACHMENTS: u32 = 2;

/// Setup-time failure of an offscreen target.
///
/// Equivalent of an incomplete framebuffer: the renderer cannot run without
/// these targets and does not try a fallback.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("render target size {width}x{height} is outside 1..={max}")]
    InvalidSize { width: u32, height: u32, max: u32 },

    #[error("{format:?} is not usable as a filterable, sampled render attachment on this adapter")]
    UnsupportedFormat { format: wgpu::TextureFormat },

    #[error("{format:?} stores {bits} bits per channel; HDR targets need more than 8")]
    InsufficientPrecision { format: wgpu::TextureFormat, bits: u32 },

    #[error("{attachments} color attachments of {format:?} need {required} bytes per sample, limit is {limit}")]
    AttachmentBudget {
        format: wgpu::TextureFormat,
        attachments: u32,
        required: u32,
        limit: u32,
    },
}

/// Bits stored per color channel, when the format has a fixed block size.
pub fn bits_per_channel(format: wgpu::TextureFormat) -> Option<u32> {
    let components = u32::from(format.components());
    if components == 0 {
        return None;
    }
    format.block_copy_size(None).map(|bytes| bytes * 8 / components)
}

/// Validates that `attachments` color targets of `format` at `width`×`height`
/// can be created and sampled.
pub fn check_completeness(
    format: wgpu::TextureFormat,
    features: wgpu::TextureFormatFeatures,
    limits: &wgpu::Limits,
    width: u32,
    height: u32,
    attachments: u32,
) -> Result<(), TargetError> {
    let max = limits.max_texture_dimension_2d;
    if width == 0 || height == 0 || width > max || height > max {
        return Err(TargetError::InvalidSize { width, height, max });
    }

    let bits = bits_per_channel(format).unwrap_or(0);
    if bits <= 8 {
        return Err(TargetError::InsufficientPrecision { format, bits });
    }

    let usages = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
    if !features.allowed_usages.contains(usages)
        || !features.flags.contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
    {
        return Err(TargetError::UnsupportedFormat { format });
    }

    let per_attachment = format.target_pixel_byte_cost().unwrap_or(u32::MAX);
    let required = per_attachment.saturating_mul(attachments);
    if required > limits.max_color_attachment_bytes_per_sample {
        return Err(TargetError::AttachmentBudget {
            format,
            attachments,
            required,
            limit: limits.max_color_attachment_bytes_per_sample,
        });
    }

    Ok(())
}

/// A single offscreen color texture with its default view.
pub struct ColorTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl ColorTarget {
    fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    /// Color attachment that clears to `clear` and stores the result.
    pub fn attachment(&self, clear: wgpu::Color) -> wgpu::RenderPassColorAttachment<'_> {
        wgpu::RenderPassColorAttachment {
            view: &self.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        }
    }
}

/// HDR scene target: attachment 0 = scene color, attachment 1 = bright-pass
/// color, plus a depth buffer.
pub struct HdrTarget {
    scene: ColorTarget,
    bright: ColorTarget,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl HdrTarget {
    pub fn scene(&self) -> &ColorTarget {
        &self.scene
    }

    pub fn bright(&self) -> &ColorTarget {
        &self.bright
    }

    pub fn size(&self) -> (u32, u32) {
        self.scene.size()
    }

    /// Both color attachments, scene cleared to `clear`, bright cleared to zero.
    pub fn color_attachments(
        &self,
        clear: wgpu::Color,
    ) -> [Option<wgpu::RenderPassColorAttachment<'_>>; 2] {
        [
            Some(self.scene.attachment(clear)),
            Some(self.bright.attachment(wgpu::Color::TRANSPARENT)),
        ]
    }

    /// Depth attachment cleared to the far plane.
    pub fn depth_attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }
    }
}

/// Two same-sized color targets used alternately as blur source/destination.
pub struct PingPongPair {
    targets: [ColorTarget; 2],
}

impl PingPongPair {
    /// Target at `index` (0 or 1).
    pub fn get(&self, index: usize) -> &ColorTarget {
        &self.targets[index & 1]
    }

    pub fn size(&self) -> (u32, u32) {
        self.targets[0].size()
    }
}

fn check_for_ctx(ctx: &RenderCtx<'_>, width: u32, height: u32, attachments: u32) -> Result<(), TargetError> {
    let features = ctx.adapter.get_texture_format_features(HDR_FORMAT);
    let limits = ctx.device.limits();
    check_completeness(HDR_FORMAT, features, &limits, width, height, attachments)
}

/// Allocates the HDR scene target.
///
/// Fails when the adapter cannot provide a complete target; callers treat
/// that as fatal.
pub fn create_hdr_target(ctx: &RenderCtx<'_>, width: u32, height: u32) -> Result<HdrTarget, TargetError> {
    check_for_ctx(ctx, width, height, HDR_COLOR_ATTACHMENTS)?;

    let scene = ColorTarget::new(ctx.device, "skyhaven hdr scene color", width, height);
    let bright = ColorTarget::new(ctx.device, "skyhaven hdr bright color", width, height);

    let depth_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("skyhaven hdr depth"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

    log::debug!("created hdr target {width}x{height}");

    Ok(HdrTarget {
        scene,
        bright,
        _depth_texture: depth_texture,
        depth_view,
    })
}

/// Allocates the two color-only blur targets.
pub fn create_ping_pong_pair(
    ctx: &RenderCtx<'_>,
    width: u32,
    height: u32,
) -> Result<PingPongPair, TargetError> {
    check_for_ctx(ctx, width, height, 1)?;

    let targets = [
        ColorTarget::new(ctx.device, "skyhaven ping-pong 0", width, height),
        ColorTarget::new(ctx.device, "skyhaven ping-pong 1", width, height),
    ];

    log::debug!("created ping-pong pair {width}x{height}");

    Ok(PingPongPair { targets })
}
