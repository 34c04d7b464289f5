//! Per-frame driver: scene pass into the HDR target, bloom, overlay.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use skyhaven_engine::assets::{load_cubemap, load_model};
use skyhaven_engine::render::{
    BloomCompositor, GpuModel, LitFrame, LitInstance, LitRenderer, OverlayQuad, OverlayRenderer,
    RenderCtx, RenderTarget, SkyboxRenderer, TargetError, TextRenderer, TextRun,
};
use skyhaven_engine::text::{FontId, FontSystem};

use crate::config::CameraConfig;
use crate::program_state::ProgramState;
use crate::scene::SceneDescriptor;

/// Uploaded models keyed by the path the scene refers to them by.
///
/// Paths that failed to load are absent; entries using them are skipped.
#[derive(Default)]
pub struct ModelCache {
    models: HashMap<PathBuf, GpuModel>,
}

impl ModelCache {
    pub fn load_scene(&mut self, ctx: &RenderCtx<'_>, lit: &LitRenderer, scene: &SceneDescriptor) {
        for path in scene.model_paths() {
            if self.models.contains_key(path) {
                continue;
            }
            match load_model(path) {
                Ok(data) => {
                    log::info!(
                        "loaded {} ({} meshes, {} triangles)",
                        path.display(),
                        data.meshes.len(),
                        data.triangle_count()
                    );
                    self.models.insert(path.to_path_buf(), lit.upload_model(ctx, &data));
                }
                Err(e) => log::warn!("{e}; skipping entries that use it"),
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<&GpuModel> {
        self.models.get(path)
    }

    pub fn loaded_count(&self) -> usize {
        self.models.len()
    }
}

/// Overlay text and the font to draw it with.
pub struct Labels<'a> {
    pub fonts: &'a FontSystem,
    pub font: FontId,
    pub runs: Vec<TextRun>,
}

pub struct SceneRenderer {
    lit: LitRenderer,
    skybox: SkyboxRenderer,
    bloom: BloomCompositor,
    overlay: OverlayRenderer,
    text: TextRenderer,
    models: ModelCache,
}

impl SceneRenderer {
    /// Builds pipelines and targets and uploads every model `scene` names.
    ///
    /// Fails only when the HDR targets cannot be created; missing assets
    /// are logged and replaced or skipped.
    pub fn new(ctx: &RenderCtx<'_>, scene: &SceneDescriptor, skybox_faces: &[PathBuf; 6]) -> Result<Self> {
        let bloom = BloomCompositor::new(ctx).context("HDR render targets are not usable on this adapter")?;
        let lit = LitRenderer::new(ctx);

        let mut models = ModelCache::default();
        models.load_scene(ctx, &lit, scene);
        log::info!("{} of {} models available", models.loaded_count(), scene.model_paths().len());

        let faces = match load_cubemap(skybox_faces) {
            Ok(faces) => Some(faces),
            Err(e) => {
                log::warn!("no usable skybox face ({e}); using flat sky");
                None
            }
        };
        let skybox = SkyboxRenderer::new(ctx, faces.as_ref());

        Ok(Self {
            lit,
            skybox,
            bloom,
            overlay: OverlayRenderer::new(),
            text: TextRenderer::new(),
            models,
        })
    }

    /// Records scene, blur and composite into `target`.
    pub fn draw_frame(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        state: &ProgramState,
        scene: &SceneDescriptor,
        camera: &CameraConfig,
        elapsed: f32,
    ) -> Result<(), TargetError> {
        self.bloom.ensure_targets(ctx)?;

        let view = state.camera.view_matrix();
        let projection = state.camera.projection_matrix(ctx.aspect_ratio(), camera.near, camera.far);
        let threshold = state.bloom.threshold;

        let instances: Vec<LitInstance<'_>> = scene
            .entries
            .iter()
            .filter_map(|entry| {
                let model = self.models.get(&entry.model)?;
                Some(LitInstance {
                    model,
                    world: entry.world(elapsed),
                    variant: entry.shading.into(),
                })
            })
            .collect();

        let frame = LitFrame {
            view,
            projection,
            view_position: state.camera.position,
            light: state.light,
            blinn: state.blinn,
            bright_threshold: threshold,
        };
        self.lit.prepare(ctx, &frame, &instances);
        self.skybox.prepare(ctx, view, projection, threshold);

        let c = state.clear_color;
        let clear = wgpu::Color {
            r: f64::from(c.x),
            g: f64::from(c.y),
            b: f64::from(c.z),
            a: 1.0,
        };

        {
            let mut rpass = self.bloom.begin_scene_pass(target.encoder, clear);
            self.lit.draw(&mut rpass, &instances);
            // Last, so depth rejects sky fragments behind geometry.
            self.skybox.draw(&mut rpass);
        }

        self.bloom.blur(target.encoder, &state.bloom);
        self.bloom.composite(ctx, target.encoder, target.color_view, &state.bloom);

        Ok(())
    }

    /// Draws the debug panel over the composited frame, labels last.
    pub fn draw_overlay(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        quads: &[OverlayQuad],
        labels: Option<&Labels<'_>>,
    ) {
        self.overlay.render(ctx, target, quads);
        if let Some(labels) = labels {
            self.text.render(ctx, target, labels.fonts, labels.font, &labels.runs);
        }
    }
}
