use skyhaven_engine::core::{App, AppControl, FrameCtx};
use skyhaven_engine::text::{FontId, FontSystem};

use crate::config::DemoConfig;
use crate::controls::apply_controls;
use crate::overlay::{load_label_font, DebugPanel};
use crate::program_state::ProgramState;
use crate::renderer::{Labels, SceneRenderer};
use crate::scene::SceneDescriptor;

/// The floating-islands demo.
///
/// GPU resources are created on the first frame, once a device exists.
pub struct SkyhavenApp {
    config: DemoConfig,
    scene: SceneDescriptor,
    state: ProgramState,
    panel: DebugPanel,
    fonts: FontSystem,
    label_font: Option<FontId>,
    renderer: Option<SceneRenderer>,
    cursor_synced: bool,
}

impl SkyhavenApp {
    pub fn new(config: DemoConfig, scene: SceneDescriptor, state: ProgramState) -> Self {
        let mut fonts = FontSystem::new();
        let label_font = load_label_font(&mut fonts, config.resources.font.as_deref());
        Self {
            config,
            scene,
            state,
            panel: DebugPanel::new(),
            fonts,
            label_font,
            renderer: None,
            cursor_synced: false,
        }
    }
}

impl App for SkyhavenApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if !self.cursor_synced {
            ctx.window.set_cursor_captured(!self.state.overlay_enabled);
            self.cursor_synced = true;
        }

        let pointer_on_panel = self.state.overlay_enabled
            && self.panel.update(&mut self.state, ctx.input, ctx.input_frame);

        let outcome = apply_controls(
            &mut self.state,
            ctx.input,
            ctx.input_frame,
            ctx.time.dt,
            pointer_on_panel,
        );
        if let Some(captured) = outcome.capture_cursor {
            ctx.window.set_cursor_captured(captured);
        }
        if outcome.exit {
            return AppControl::Exit;
        }

        let (quads, labels) = if self.state.overlay_enabled {
            let labels = self.label_font.map(|font| Labels {
                fonts: &self.fonts,
                font,
                runs: self.panel.texts(&self.state),
            });
            (self.panel.quads(&self.state), labels)
        } else {
            (Vec::new(), None)
        };
        let elapsed = ctx.time.elapsed;

        ctx.render(|rctx, target| {
            if self.renderer.is_none() {
                match SceneRenderer::new(rctx, &self.scene, &self.config.resources.skybox) {
                    Ok(renderer) => self.renderer = Some(renderer),
                    Err(e) => {
                        log::error!("renderer setup failed: {e:#}");
                        return AppControl::Exit;
                    }
                }
            }
            let Some(renderer) = self.renderer.as_mut() else {
                return AppControl::Exit;
            };

            if let Err(e) =
                renderer.draw_frame(rctx, target, &self.state, &self.scene, &self.config.camera, elapsed)
            {
                log::error!("render targets lost: {e}");
                return AppControl::Exit;
            }
            if !quads.is_empty() {
                renderer.draw_overlay(rctx, target, &quads, labels.as_ref());
            }
            AppControl::Continue
        })
    }

    fn on_exit(&mut self) {
        let path = &self.config.resources.state_file;
        match self.state.save_to_file(path) {
            Ok(()) => log::info!("saved state to {}", path.display()),
            Err(e) => log::error!("{e}"),
        }
    }
}
