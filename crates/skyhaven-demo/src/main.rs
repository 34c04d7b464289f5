mod app;
mod config;
mod controls;
mod overlay;
mod program_state;
mod renderer;
mod scene;

use std::path::Path;

use anyhow::Result;
use skyhaven_engine::device::GpuInit;
use skyhaven_engine::logging::{init_logging, LoggingConfig};
use skyhaven_engine::window::{Runtime, RuntimeConfig};

use crate::app::SkyhavenApp;
use crate::config::DemoConfig;
use crate::program_state::ProgramState;
use crate::scene::SceneDescriptor;

const CONFIG_PATH: &str = "resources/skyhaven.toml";

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = DemoConfig::load_or_default(Path::new(CONFIG_PATH));
    let scene = SceneDescriptor::load_or_builtin(&config.resources.scene_file);

    let mut state = ProgramState::from_config(&config);
    if let Err(e) = state.load_from_file(&config.resources.state_file) {
        log::warn!("{e}; starting from defaults");
    }

    let runtime = RuntimeConfig::new(&config.window.title, config.window.width, config.window.height);
    let app = SkyhavenApp::new(config, scene, state);

    Runtime::run(runtime, GpuInit::default(), app).inspect_err(|e| log::error!("{e:#}"))
}
