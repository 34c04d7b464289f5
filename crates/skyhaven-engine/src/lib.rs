//! Skyhaven engine crate.
//!
//! Owns the platform + GPU runtime, asset loading, the fly camera and the
//! HDR/bloom render pipeline used by the demo, plus the font and text path
//! for overlay labels.

pub mod assets;
pub mod camera;
pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod text;
pub mod time;
pub mod window;
