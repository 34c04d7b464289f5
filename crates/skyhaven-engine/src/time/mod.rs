//! Time subsystem.
//!
//! One `FrameClock` per render loop; call `tick()` once per presented frame to
//! obtain a `FrameTime` with the clamped delta and the total elapsed time that
//! drives scene animation.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
