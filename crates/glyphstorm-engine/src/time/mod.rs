//! Frame timing.
//!
//! One `FrameClock` per render loop; `tick()` once per presented frame. The
//! clamped `dt` paces animation, the unclamped `elapsed` is the monotonic
//! timestamp handed to the simulation.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
