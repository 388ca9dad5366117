//! glyphstorm engine crate.
//!
//! Platform and GPU runtime for the particle core: device + surface setup,
//! the window loop, input translation, frame timing, logging, and the GPU
//! and software particle renderers.

pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
