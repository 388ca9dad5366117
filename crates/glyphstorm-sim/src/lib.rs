//! glyphstorm simulation core.
//!
//! Owns everything that does not need a GPU: the glyph atlas, per-instance
//! bindings, the double-buffered particle state and the force integrator.
//! Renderers consume it through [`FrameView`].

pub mod atlas;
pub mod binding;
pub mod config;
pub mod sim;

mod core;
mod error;

pub use crate::core::{FrameView, ParticleCore};
pub use atlas::{BlockGlyphs, FontGlyphs, GlyphAtlas, GlyphBitmap, GlyphSource};
pub use binding::{GlyphAssignment, InstanceBindings};
pub use config::{AtlasConfig, ExecutionMode, ForceFieldConfig, SimulationConfig, DEFAULT_CHARSET};
pub use error::{Result, SimError};
pub use sim::{ForceIntegrator, Integrator, StateStore, TickInput};
