//! Particle simulation: double-buffered state plus the per-tick force pass.
//!
//! The store owns memory and buffer discipline; integrators own the math.
//! They meet only through `Integrator::integrate`, which reads the current
//! pair and writes the alternate one.

mod integrator;
mod noise;
mod state;

pub use integrator::{ForceIntegrator, Integrator, TickInput};
pub use noise::simplex2;
pub use state::{texel_index, StateStore, StateView, StateViewMut};
