//! Particle rendering.
//!
//! Both renderers consume a `FrameView` and the same per-instance table; the
//! GPU path draws instanced quads through wgpu, the software path rasterizes
//! into an `RgbaImage`.
//!
//! Convention: world space is right-handed, y up; atlas UVs have v growing
//! downward with row 0 at the top.

mod camera;
mod ctx;
mod instances;
mod particles;
mod software;
mod style;

pub use camera::Camera;
pub use ctx::{RenderCtx, RenderTarget};
pub use instances::{build_instances, ParticleInstance};
pub use particles::ParticleRenderer;
pub use software::SoftwareRenderer;
pub use style::{Color, RenderStyle};
