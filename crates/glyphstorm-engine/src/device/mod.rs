//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering
//!
//! Adapter or device acquisition failures surface as
//! `SimError::RuntimeUnavailable` inside the returned `anyhow::Error`, so hosts
//! can tell "no GPU" apart from other startup failures and fall back.

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use error::{is_runtime_unavailable, SurfaceErrorAction};
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
