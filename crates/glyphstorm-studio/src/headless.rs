//! Window-less capture through the software renderer.

use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec2;
use glyphstorm_engine::render::{Camera, RenderStyle, SoftwareRenderer};
use glyphstorm_sim::{ParticleCore, TickInput};
use image::RgbaImage;

/// Fixed tick length for captures.
const TICK_SECONDS: f32 = 1.0 / 60.0;

/// Scripted pointer for captures: a slow circle around the center.
pub fn scripted_input(tick: u32) -> TickInput {
    let t = tick as f32 * TICK_SECONDS;
    let cursor = Vec2::new((t * 0.5).cos(), (t * 0.5).sin()) * 0.4;
    TickInput::new(cursor, false, t)
}

/// Advances `core` by `frames` ticks and renders the result.
pub fn capture(core: &mut ParticleCore, frames: u32, width: u32, height: u32) -> Result<RgbaImage> {
    for tick in 0..frames {
        core.step(scripted_input(tick))
            .with_context(|| format!("tick {tick} failed"))?;
    }

    let frame = core.frame()?;
    let image = SoftwareRenderer::new()
        .render(&frame, &Camera::default(), &RenderStyle::default(), width, height)
        .context("software render failed")?;
    Ok(image)
}

/// Runs a capture and writes it as PNG.
pub fn run(core: &mut ParticleCore, frames: u32, width: u32, height: u32, out: &Path) -> Result<()> {
    log::info!("headless capture: {frames} ticks, {width}x{height} -> {}", out.display());
    let image = capture(core, frames, width, height)?;
    image
        .save_with_format(out, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", out.display()))?;
    log::info!("wrote {}", out.display());
    Ok(())
}
