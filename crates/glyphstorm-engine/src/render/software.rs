//! CPU rasterizer for the particle field.
//!
//! Draws the same instance table as the GPU path into an `RgbaImage`: one
//! view-aligned quad per particle, nearest atlas lookup, hard alpha cutout and
//! a `LessEqual` depth test. Used when no GPU is available and for
//! deterministic captures.

use glam::{Mat4, Vec2, Vec4};
use glyphstorm_sim::{FrameView, GlyphAtlas, Result, SimError};
use image::{Rgba, RgbaImage};

use super::instances::{build_instances, ParticleInstance};
use super::{Camera, RenderStyle};

/// Software renderer with a reusable depth buffer.
#[derive(Debug, Default)]
pub struct SoftwareRenderer {
    depth: Vec<f32>,
    instances: Vec<ParticleInstance>,
    bindings_generation: Option<u64>,
}

/// Screen-space rectangle covered by one projected quad.
struct ScreenQuad {
    min: Vec2,
    max: Vec2,
    depth: f32,
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `frame` into a fresh `width × height` image.
    pub fn render(
        &mut self,
        frame: &FrameView<'_>,
        camera: &Camera,
        style: &RenderStyle,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(SimError::Configuration(format!(
                "render target must be non-empty, got {width}x{height}"
            )));
        }
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .filter(|n| n.checked_mul(4).is_some())
            .ok_or_else(|| {
                SimError::Configuration(format!("render target {width}x{height} is too large"))
            })?;
        camera.validate()?;
        style.validate()?;

        if self.bindings_generation != Some(frame.bindings_generation) {
            self.instances = build_instances(frame.bindings, frame.atlas)?;
            self.bindings_generation = Some(frame.bindings_generation);
        }

        let mut image = RgbaImage::from_pixel(width, height, Rgba(style.paper.to_rgba8()));
        self.depth.clear();
        self.depth.resize(pixels, 1.0);

        let view = camera.view();
        let proj = camera.projection(width as f32 / height as f32);
        let ink = Rgba(style.ink.to_rgba8());
        let cell = frame.atlas.cell_size();

        for instance in &self.instances {
            let Some(position) = frame.sample_position(Vec2::from_array(instance.reference)) else {
                continue;
            };
            let Some(quad) = project_quad(position, view, proj, style.quad_size, width, height) else {
                continue;
            };
            let uv_origin = Vec2::from_array(instance.uv_offset);
            Self::fill_quad(&mut self.depth, &mut image, &quad, frame.atlas, uv_origin, cell, style.alpha_threshold, ink);
        }

        Ok(image)
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_quad(
        depth: &mut [f32],
        image: &mut RgbaImage,
        quad: &ScreenQuad,
        atlas: &GlyphAtlas,
        uv_origin: Vec2,
        cell: Vec2,
        threshold: f32,
        ink: Rgba<u8>,
    ) {
        let (width, height) = image.dimensions();
        let stride = width as usize;
        let extent = quad.max - quad.min;

        // Pixel centers inside [min, max).
        let x0 = (quad.min.x - 0.5).ceil().max(0.0) as u32;
        let y0 = (quad.min.y - 0.5).ceil().max(0.0) as u32;
        let x1 = ((quad.max.x - 0.5).ceil().max(0.0) as u32).min(width);
        let y1 = ((quad.max.y - 0.5).ceil().max(0.0) as u32).min(height);

        for y in y0..y1 {
            let v = (y as f32 + 0.5 - quad.min.y) / extent.y;
            for x in x0..x1 {
                let u = (x as f32 + 0.5 - quad.min.x) / extent.x;
                let coverage = atlas.coverage_at(uv_origin + Vec2::new(u, v) * cell);
                if coverage < threshold {
                    continue;
                }
                let slot = &mut depth[y as usize * stride + x as usize];
                if quad.depth <= *slot {
                    *slot = quad.depth;
                    image.put_pixel(x, y, ink);
                }
            }
        }
    }
}

/// Projects a view-aligned quad centered on `position`.
///
/// All four corners share the view depth, so the projection is an
/// axis-aligned screen rectangle. Returns `None` when clipped by near/far.
fn project_quad(position: Vec4, view: Mat4, proj: Mat4, size: f32, width: u32, height: u32) -> Option<ScreenQuad> {
    let center = view * position.truncate().extend(1.0);
    let half = size * 0.5;

    let corner = |dx: f32, dy: f32| {
        let clip = proj * Vec4::new(center.x + dx, center.y + dy, center.z, center.w);
        (clip.w > 0.0).then(|| clip.truncate() / clip.w)
    };
    let lo = corner(-half, -half)?;
    let hi = corner(half, half)?;
    if !(0.0..=1.0).contains(&lo.z) {
        return None;
    }

    // NDC y points up, image rows go down.
    let to_screen = |ndc: glam::Vec3| {
        Vec2::new((ndc.x + 1.0) * 0.5 * width as f32, (1.0 - ndc.y) * 0.5 * height as f32)
    };
    let a = to_screen(lo);
    let b = to_screen(hi);
    Some(ScreenQuad {
        min: a.min(b),
        max: a.max(b),
        depth: lo.z,
    })
}
