use glyphstorm_sim::SimError;

/// Straight-alpha sRGB color.
///
/// Stored the way colors are authored. The GPU path converts to linear for
/// sRGB render targets; the software path writes the bytes as-is.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
            a: f32::from(a) / 255.0,
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Linear-light components, for sRGB render targets.
    pub fn to_linear(self) -> [f32; 4] {
        [srgb_to_linear(self.r), srgb_to_linear(self.g), srgb_to_linear(self.b), self.a]
    }

    /// Components to write into a target of the given encoding.
    ///
    /// sRGB targets encode on store, so they take linear values; any other
    /// target stores the authored values unchanged.
    pub fn for_target(self, srgb: bool) -> [f32; 4] {
        if srgb {
            self.to_linear()
        } else {
            [self.r, self.g, self.b, self.a]
        }
    }

    pub(crate) fn to_wgpu(self, srgb: bool) -> wgpu::Color {
        let [r, g, b, a] = self.for_target(srgb);
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// How particles look on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    /// Billboard edge length in world units.
    pub quad_size: f32,

    /// Atlas coverage below this is discarded.
    pub alpha_threshold: f32,

    pub ink: Color,
    pub paper: Color,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            quad_size: 6.0,
            alpha_threshold: 0.1,
            ink: Color::BLACK,
            paper: Color::from_srgb_u8(0xf0, 0xf0, 0xf0, 0xff),
        }
    }
}

impl RenderStyle {
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.quad_size.is_finite() && self.quad_size > 0.0) {
            return Err(SimError::Configuration(format!(
                "quad size must be positive, got {}",
                self.quad_size
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha_threshold) {
            return Err(SimError::Configuration(format!(
                "alpha threshold must be in [0, 1], got {}",
                self.alpha_threshold
            )));
        }
        Ok(())
    }
}
