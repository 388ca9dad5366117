use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Characters packed into the default atlas, in atlas order.
pub const DEFAULT_CHARSET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!?&@#";

/// Parameters of the per-particle force field.
///
/// Defaults reproduce the look of the reference scene: a gravity-like pull
/// toward the cursor, a slow noise drift, air friction and a soft fence at
/// radius 300.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceFieldConfig {
    /// Maps the NDC cursor onto the z = 0 world plane.
    pub attractor_scale: f32,

    /// Attraction magnitude `K` in `K / (dist² + ε)`.
    pub attraction_strength: f32,

    /// Softening term `ε`; keeps the pull finite at the attractor.
    pub attraction_softening: f32,

    /// Multiplier applied to the attraction while the pointer is pressed.
    ///
    /// Negative values turn the pull into a push.
    pub repulsion_multiplier: f32,

    /// Spatial frequency of the flow noise.
    pub flow_frequency: f32,

    /// Time scale of the flow noise.
    pub flow_speed: f32,

    /// Offset separating the second flow channel from the first.
    pub flow_offset: f32,

    /// Overall flow magnitude. Zero disables the flow field.
    pub flow_scale: f32,

    /// Velocity multiplier applied every tick, in `(0, 1]`.
    pub damping: f32,

    /// Distance from the origin past which the return impulse kicks in.
    pub boundary_radius: f32,

    /// Magnitude of the inward impulse applied outside the boundary.
    pub return_strength: f32,
}

impl Default for ForceFieldConfig {
    fn default() -> Self {
        Self {
            attractor_scale: 150.0,
            attraction_strength: 500.0,
            attraction_softening: 100.0,
            repulsion_multiplier: -2.0,
            flow_frequency: 0.01,
            flow_speed: 0.5,
            flow_offset: 100.0,
            flow_scale: 0.025,
            damping: 0.96,
            boundary_radius: 300.0,
            return_strength: 0.5,
        }
    }
}

impl ForceFieldConfig {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("attractor_scale", self.attractor_scale),
            ("attraction_strength", self.attraction_strength),
            ("attraction_softening", self.attraction_softening),
            ("repulsion_multiplier", self.repulsion_multiplier),
            ("flow_frequency", self.flow_frequency),
            ("flow_speed", self.flow_speed),
            ("flow_offset", self.flow_offset),
            ("flow_scale", self.flow_scale),
            ("damping", self.damping),
            ("boundary_radius", self.boundary_radius),
            ("return_strength", self.return_strength),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimError::config(format!("forces.{name} must be finite")));
        }

        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(SimError::config(format!(
                "forces.damping must be in (0, 1], got {}",
                self.damping
            )));
        }
        if self.attraction_softening <= 0.0 {
            return Err(SimError::config("forces.attraction_softening must be positive"));
        }
        if self.boundary_radius <= 0.0 {
            return Err(SimError::config("forces.boundary_radius must be positive"));
        }
        if self.return_strength < 0.0 {
            return Err(SimError::config("forces.return_strength must not be negative"));
        }
        Ok(())
    }
}

/// Glyph atlas layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Ordered, non-empty set of glyphs; index `i` lands in cell `i`.
    pub charset: String,
    pub cols: u32,
    pub rows: u32,

    /// Edge length of one square cell, in atlas pixels.
    pub cell_px: u32,

    /// Rasterization size of each glyph, in pixels.
    pub glyph_px: f32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            charset: DEFAULT_CHARSET.to_string(),
            cols: 10,
            rows: 10,
            cell_px: 64,
            glyph_px: 48.0,
        }
    }
}

impl AtlasConfig {
    /// Glyphs may be rasterized at most this many cells wide; the excess is cropped anyway.
    pub const MAX_GLYPH_SCALE: f32 = 4.0;

    pub(crate) fn check_glyph_px(&self) -> Result<()> {
        if !(self.glyph_px.is_finite() && self.glyph_px > 0.0) {
            return Err(SimError::config("atlas.glyph_px must be positive"));
        }
        let max = self.cell_px as f32 * Self::MAX_GLYPH_SCALE;
        if self.glyph_px > max {
            return Err(SimError::config(format!(
                "atlas.glyph_px {} exceeds {max} ({}x cell_px {})",
                self.glyph_px,
                Self::MAX_GLYPH_SCALE,
                self.cell_px
            )));
        }
        Ok(())
    }
}

/// How the integration pass is scheduled.
///
/// Both modes produce bit-identical state; `Serial` exists for hosts where a
/// thread pool is unwanted.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Parallel,
    Serial,
}

/// Everything the core accepts once at `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Side `N` of the particle grid; the core simulates `N²` particles.
    pub grid_side: u32,

    /// RNG seed for spawn positions and glyph assignment.
    ///
    /// `None` draws a fresh seed from the OS.
    pub seed: Option<u64>,

    /// Particles spawn uniformly in the cube `[-h, h]³`.
    pub spawn_half_extent: f32,

    pub execution: ExecutionMode,
    pub forces: ForceFieldConfig,
    pub atlas: AtlasConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_side: 128,
            seed: None,
            spawn_half_extent: 100.0,
            execution: ExecutionMode::default(),
            forces: ForceFieldConfig::default(),
            atlas: AtlasConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SimError::config(e.to_string()))
    }

    /// Number of particles implied by `grid_side`.
    pub fn particle_count(&self) -> Result<usize> {
        particle_count(self.grid_side)
    }

    pub fn validate(&self) -> Result<()> {
        self.particle_count()?;

        if !self.spawn_half_extent.is_finite() || self.spawn_half_extent < 0.0 {
            return Err(SimError::config(
                "spawn_half_extent must be finite and not negative",
            ));
        }

        self.forces.validate()?;

        // Atlas dimensions are checked by `GlyphAtlas::build`; only the
        // raster sizes are local to this config.
        if self.atlas.cell_px == 0 {
            return Err(SimError::config("atlas.cell_px must be positive"));
        }
        self.atlas.check_glyph_px()
    }
}

/// Returns `side²`, rejecting empty grids and overflow.
pub(crate) fn particle_count(side: u32) -> Result<usize> {
    if side == 0 {
        return Err(SimError::config("grid side must be greater than zero"));
    }
    let side = side as usize;
    side.checked_mul(side)
        .ok_or_else(|| SimError::config(format!("grid side {side} overflows the particle count")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert_eq!(SimulationConfig::default().particle_count(), Ok(128 * 128));
    }

    #[test]
    fn zero_grid_side_is_rejected() {
        let cfg = SimulationConfig { grid_side: 0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(SimError::Configuration(_))));
    }

    #[test]
    fn glyph_px_is_bounded_by_the_cell() {
        let mut cfg = SimulationConfig::default();
        cfg.atlas.cell_px = 16;
        cfg.atlas.glyph_px = 64.0;
        assert!(cfg.validate().is_ok());

        cfg.atlas.glyph_px = 64.5;
        assert!(matches!(cfg.validate(), Err(SimError::Configuration(_))));

        cfg.atlas.glyph_px = 70_000.0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("glyph_px"));
    }

    #[test]
    fn damping_outside_unit_interval_is_rejected() {
        for damping in [0.0, -0.5, 1.01, f32::NAN] {
            let forces = ForceFieldConfig { damping, ..Default::default() };
            assert!(forces.validate().is_err(), "damping {damping} accepted");
        }
    }

    #[test]
    fn undamped_is_allowed() {
        let forces = ForceFieldConfig { damping: 1.0, ..Default::default() };
        assert!(forces.validate().is_ok());
    }

    #[test]
    fn non_finite_parameter_is_named() {
        let forces = ForceFieldConfig { flow_speed: f32::INFINITY, ..Default::default() };
        let err = forces.validate().unwrap_err();
        assert!(err.to_string().contains("flow_speed"));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = SimulationConfig::from_json(
            r#"{ "grid_side": 16, "seed": 7, "forces": { "damping": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.grid_side, 16);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.forces.damping, 0.5);
        assert_eq!(cfg.forces.boundary_radius, 300.0);
        assert_eq!(cfg.atlas, AtlasConfig::default());
        assert_eq!(cfg.execution, ExecutionMode::Parallel);
    }

    #[test]
    fn execution_mode_uses_snake_case() {
        let cfg = SimulationConfig::from_json(r#"{ "execution": "serial" }"#).unwrap();
        assert_eq!(cfg.execution, ExecutionMode::Serial);
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        assert!(matches!(
            SimulationConfig::from_json("{ grid_side: }"),
            Err(SimError::Configuration(_))
        ));
    }
}
