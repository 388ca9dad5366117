//! Per-instance side tables: where each particle reads its state, and which
//! glyph it wears.
//!
//! Both tables are produced once and never change afterwards. They are kept
//! apart from the simulation buffers on purpose: the integrator never sees
//! them, and the renderer never writes them.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::particle_count;
use crate::error::{Result, SimError};

/// The persistent glyph index of every particle, in particle order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphAssignment {
    grid_side: u32,
    glyphs: Vec<u32>,
}

impl GlyphAssignment {
    /// Draws one glyph index in `[0, capacity)` for each of `side²` particles.
    pub fn random<R: Rng + ?Sized>(side: u32, capacity: u32, rng: &mut R) -> Result<Self> {
        let count = particle_count(side)?;
        if capacity == 0 {
            return Err(SimError::config("atlas has no glyphs to assign"));
        }
        let glyphs = (0..count).map(|_| rng.gen_range(0..capacity)).collect();
        Ok(Self { grid_side: side, glyphs })
    }

    pub fn grid_side(&self) -> u32 {
        self.grid_side
    }

    pub fn glyphs(&self) -> &[u32] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SimError::config(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SimError::config(e.to_string()))
    }

    /// Checks the table against a grid and an atlas.
    pub fn validate(&self, side: u32, capacity: u32) -> Result<()> {
        let count = particle_count(side)?;
        if self.grid_side != side || self.glyphs.len() != count {
            return Err(SimError::config(format!(
                "glyph assignment is for a {0}x{0} grid with {1} entries, expected {side}x{side}",
                self.grid_side,
                self.glyphs.len()
            )));
        }
        if let Some((i, g)) = self.glyphs.iter().enumerate().find(|(_, g)| **g >= capacity) {
            return Err(SimError::config(format!(
                "particle {i} uses glyph {g}, atlas only has {capacity}"
            )));
        }
        Ok(())
    }
}

/// Normalized grid coordinate of particle `index`: `((i mod N)/N, (i div N)/N)`.
pub fn reference(side: u32, index: usize) -> Vec2 {
    let n = side as usize;
    Vec2::new((index % n) as f32 / side as f32, (index / n) as f32 / side as f32)
}

/// Reference coordinates plus glyph assignment for every particle slot.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBindings {
    side: u32,
    references: Vec<Vec2>,
    assignment: GlyphAssignment,
}

impl InstanceBindings {
    /// Binds `side²` slots with freshly drawn glyphs.
    pub fn bind<R: Rng + ?Sized>(side: u32, capacity: u32, rng: &mut R) -> Result<Self> {
        let assignment = GlyphAssignment::random(side, capacity, rng)?;
        Self::with_assignment(side, capacity, assignment)
    }

    /// Binds `side²` slots using a previously produced assignment.
    pub fn with_assignment(side: u32, capacity: u32, assignment: GlyphAssignment) -> Result<Self> {
        assignment.validate(side, capacity)?;
        let references = (0..assignment.len()).map(|i| reference(side, i)).collect();
        Ok(Self { side, references, assignment })
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn references(&self) -> &[Vec2] {
        &self.references
    }

    pub fn assignment(&self) -> &GlyphAssignment {
        &self.assignment
    }

    /// `(reference, glyph)` per particle, in particle order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec2, u32)> + '_ {
        self.references.iter().copied().zip(self.assignment.glyphs.iter().copied())
    }
}
