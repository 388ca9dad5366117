//! The simulate-and-render core as one state machine.
//!
//! `Uninitialized` → `Running` via [`ParticleCore::initialize`]; there is no
//! terminal state. While running, the atlas is fixed for the core's lifetime;
//! `reset` redraws bindings and spawn positions but keeps the atlas.

use glam::{Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::atlas::{GlyphAtlas, GlyphSource};
use crate::binding::{GlyphAssignment, InstanceBindings};
use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::sim::{ForceIntegrator, StateStore, TickInput};

const SPAWN_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// Everything a renderer needs for one frame. Borrowed, read-only.
#[derive(Debug, Copy, Clone)]
pub struct FrameView<'a> {
    pub side: u32,
    pub positions: &'a [Vec4],
    pub velocities: &'a [Vec4],
    pub bindings: &'a InstanceBindings,
    pub atlas: &'a GlyphAtlas,

    /// Bumped whenever `bindings` are replaced; renderers cache on it.
    pub bindings_generation: u64,
}

impl FrameView<'_> {
    /// Current position addressed by a normalized grid reference.
    pub fn sample_position(&self, reference: glam::Vec2) -> Option<Vec4> {
        crate::sim::texel_index(self.side, reference).and_then(|i| self.positions.get(i).copied())
    }
}

/// Simulation core: atlas, bindings, state store and integrator.
#[derive(Debug, Default)]
pub struct ParticleCore {
    running: Option<Box<Running>>,
}

#[derive(Debug)]
struct Running {
    config: SimulationConfig,
    atlas: GlyphAtlas,
    bindings: InstanceBindings,
    store: StateStore,
    integrator: ForceIntegrator,
    glyph_rng: StdRng,
    spawn_rng: StdRng,
    generation: u64,
    ticks: u64,
}

impl ParticleCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Validates `config`, builds the atlas, binds every slot and seeds state.
    ///
    /// On error the core is left exactly as it was.
    pub fn initialize(&mut self, config: SimulationConfig, glyphs: &dyn GlyphSource) -> Result<()> {
        self.initialize_with(config, glyphs, None)
    }

    /// Like [`initialize`](Self::initialize), but restores a saved glyph
    /// assignment instead of drawing a new one.
    pub fn initialize_with_assignment(
        &mut self,
        config: SimulationConfig,
        glyphs: &dyn GlyphSource,
        assignment: GlyphAssignment,
    ) -> Result<()> {
        self.initialize_with(config, glyphs, Some(assignment))
    }

    fn initialize_with(
        &mut self,
        config: SimulationConfig,
        glyphs: &dyn GlyphSource,
        assignment: Option<GlyphAssignment>,
    ) -> Result<()> {
        config.validate()?;

        let atlas = GlyphAtlas::build(&config.atlas, glyphs)?;
        let integrator = ForceIntegrator::new(config.forces.clone(), config.execution)?;

        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().r#gen());
        // Separate streams: a restored assignment must not shift spawn positions.
        let mut glyph_rng = StdRng::seed_from_u64(seed);
        let mut spawn_rng = StdRng::seed_from_u64(seed ^ SPAWN_STREAM);

        let side = config.grid_side;
        let bindings = match assignment {
            Some(a) => InstanceBindings::with_assignment(side, atlas.glyph_count(), a)?,
            None => InstanceBindings::bind(side, atlas.glyph_count(), &mut glyph_rng)?,
        };
        let store = seed_store(side, config.spawn_half_extent, &mut spawn_rng)?;

        log::info!(
            "particle core running: {} particles, {} glyphs, seed {seed}, {:?} integration",
            store.len(),
            atlas.glyph_count(),
            config.execution
        );

        let generation = self.running.as_ref().map_or(0, |r| r.generation + 1);
        self.running = Some(Box::new(Running {
            config,
            atlas,
            bindings,
            store,
            integrator,
            glyph_rng,
            spawn_rng,
            generation,
            ticks: 0,
        }));
        Ok(())
    }

    /// Runs one tick: integrate into the alternate buffers, then swap.
    pub fn step(&mut self, input: TickInput) -> Result<()> {
        let r = self.running_mut()?;
        r.store.step(&r.integrator, &input)?;
        r.ticks += 1;
        Ok(())
    }

    /// Re-binds glyphs and re-seeds positions; the atlas is preserved.
    ///
    /// The RNG streams continue, so a reset produces a new layout even when
    /// the core was seeded explicitly.
    pub fn reset(&mut self) -> Result<()> {
        let r = self.running_mut()?;
        let side = r.config.grid_side;

        let bindings = InstanceBindings::bind(side, r.atlas.glyph_count(), &mut r.glyph_rng)?;
        let store = seed_store(side, r.config.spawn_half_extent, &mut r.spawn_rng)?;

        r.bindings = bindings;
        r.store = store;
        r.generation += 1;
        r.ticks = 0;
        log::debug!("particle core reset (generation {})", r.generation);
        Ok(())
    }

    /// Read-only view for renderers.
    pub fn frame(&self) -> Result<FrameView<'_>> {
        let r = self.running()?;
        let state = r.store.current()?;
        Ok(FrameView {
            side: r.store.side(),
            positions: state.position,
            velocities: state.velocity,
            bindings: &r.bindings,
            atlas: &r.atlas,
            bindings_generation: r.generation,
        })
    }

    pub fn config(&self) -> Result<&SimulationConfig> {
        self.running().map(|r| &r.config)
    }

    pub fn atlas(&self) -> Result<&GlyphAtlas> {
        self.running().map(|r| &r.atlas)
    }

    pub fn bindings(&self) -> Result<&InstanceBindings> {
        self.running().map(|r| &r.bindings)
    }

    /// Ticks since the last initialize or reset.
    pub fn ticks(&self) -> Result<u64> {
        self.running().map(|r| r.ticks)
    }

    fn running(&self) -> Result<&Running> {
        self.running.as_deref().ok_or(SimError::NotInitialized)
    }

    fn running_mut(&mut self) -> Result<&mut Running> {
        self.running.as_deref_mut().ok_or(SimError::NotInitialized)
    }
}

/// Store seeded with positions uniform in `[-h, h]³`.
fn seed_store(side: u32, half_extent: f32, rng: &mut StdRng) -> Result<StateStore> {
    let mut store = StateStore::new();
    store.initialize(side, |_| {
        if half_extent == 0.0 {
            return Vec3::ZERO;
        }
        Vec3::new(
            rng.gen_range(-half_extent..=half_extent),
            rng.gen_range(-half_extent..=half_extent),
            rng.gen_range(-half_extent..=half_extent),
        )
    })?;
    Ok(store)
}
