use glam::{Vec2, Vec3, Vec4};

use crate::config::particle_count;
use crate::error::{Result, SimError};

use super::integrator::{Integrator, TickInput};

/// Read-only view of one buffer pair.
#[derive(Debug, Copy, Clone)]
pub struct StateView<'a> {
    pub position: &'a [Vec4],
    pub velocity: &'a [Vec4],
}

/// Writable view of the alternate buffer pair.
#[derive(Debug)]
pub struct StateViewMut<'a> {
    pub position: &'a mut [Vec4],
    pub velocity: &'a mut [Vec4],
}

/// Double-buffered particle state over an `N × N` grid.
///
/// Positions carry `w = 1`, velocities `w = 0`. Each buffer is laid out
/// row-major: texel `(col, row)` lives at index `row * N + col`.
///
/// The store never writes the current pair. `step` fills the alternate pair
/// and flips `current` only after the integrator reports success, so a
/// failed tick leaves the visible state exactly as it was.
#[derive(Debug, Default)]
pub struct StateStore {
    buffers: Option<Buffers>,
}

#[derive(Debug)]
struct Buffers {
    side: u32,
    position: [Vec<Vec4>; 2],
    velocity: [Vec<Vec4>; 2],
    current: usize,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates both buffer pairs for `side²` particles.
    ///
    /// `seed(index)` supplies each initial position; velocities start at rest.
    /// Calling this again discards the previous state.
    pub fn initialize<F>(&mut self, side: u32, mut seed: F) -> Result<()>
    where
        F: FnMut(usize) -> Vec3,
    {
        let count = particle_count(side)?;

        let initial: Vec<Vec4> = (0..count).map(|i| seed(i).extend(1.0)).collect();
        if let Some(i) = initial.iter().position(|p| !p.is_finite()) {
            return Err(SimError::config(format!("seed produced a non-finite position at {i}")));
        }

        let rest = vec![Vec4::ZERO; count];
        self.buffers = Some(Buffers {
            side,
            position: [initial.clone(), initial],
            velocity: [rest.clone(), rest],
            current: 0,
        });

        log::debug!("state store: {side}x{side} grid, {count} particles");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }

    /// Grid side `N`, or 0 before initialization.
    pub fn side(&self) -> u32 {
        self.buffers.as_ref().map_or(0, |b| b.side)
    }

    /// Number of particles, or 0 before initialization.
    pub fn len(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.position[0].len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index (0 or 1) of the buffer pair currently visible to readers.
    pub fn current_index(&self) -> Option<usize> {
        self.buffers.as_ref().map(|b| b.current)
    }

    /// Runs one integration pass and flips the current pair on success.
    pub fn step<I>(&mut self, integrator: &I, input: &TickInput) -> Result<()>
    where
        I: Integrator + ?Sized,
    {
        let buffers = self.buffers.as_mut().ok_or(SimError::NotInitialized)?;
        let current = buffers.current;

        let (position, next_position) = split_pair(&mut buffers.position, current);
        let (velocity, next_velocity) = split_pair(&mut buffers.velocity, current);

        integrator.integrate(
            StateView { position, velocity },
            StateViewMut { position: next_position, velocity: next_velocity },
            input,
        )?;

        buffers.current = 1 - current;
        Ok(())
    }

    pub fn current(&self) -> Result<StateView<'_>> {
        let b = self.buffers.as_ref().ok_or(SimError::NotInitialized)?;
        Ok(StateView {
            position: &b.position[b.current],
            velocity: &b.velocity[b.current],
        })
    }

    pub fn current_position(&self) -> Result<&[Vec4]> {
        self.current().map(|v| v.position)
    }

    pub fn current_velocity(&self) -> Result<&[Vec4]> {
        self.current().map(|v| v.velocity)
    }

    /// Looks up the current position addressed by a normalized grid reference.
    ///
    /// `reference` is `(col / N, row / N)`; returns `None` when it falls
    /// outside the grid or the store is not initialized.
    pub fn sample_position(&self, reference: Vec2) -> Option<Vec4> {
        let b = self.buffers.as_ref()?;
        let index = texel_index(b.side, reference)?;
        b.position[b.current].get(index).copied()
    }
}

/// Converts a normalized reference to a row-major texel index.
pub fn texel_index(side: u32, reference: Vec2) -> Option<usize> {
    let n = side as f32;
    let col = (reference.x * n).round();
    let row = (reference.y * n).round();
    if !(col >= 0.0 && row >= 0.0 && col < n && row < n) {
        return None;
    }
    Some(row as usize * side as usize + col as usize)
}

fn split_pair(pair: &mut [Vec<Vec4>; 2], current: usize) -> (&[Vec4], &mut [Vec4]) {
    let [first, second] = pair;
    if current == 0 {
        (first.as_slice(), second.as_mut_slice())
    } else {
        (second.as_slice(), first.as_mut_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Copies position + velocity forward; counts nothing, touches nothing else.
    struct Drift;

    impl Integrator for Drift {
        fn integrate(&self, current: StateView<'_>, next: StateViewMut<'_>, _: &TickInput) -> Result<()> {
            for (i, (p, v)) in next.position.iter_mut().zip(next.velocity.iter_mut()).enumerate() {
                *p = current.position[i] + current.velocity[i];
                *v = current.velocity[i] + Vec4::new(1.0, 0.0, 0.0, 0.0);
            }
            Ok(())
        }
    }

    /// Scribbles over the alternate buffers and then fails.
    struct Failing;

    impl Integrator for Failing {
        fn integrate(&self, _: StateView<'_>, next: StateViewMut<'_>, _: &TickInput) -> Result<()> {
            next.position.fill(Vec4::splat(f32::NAN));
            Err(SimError::InvalidInput("boom".into()))
        }
    }

    fn store(side: u32) -> StateStore {
        let mut s = StateStore::new();
        s.initialize(side, |i| Vec3::new(i as f32, 0.0, 0.0)).unwrap();
        s
    }

    #[test]
    fn zero_side_is_a_configuration_error() {
        let mut s = StateStore::new();
        assert!(matches!(s.initialize(0, |_| Vec3::ZERO), Err(SimError::Configuration(_))));
        assert!(!s.is_initialized());
    }

    #[test]
    fn step_before_initialize_fails() {
        let mut s = StateStore::new();
        assert_eq!(s.step(&Drift, &TickInput::default()), Err(SimError::NotInitialized));
        assert_eq!(s.current_position().unwrap_err(), SimError::NotInitialized);
    }

    #[test]
    fn initialize_seeds_positions_and_zeroes_velocities() {
        let s = store(3);
        assert_eq!(s.len(), 9);
        assert_eq!(s.side(), 3);
        let view = s.current().unwrap();
        assert_eq!(view.position[4], Vec4::new(4.0, 0.0, 0.0, 1.0));
        assert!(view.velocity.iter().all(|v| *v == Vec4::ZERO));
    }

    #[test]
    fn non_finite_seed_is_rejected() {
        let mut s = StateStore::new();
        let err = s.initialize(2, |i| if i == 3 { Vec3::splat(f32::NAN) } else { Vec3::ZERO });
        assert!(matches!(err, Err(SimError::Configuration(_))));
        assert!(!s.is_initialized());
    }

    #[test]
    fn step_flips_current_pair() {
        let mut s = store(2);
        assert_eq!(s.current_index(), Some(0));
        s.step(&Drift, &TickInput::default()).unwrap();
        assert_eq!(s.current_index(), Some(1));
        assert_eq!(s.current_velocity().unwrap()[0].x, 1.0);
        s.step(&Drift, &TickInput::default()).unwrap();
        assert_eq!(s.current_index(), Some(0));
        // Second tick read the first tick's output, not stale data.
        assert_eq!(s.current_velocity().unwrap()[0].x, 2.0);
        assert_eq!(s.current_position().unwrap()[2].x, 3.0);
    }

    #[test]
    fn failed_step_leaves_visible_state_untouched() {
        let mut s = store(2);
        let before: Vec<Vec4> = s.current_position().unwrap().to_vec();
        assert!(s.step(&Failing, &TickInput::default()).is_err());
        assert_eq!(s.current_index(), Some(0));
        assert_eq!(s.current_position().unwrap(), before.as_slice());
    }

    #[test]
    fn sample_position_follows_reference() {
        let s = store(4);
        // (col 1, row 2) -> index 9
        let p = s.sample_position(Vec2::new(0.25, 0.5)).unwrap();
        assert_eq!(p.x, 9.0);
        assert!(s.sample_position(Vec2::new(1.0, 0.0)).is_none());
        assert!(s.sample_position(Vec2::new(-0.3, 0.0)).is_none());
    }
}
