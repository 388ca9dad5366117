use glam::{Vec2, Vec3, Vec4};
use rayon::prelude::*;

use crate::config::{ExecutionMode, ForceFieldConfig};
use crate::error::{Result, SimError};

use super::noise::simplex2;
use super::state::{StateView, StateViewMut};

/// External input sampled once per tick.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TickInput {
    /// Cursor in normalized device coordinates, `[-1, 1]` on both axes.
    pub cursor: Vec2,

    /// Whether the primary pointer button is held.
    pub pressed: bool,

    /// Monotonic timestamp in seconds.
    pub time: f32,
}

impl TickInput {
    pub fn new(cursor: Vec2, pressed: bool, time: f32) -> Self {
        Self { cursor, pressed, time }
    }

    fn validate(&self) -> Result<()> {
        if !self.cursor.is_finite() {
            return Err(SimError::InvalidInput(format!("cursor {} is not finite", self.cursor)));
        }
        if !self.time.is_finite() {
            return Err(SimError::InvalidInput(format!("time {} is not finite", self.time)));
        }
        Ok(())
    }
}

/// One integration pass: reads `current`, writes every texel of `next`.
///
/// Implementations must not read `next`; the store hands out the alternate
/// pair and only publishes it when this returns `Ok`.
pub trait Integrator {
    fn integrate(&self, current: StateView<'_>, next: StateViewMut<'_>, input: &TickInput) -> Result<()>;
}

/// Cursor attraction, noise flow, damping and soft boundary, per particle.
///
/// No particle reads another particle's state, so the pass is a plain
/// parallel map and serial/parallel schedules agree bit for bit.
#[derive(Debug, Clone)]
pub struct ForceIntegrator {
    forces: ForceFieldConfig,
    execution: ExecutionMode,
}

impl ForceIntegrator {
    pub fn new(forces: ForceFieldConfig, execution: ExecutionMode) -> Result<Self> {
        forces.validate()?;
        Ok(Self { forces, execution })
    }

    pub fn forces(&self) -> &ForceFieldConfig {
        &self.forces
    }

    pub fn execution(&self) -> ExecutionMode {
        self.execution
    }

    /// World-space attractor for a cursor position (on the z = 0 plane).
    pub fn attractor(&self, cursor: Vec2) -> Vec3 {
        let c = cursor.clamp(Vec2::splat(-1.0), Vec2::ONE);
        (c * self.forces.attractor_scale).extend(0.0)
    }

    /// Advances a single particle.
    ///
    /// Order is fixed: forces, then damping, then the boundary impulse.
    /// `w` components pass through unchanged.
    pub fn advance(&self, position: Vec4, velocity: Vec4, attractor: Vec3, input: &TickInput) -> (Vec4, Vec4) {
        let f = &self.forces;
        let p = position.truncate();
        let v = velocity.truncate();

        let next_p = p + v;

        let dir = attractor - p;
        let mut attraction =
            dir.normalize_or_zero() * (f.attraction_strength / (dir.length_squared() + f.attraction_softening));
        if input.pressed {
            attraction *= f.repulsion_multiplier;
        }

        let flow = self.flow(p, input.time);

        let mut next_v = (v + attraction + flow) * f.damping;

        if next_p.length() > f.boundary_radius {
            next_v -= next_p.normalize_or_zero() * f.return_strength;
        }

        (next_p.extend(position.w), next_v.extend(velocity.w))
    }

    fn flow(&self, p: Vec3, time: f32) -> Vec3 {
        let f = &self.forces;
        if f.flow_scale == 0.0 {
            return Vec3::ZERO;
        }

        let t = time * f.flow_speed;
        let q = Vec2::new(p.x, p.y) * f.flow_frequency + t;
        let side = Vec2::new(p.x, p.z) * f.flow_frequency + t;

        Vec3::new(simplex2(q), simplex2(q + f.flow_offset), simplex2(side)) * f.flow_scale
    }
}

impl Integrator for ForceIntegrator {
    fn integrate(&self, current: StateView<'_>, next: StateViewMut<'_>, input: &TickInput) -> Result<()> {
        input.validate()?;

        let count = current.position.len();
        if current.velocity.len() != count || next.position.len() != count || next.velocity.len() != count {
            return Err(SimError::config("state buffers disagree on particle count"));
        }

        let attractor = self.attractor(input.cursor);
        let update = |i: usize, p: &mut Vec4, v: &mut Vec4| {
            let (np, nv) = self.advance(current.position[i], current.velocity[i], attractor, input);
            *p = np;
            *v = nv;
        };

        match self.execution {
            ExecutionMode::Parallel => next
                .position
                .par_iter_mut()
                .zip(next.velocity.par_iter_mut())
                .enumerate()
                .for_each(|(i, (p, v))| update(i, p, v)),
            ExecutionMode::Serial => next
                .position
                .iter_mut()
                .zip(next.velocity.iter_mut())
                .enumerate()
                .for_each(|(i, (p, v))| update(i, p, v)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still_forces() -> ForceFieldConfig {
        ForceFieldConfig {
            attraction_strength: 0.0,
            flow_scale: 0.0,
            ..Default::default()
        }
    }

    fn integrator(forces: ForceFieldConfig) -> ForceIntegrator {
        ForceIntegrator::new(forces, ExecutionMode::Serial).unwrap()
    }

    #[test]
    fn damping_scales_speed_without_forces() {
        let it = integrator(ForceFieldConfig { damping: 0.8, ..still_forces() });
        let v = Vec4::new(3.0, -4.0, 1.0, 0.0);
        let (_, nv) = it.advance(Vec4::new(1.0, 2.0, 3.0, 1.0), v, Vec3::ZERO, &TickInput::default());
        let expected = v.truncate().length() * 0.8;
        assert!((nv.truncate().length() - expected).abs() < 1e-5);
        assert!(nv.truncate().length() < v.truncate().length());
    }

    #[test]
    fn position_advances_by_previous_velocity() {
        let it = integrator(still_forces());
        let (np, _) = it.advance(
            Vec4::new(1.0, 1.0, 1.0, 1.0),
            Vec4::new(0.5, -0.5, 2.0, 0.0),
            Vec3::ZERO,
            &TickInput::default(),
        );
        assert_eq!(np, Vec4::new(1.5, 0.5, 3.0, 1.0));
    }

    #[test]
    fn boundary_impulse_points_inward() {
        let it = integrator(ForceFieldConfig { boundary_radius: 5.0, return_strength: 0.25, ..still_forces() });
        for p in [Vec3::new(10.0, 0.0, 0.0), Vec3::new(-4.0, 6.0, 2.0), Vec3::new(0.0, 0.0, -9.0)] {
            let (_, nv) = it.advance(p.extend(1.0), Vec4::ZERO, Vec3::ZERO, &TickInput::default());
            assert!(nv.truncate().dot(-p) > 0.0, "impulse at {p} is not inward");
            assert!((nv.truncate().length() - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn inside_boundary_gets_no_impulse() {
        let it = integrator(ForceFieldConfig { boundary_radius: 5.0, ..still_forces() });
        let (_, nv) = it.advance(Vec4::new(1.0, 1.0, 1.0, 1.0), Vec4::ZERO, Vec3::ZERO, &TickInput::default());
        assert_eq!(nv, Vec4::ZERO);
    }

    #[test]
    fn pressing_flips_and_doubles_the_pull() {
        let it = integrator(ForceFieldConfig { attraction_strength: 100.0, ..still_forces() });
        let pos = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let target = Vec3::new(10.0, 0.0, 0.0);
        let (_, pull) = it.advance(pos, Vec4::ZERO, target, &TickInput::default());
        let pressed = TickInput { pressed: true, ..Default::default() };
        let (_, push) = it.advance(pos, Vec4::ZERO, target, &pressed);
        assert!(pull.x > 0.0);
        assert!((push.x + 2.0 * pull.x).abs() < 1e-6);
    }

    #[test]
    fn attraction_at_the_attractor_is_zero() {
        let it = integrator(ForceFieldConfig { attraction_strength: 100.0, ..still_forces() });
        let (_, nv) = it.advance(Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::ZERO, Vec3::ZERO, &TickInput::default());
        assert_eq!(nv, Vec4::ZERO);
    }

    #[test]
    fn attractor_follows_clamped_cursor() {
        let it = integrator(ForceFieldConfig::default());
        assert_eq!(it.attractor(Vec2::new(0.5, -1.0)), Vec3::new(75.0, -150.0, 0.0));
        assert_eq!(it.attractor(Vec2::new(4.0, 0.0)), Vec3::new(150.0, 0.0, 0.0));
    }

    #[test]
    fn flow_is_deterministic_and_time_dependent() {
        let it = integrator(ForceFieldConfig { attraction_strength: 0.0, ..Default::default() });
        let pos = Vec4::new(37.0, -12.0, 5.0, 1.0);
        let a = TickInput { time: 1.0, ..Default::default() };
        let b = TickInput { time: 9.0, ..Default::default() };
        let (_, va) = it.advance(pos, Vec4::ZERO, Vec3::ZERO, &a);
        let (_, va2) = it.advance(pos, Vec4::ZERO, Vec3::ZERO, &a);
        let (_, vb) = it.advance(pos, Vec4::ZERO, Vec3::ZERO, &b);
        assert_eq!(va, va2);
        assert_ne!(va, vb);
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let it = integrator(ForceFieldConfig::default());
        let pos = [Vec4::W];
        let vel = [Vec4::ZERO];
        let mut np = [Vec4::ZERO];
        let mut nv = [Vec4::ZERO];
        let input = TickInput { cursor: Vec2::new(f32::NAN, 0.0), ..Default::default() };
        let res = it.integrate(
            StateView { position: &pos, velocity: &vel },
            StateViewMut { position: &mut np, velocity: &mut nv },
            &input,
        );
        assert!(matches!(res, Err(SimError::InvalidInput(_))));
        assert_eq!(np[0], Vec4::ZERO);
    }
}
