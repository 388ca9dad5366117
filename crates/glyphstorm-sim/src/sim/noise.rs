use glam::{Vec2, Vec3};

// Skew/unskew constants for the 2D simplex lattice:
// (3 - sqrt(3)) / 6, (sqrt(3) - 1) / 2, -1 + 2 * C0, 1 / 41.
const C0: f32 = 0.211_324_87;
const C1: f32 = 0.366_025_4;
const C2: f32 = -0.577_350_26;
const C3: f32 = 0.024_390_243;

#[inline]
fn mod289(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn mod289_2(x: Vec2) -> Vec2 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn permute(x: Vec3) -> Vec3 {
    mod289((x * 34.0 + Vec3::ONE) * x)
}

/// 2D simplex noise in roughly `[-1, 1]`.
///
/// Uses the permutation-polynomial formulation (no lookup tables), so the
/// value depends only on `v` and is identical across threads and runs.
pub fn simplex2(v: Vec2) -> f32 {
    // First corner.
    let i = (v + Vec2::splat(v.dot(Vec2::splat(C1)))).floor();
    let x0 = v - i + Vec2::splat(i.dot(Vec2::splat(C0)));

    // Middle corner depends on which triangle of the cell we are in.
    let i1 = if x0.x > x0.y { Vec2::X } else { Vec2::Y };
    let x1 = x0 + Vec2::splat(C0) - i1;
    let x2 = x0 + Vec2::splat(C2);

    let i = mod289_2(i);
    let p = permute(
        permute(Vec3::splat(i.y) + Vec3::new(0.0, i1.y, 1.0))
            + Vec3::splat(i.x)
            + Vec3::new(0.0, i1.x, 1.0),
    );

    let mut m = (Vec3::splat(0.5) - Vec3::new(x0.dot(x0), x1.dot(x1), x2.dot(x2))).max(Vec3::ZERO);
    m *= m;
    m *= m;

    // Gradients: 41 points uniformly over a line, mapped onto a diamond.
    let pw = p * C3;
    let x = 2.0 * (pw - pw.floor()) - Vec3::ONE;
    let h = x.abs() - Vec3::splat(0.5);
    let ox = (x + Vec3::splat(0.5)).floor();
    let a0 = x - ox;

    // Normalise gradients implicitly by scaling m.
    m *= Vec3::splat(1.792_842_9) - 0.853_734_7 * (a0 * a0 + h * h);

    let g = Vec3::new(
        a0.x * x0.x + h.x * x0.y,
        a0.y * x1.x + h.y * x1.y,
        a0.z * x2.x + h.z * x2.y,
    );
    130.0 * m.dot(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let p = Vec2::new(12.34, -5.67);
        assert_eq!(simplex2(p).to_bits(), simplex2(p).to_bits());
    }

    #[test]
    fn bounded_over_a_sweep() {
        for ix in -40..40 {
            for iy in -40..40 {
                let n = simplex2(Vec2::new(ix as f32 * 0.37, iy as f32 * 0.53));
                assert!(n.is_finite());
                assert!(n.abs() <= 1.05, "noise {n} out of range");
            }
        }
    }

    #[test]
    fn varies_across_space() {
        let a = simplex2(Vec2::new(0.3, 0.7));
        let b = simplex2(Vec2::new(4.1, 2.9));
        let c = simplex2(Vec2::new(-7.5, 1.2));
        assert!(a != b || b != c);
    }

    #[test]
    fn lattice_corners_are_zero() {
        // Every gradient contribution vanishes at a skewed lattice point.
        assert!(simplex2(Vec2::ZERO).abs() < 1e-6);
    }
}
