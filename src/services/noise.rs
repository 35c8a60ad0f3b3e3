//! Coherent 2D value noise.
//!
//! Lattice corners get pseudo-random values from an integer hash; samples in
//! between are blended with a quintic fade, so the output is continuous,
//! deterministic for a given `(x, y)`, and bounded to `[-1, 1]`.

/// Sample the noise field at `(x, y)`.
#[must_use]
pub fn noise2d(x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    #[allow(clippy::cast_possible_truncation)]
    let (ix, iy) = (x0 as i64, y0 as i64);

    let v00 = lattice(ix, iy);
    let v10 = lattice(ix.wrapping_add(1), iy);
    let v01 = lattice(ix, iy.wrapping_add(1));
    let v11 = lattice(ix.wrapping_add(1), iy.wrapping_add(1));

    let u = fade(fx);
    let v = fade(fy);
    let top = lerp(v00, v10, u);
    let bottom = lerp(v01, v11, u);
    lerp(top, bottom, v).clamp(-1.0, 1.0)
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Hash a lattice point to a value in `[-1, 1]`.
#[allow(clippy::cast_sign_loss)]
fn lattice(ix: i64, iy: i64) -> f64 {
    let mut h = (ix as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (iy as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h = h.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    h ^= h >> 33;
    // Top 53 bits give a uniform float in [0, 1).
    let unit = (h >> 11) as f64 / (1_u64 << 53) as f64;
    unit * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_input() {
        assert!((noise2d(12.34, 5.67) - noise2d(12.34, 5.67)).abs() < f64::EPSILON);
    }

    #[test]
    fn bounded_to_unit_range() {
        for i in 0..2_000 {
            let x = f64::from(i) * 0.173 - 150.0;
            let y = f64::from(i) * 0.071 + 3.0;
            let n = noise2d(x, y);
            assert!((-1.0..=1.0).contains(&n), "noise({x}, {y}) = {n}");
        }
    }

    #[test]
    fn continuous_across_small_steps() {
        let mut prev = noise2d(7.0, 0.0);
        for i in 1..1_000 {
            let t = f64::from(i) * 0.001;
            let next = noise2d(7.0, t);
            assert!((next - prev).abs() < 0.05, "jump at t={t}");
            prev = next;
        }
    }

    #[test]
    fn lattice_points_equal_hashed_corner() {
        assert!((noise2d(3.0, 4.0) - lattice(3, 4)).abs() < 1e-12);
    }

    #[test]
    fn different_seeds_diverge() {
        let a: Vec<f64> = (0..20).map(|i| noise2d(1.5, f64::from(i) * 0.37)).collect();
        let b: Vec<f64> = (0..20).map(|i| noise2d(211.5, f64::from(i) * 0.37)).collect();
        assert_ne!(a, b);
    }
}
