// src/terrain/noise/noise_utils.rs
//
// Stateless value-noise primitives. Every function here is pure: identical
// inputs give bit-identical outputs, which is what lets a worker thread and the
// synchronous fallback produce the same chunk.

use noise::NoiseFn;

/// Seed offset applied per octave so layers do not line up.
pub const OCTAVE_SEED_STRIDE: i64 = 1000;

#[inline]
fn fract(v: f64) -> f64 {
    v - v.floor()
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Pseudo-random scalar in `[0, 1)` for an integer lattice point.
pub fn hash(x: i64, y: i64, seed: i64) -> f64 {
    let n = (x as f64 * 127.1 + y as f64 * 311.7 + seed as f64 * 74.7).sin() * 43758.5453123;
    fract(n)
}

/// Bilinear interpolation of the four surrounding lattice hashes, faded on each axis.
pub fn value_noise_2d(x: f64, y: f64, seed: i64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let u = fade(x - x0);
    let v = fade(y - y0);

    let ix = x0 as i64;
    let iy = y0 as i64;

    let v00 = hash(ix, iy, seed);
    let v10 = hash(ix.wrapping_add(1), iy, seed);
    let v01 = hash(ix, iy.wrapping_add(1), seed);
    let v11 = hash(ix.wrapping_add(1), iy.wrapping_add(1), seed);

    lerp(lerp(v00, v10, u), lerp(v01, v11, u), v)
}

/// Multi-octave value noise normalised by total amplitude.
/// Zero octaves means zero amplitude and the result is 0.
pub fn fractal_noise_2d(
    x: f64,
    y: f64,
    seed: i64,
    octaves: u32,
    lacunarity: f64,
    gain: f64,
) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_amplitude = 0.0;

    for octave in 0..octaves {
        let octave_seed = seed.wrapping_add(i64::from(octave) * OCTAVE_SEED_STRIDE);
        total += value_noise_2d(x * frequency, y * frequency, octave_seed) * amplitude;
        max_amplitude += amplitude;
        amplitude *= gain;
        frequency *= lacunarity;
    }

    if max_amplitude == 0.0 {
        0.0
    } else {
        total / max_amplitude
    }
}

/// Folded single-octave noise; peaks where the underlying noise crosses 0.5.
pub fn ridge_noise(x: f64, y: f64, seed: i64) -> f64 {
    1.0 - (2.0 * fractal_noise_2d(x, y, seed, 1, 2.0, 0.5) - 1.0).abs()
}

// --- noise-rs adapters ---

#[derive(Debug, Clone, Copy)]
pub struct ValueNoise {
    pub seed: i64,
}

impl NoiseFn<f64, 2> for ValueNoise {
    fn get(&self, point: [f64; 2]) -> f64 {
        value_noise_2d(point[0], point[1], self.seed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FractalNoise {
    pub seed: i64,
    pub octaves: u32,
    pub lacunarity: f64,
    pub gain: f64,
}

impl NoiseFn<f64, 2> for FractalNoise {
    fn get(&self, point: [f64; 2]) -> f64 {
        fractal_noise_2d(point[0], point[1], self.seed, self.octaves, self.lacunarity, self.gain)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RidgeNoise {
    pub seed: i64,
}

impl NoiseFn<f64, 2> for RidgeNoise {
    fn get(&self, point: [f64; 2]) -> f64 {
        ridge_noise(point[0], point[1], self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_reproducible_and_in_range() {
        for x in -20..20 {
            for y in -20..20 {
                let a = hash(x, y, 1234);
                let b = hash(x, y, 1234);
                assert_eq!(a.to_bits(), b.to_bits());
                assert!((0.0..1.0).contains(&a), "hash out of range: {a}");
            }
        }
    }

    #[test]
    fn value_noise_matches_lattice_hash_at_integer_points() {
        for x in -5..5 {
            for y in -5..5 {
                let v = value_noise_2d(x as f64, y as f64, 77);
                assert_eq!(v.to_bits(), hash(x, y, 77).to_bits());
            }
        }
    }

    #[test]
    fn value_noise_stays_within_corner_bounds() {
        let seed = 9;
        let (x, y): (f64, f64) = (3.25, -7.6);
        let (ix, iy) = (x.floor() as i64, y.floor() as i64);
        let corners = [
            hash(ix, iy, seed),
            hash(ix + 1, iy, seed),
            hash(ix, iy + 1, seed),
            hash(ix + 1, iy + 1, seed),
        ];
        let lo = corners.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = corners.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let v = value_noise_2d(x, y, seed);
        assert!(v >= lo - 1e-12 && v <= hi + 1e-12);
    }

    #[test]
    fn zero_octaves_yield_zero() {
        assert_eq!(fractal_noise_2d(12.5, 3.0, 42, 0, 2.0, 0.5), 0.0);
    }

    #[test]
    fn single_octave_fractal_equals_value_noise() {
        let a = fractal_noise_2d(1.7, 2.9, 5, 1, 2.0, 0.5);
        let b = value_noise_2d(1.7, 2.9, 5);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn fractal_stays_in_unit_range() {
        for i in 0..200 {
            let x = i as f64 * 0.173 - 11.0;
            let y = i as f64 * 0.291 + 4.0;
            let v = fractal_noise_2d(x, y, 99, 5, 2.0, 0.5);
            assert!((0.0..1.0).contains(&v), "fractal out of range: {v}");
        }
    }

    #[test]
    fn ridge_is_folded() {
        for i in 0..100 {
            let x = i as f64 * 0.37;
            let r = ridge_noise(x, -x, 3);
            assert!((0.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn noise_fn_adapters_match_free_functions() {
        let f = FractalNoise { seed: 11, octaves: 3, lacunarity: 2.0, gain: 0.5 };
        assert_eq!(f.get([0.4, 8.1]), fractal_noise_2d(0.4, 8.1, 11, 3, 2.0, 0.5));
        assert_eq!(ValueNoise { seed: 2 }.get([1.5, 1.5]), value_noise_2d(1.5, 1.5, 2));
        assert_eq!(RidgeNoise { seed: 4 }.get([0.3, 0.9]), ridge_noise(0.3, 0.9, 4));
    }
}
