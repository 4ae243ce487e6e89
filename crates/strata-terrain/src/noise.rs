//! Seeded 3D simplex noise.
//!
//! A coordinate is skewed into a simplex-grid cell, the four corners of its
//! tetrahedron each contribute a gradient falloff, and the sum is scaled into
//! `[-1, 1]`. The only state is a 256-entry permutation table shuffled once
//! per seed; it is never mutated afterwards, so a [`SimplexNoise`] can be
//! shared across threads freely.

use rand::seq::SliceRandom;

use crate::error::TerrainError;
use crate::seed::noise_rng;

/// Skew factor for 3D: `1/3`.
const F3: f64 = 1.0 / 3.0;
/// Unskew factor for 3D: `1/6`.
const G3: f64 = 1.0 / 6.0;

/// Edge midpoints of a cube, the classic 12 simplex gradients.
const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

/// 3D simplex noise bound to one seed.
#[derive(Clone)]
pub struct SimplexNoise {
    seed: u64,
    /// 256 entries doubled to 512 so corner lookups never wrap.
    perm: [u8; 512],
}

impl SimplexNoise {
    /// Builds the permutation table for `seed`.
    pub fn new(seed: u64) -> Self {
        let mut table: Vec<u8> = (0..=255).collect();
        table.shuffle(&mut noise_rng(seed));

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i & 255];
        }
        Self { seed, perm }
    }

    /// The seed this table was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    fn hash(&self, i: i64, j: i64, k: i64) -> usize {
        let i = (i & 255) as usize;
        let j = (j & 255) as usize;
        let k = (k & 255) as usize;
        self.perm[i + self.perm[j + self.perm[k] as usize] as usize] as usize % 12
    }

    /// Noise at a point, in `[-1, 1]`.
    pub fn sample(&self, x: f64, y: f64, z: f64) -> f32 {
        self.sample_f64(x, y, z) as f32
    }

    /// Full-precision noise at a point, in `[-1, 1]`.
    pub fn sample_f64(&self, x: f64, y: f64, z: f64) -> f64 {
        // Skew into simplex space to find the containing cell.
        let s = (x + y + z) * F3;
        let i = (x + s).floor();
        let j = (y + s).floor();
        let k = (z + s).floor();
        let t = (i + j + k) * G3;
        let x0 = x - (i - t);
        let y0 = y - (j - t);
        let z0 = z - (k - t);

        // Which of the six tetrahedra the point lies in.
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let corners = [
            (x0, y0, z0, 0, 0, 0),
            (
                x0 - i1 as f64 + G3,
                y0 - j1 as f64 + G3,
                z0 - k1 as f64 + G3,
                i1,
                j1,
                k1,
            ),
            (
                x0 - i2 as f64 + 2.0 * G3,
                y0 - j2 as f64 + 2.0 * G3,
                z0 - k2 as f64 + 2.0 * G3,
                i2,
                j2,
                k2,
            ),
            (
                x0 - 1.0 + 3.0 * G3,
                y0 - 1.0 + 3.0 * G3,
                z0 - 1.0 + 3.0 * G3,
                1,
                1,
                1,
            ),
        ];

        let (ii, jj, kk) = (i as i64, j as i64, k as i64);
        let mut total = 0.0;
        for (dx, dy, dz, oi, oj, ok) in corners {
            let falloff = 0.6 - dx * dx - dy * dy - dz * dz;
            if falloff > 0.0 {
                let g = GRAD3[self.hash(ii + oi, jj + oj, kk + ok)];
                let f2 = falloff * falloff;
                total += f2 * f2 * (g[0] * dx + g[1] * dy + g[2] * dz);
            }
        }

        (32.0 * total).clamp(-1.0, 1.0)
    }

    /// Fractal sum of `params.octaves` samples, normalized into `[-1, 1]`.
    pub fn multi_octave(&self, x: f64, y: f64, z: f64, params: &OctaveParams) -> f32 {
        let mut frequency = params.frequency;
        let mut amplitude = 1.0;
        let mut total = 0.0;
        let mut max_amplitude = 0.0;

        for _ in 0..params.octaves {
            total += self.sample_f64(x * frequency, y * frequency, z * frequency) * amplitude;
            max_amplitude += amplitude;
            frequency *= params.lacunarity;
            amplitude *= params.persistence;
        }

        if max_amplitude > 0.0 {
            (total / max_amplitude).clamp(-1.0, 1.0) as f32
        } else {
            0.0
        }
    }
}

impl std::fmt::Debug for SimplexNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimplexNoise").field("seed", &self.seed).finish()
    }
}

/// Fractal noise parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctaveParams {
    /// Number of summed samples.
    pub octaves: u32,
    /// Frequency of the first octave.
    pub frequency: f64,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Amplitude multiplier per octave.
    pub persistence: f64,
}

impl OctaveParams {
    /// Rejects parameters that would make the sum degenerate.
    pub fn validate(&self) -> Result<(), TerrainError> {
        if self.octaves == 0 {
            return Err(TerrainError::DegenerateOctaves);
        }
        for (name, value) in [
            ("frequency", self.frequency),
            ("lacunarity", self.lacunarity),
            ("persistence", self.persistence),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(TerrainError::InvalidNoiseParameter(name));
            }
        }
        Ok(())
    }
}

impl Default for OctaveParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            frequency: 0.01,
            lacunarity: 2.0,
            persistence: 0.5,
        }
    }
}

/// One-shot noise sample. Builds the permutation table on every call, so
/// hot loops should hold a [`SimplexNoise`] instead.
pub fn sample(seed: u64, x: f64, y: f64, z: f64) -> f32 {
    SimplexNoise::new(seed).sample(x, y, z)
}

/// One-shot fractal sample; see [`SimplexNoise::multi_octave`].
pub fn multi_octave(seed: u64, x: f64, y: f64, z: f64, params: &OctaveParams) -> f32 {
    SimplexNoise::new(seed).multi_octave(x, y, z, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> impl Iterator<Item = (f64, f64, f64)> {
        (0..2000).map(|i| {
            let f = i as f64;
            (f * 0.37 - 300.0, f * 0.113 + 17.5, -f * 0.291 + 40.25)
        })
    }

    #[test]
    fn test_same_seed_bit_identical() {
        let a = SimplexNoise::new(42);
        let b = SimplexNoise::new(42);
        for (x, y, z) in points() {
            assert_eq!(a.sample(x, y, z).to_bits(), b.sample(x, y, z).to_bits());
        }
    }

    #[test]
    fn test_call_order_independent() {
        let noise = SimplexNoise::new(7);
        let forward: Vec<f32> = points().map(|(x, y, z)| noise.sample(x, y, z)).collect();
        let mut backward: Vec<f32> = points()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|(x, y, z)| noise.sample(x, y, z))
            .collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_free_function_matches_instance() {
        let noise = SimplexNoise::new(99);
        assert_eq!(sample(99, 1.5, -2.25, 3.75), noise.sample(1.5, -2.25, 3.75));
    }

    #[test]
    fn test_output_in_range() {
        let noise = SimplexNoise::new(12345);
        for (x, y, z) in points() {
            let v = noise.sample(x, y, z);
            assert!((-1.0..=1.0).contains(&v), "sample {v} out of range at ({x}, {y}, {z})");
        }
    }

    #[test]
    fn test_multi_octave_in_range() {
        let noise = SimplexNoise::new(5);
        let params = OctaveParams {
            octaves: 6,
            frequency: 0.05,
            lacunarity: 2.0,
            persistence: 0.5,
        };
        for (x, y, z) in points() {
            let v = noise.multi_octave(x, y, z, &params);
            assert!((-1.0..=1.0).contains(&v), "octave sum {v} out of range");
        }
    }

    #[test]
    fn test_continuity_under_small_delta() {
        let noise = SimplexNoise::new(77);
        let delta = 0.001;
        for (x, y, z) in points() {
            let diff = (noise.sample(x, y, z) - noise.sample(x + delta, y, z)).abs();
            assert!(diff <= 0.05, "jump of {diff} at ({x}, {y}, {z})");
        }
    }

    #[test]
    fn test_not_constant() {
        let noise = SimplexNoise::new(3);
        let values: Vec<f32> = points().map(|(x, y, z)| noise.sample(x, y, z)).collect();
        let min = values.iter().copied().fold(f32::MAX, f32::min);
        let max = values.iter().copied().fold(f32::MIN, f32::max);
        assert!(max - min > 0.5, "noise should vary, spread was {}", max - min);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = SimplexNoise::new(1);
        let b = SimplexNoise::new(2);
        let differing = points()
            .filter(|&(x, y, z)| a.sample(x, y, z) != b.sample(x, y, z))
            .count();
        assert!(differing > 1000, "only {differing} samples differed between seeds");
    }

    #[test]
    fn test_degenerate_params_rejected() {
        let mut params = OctaveParams::default();
        params.octaves = 0;
        assert_eq!(params.validate(), Err(TerrainError::DegenerateOctaves));

        let params = OctaveParams {
            frequency: 0.0,
            ..OctaveParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(TerrainError::InvalidNoiseParameter("frequency"))
        );
    }
}
