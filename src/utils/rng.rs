//! Seedable random number generator for parameter initialization.
//!
//! A small xorshift PRNG keeps initialization reproducible: the same seed
//! always yields the same filters, weights and therefore forward outputs.

use std::f32::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

const FALLBACK_STATE: u64 = 0x9e3779b97f4a7c15;

/// f32 carries 24 bits of mantissa; wider draws can round up to 1.0.
const UNIT_BITS: u32 = 24;

/// Xorshift RNG. Not cryptographic.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { FALLBACK_STATE } else { seed };
        Self { state }
    }

    /// Reseed based on the current time.
    pub fn reseed_from_time(&mut self) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        self.state = if nanos == 0 { FALLBACK_STATE } else { nanos };
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Convert to [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        unit_f32(self.next_u32())
    }

    /// Uniform sample in [low, high).
    pub fn gen_range_f32(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }

    /// Standard normal sample (mean 0, variance 1) via the Box-Muller transform.
    ///
    /// Consumes exactly two uniform draws per call.
    pub fn gen_normal_f32(&mut self) -> f32 {
        // next_f32() < 1, so u1 is in (0, 1] and ln() stays finite.
        let u1 = 1.0 - self.next_f32();
        let theta = self.gen_range_f32(0.0, 2.0 * PI);
        (-2.0 * u1.ln()).sqrt() * theta.cos()
    }
}

fn unit_f32(bits: u32) -> f32 {
    (bits >> (32 - UNIT_BITS)) as f32 / (1u32 << UNIT_BITS) as f32
}
