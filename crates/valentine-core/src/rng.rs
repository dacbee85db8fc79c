#![forbid(unsafe_code)]

//! Injectable randomness.
//!
//! Every random branch (hide-hint choice, spawn jitter, dive gates) draws
//! from a [`RandomSource`] so hosts can seed it and tests can script it.

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A source of uniform values in `[0, 1)`.
pub trait RandomSource {
    /// Next uniform sample in `[0, 1)`.
    fn next_unit(&mut self) -> f32;

    /// Bernoulli gate: `true` with probability `p`.
    fn chance(&mut self, p: f32) -> bool {
        self.next_unit() < p
    }

    /// Uniform value in `[lo, hi)`. Returns `lo` for an empty range.
    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.next_unit()
    }

    /// Uniform offset in `[-radius, radius)`.
    fn jitter(&mut self, radius: f32) -> f32 {
        self.range(-radius, radius)
    }

    /// Uniform index into a slice of length `len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        ((self.next_unit() * len as f32) as usize).min(len.saturating_sub(1))
    }
}

/// `SmallRng`-backed source.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: SmallRng,
}

impl SeededRandom {
    /// Deterministic stream for a given seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Seed from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f32 {
        self.rng.random::<f32>()
    }
}

/// Replays a scripted list of samples, then repeats `fallback`.
///
/// Values are clamped into `[0, 1)` so a script can't push a branch out
/// of range.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    queue: VecDeque<f32>,
    fallback: f32,
    drawn: usize,
}

impl SequenceRandom {
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            queue: values.into_iter().collect(),
            fallback,
            drawn: 0,
        }
    }

    /// A source that always returns `value`.
    #[must_use]
    pub fn constant(value: f32) -> Self {
        Self::new(std::iter::empty(), value)
    }

    /// Append more scripted samples.
    pub fn push(&mut self, values: impl IntoIterator<Item = f32>) {
        self.queue.extend(values);
    }

    /// How many samples have been drawn so far.
    #[must_use]
    pub const fn drawn(&self) -> usize {
        self.drawn
    }

    /// Scripted samples not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f32 {
        self.drawn += 1;
        let v = self.queue.pop_front().unwrap_or(self.fallback);
        v.clamp(0.0, 0.999_999)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_unit(&mut self) -> f32 {
        (**self).next_unit()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_unit(&mut self) -> f32 {
        (**self).next_unit()
    }
}
