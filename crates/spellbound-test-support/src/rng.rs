//! Test RNGs: deterministic `DeterministicRng` implementations for tests.

use spellbound_core::rng::DeterministicRng;

/// A no-op RNG that always returns `min` for `next_u32_range` and `0.0` for
/// `next_f64`: every percent roll succeeds when its chance is above zero,
/// and damage rolls use the full random factor.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }

    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

/// An RNG that returns the same unit draw forever.
#[derive(Debug, Clone, Copy)]
pub struct ConstantRng(pub f64);

fn scale(draw: f64, min: u32, max: u32) -> u32 {
    if min >= max {
        return min;
    }
    let span = f64::from(max - min) + 1.0;
    // Truncation toward zero is the point: the draw picks a bucket.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let offset = (draw * span).floor() as u32;
    min.saturating_add(offset).min(max)
}

impl DeterministicRng for ConstantRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        scale(self.0, min, max)
    }

    fn next_f64(&mut self) -> f64 {
        self.0
    }
}

/// An RNG that returns unit draws from a predetermined sequence. Panics if
/// the sequence is exhausted, which makes it double as an assertion on how
/// many draws a rule performs.
///
/// `next_u32_range(min, max)` maps the draw onto the inclusive range as
/// `min + floor(draw × (max − min + 1))`.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<f64>,
    index: usize,
}

impl SequenceRng {
    /// Create a new `SequenceRng` with the given draws in `[0, 1)`.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, index: 0 }
    }

    /// Number of draws not yet taken.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len() - self.index
    }

    fn next_draw(&mut self) -> f64 {
        let value = self.values[self.index];
        self.index += 1;
        value
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let draw = self.next_draw();
        scale(draw, min, max)
    }

    fn next_f64(&mut self) -> f64 {
        self.next_draw()
    }
}
