//! Deterministic seeded generator and shuffle.
//!
//! Every device holding the same seed must reproduce the identical
//! permutation, so the generator state is pure integer arithmetic; floats
//! appear only at the output boundary. Do not introduce platform-dependent
//! operations or external RNG crates here.

const LCG_MUL: u64 = 1_664_525;
const LCG_INC: u64 = 1_013_904_223;
const LCG_MOD: u64 = 1 << 32;

/// Linear congruential generator with a 32-bit state.
///
/// Two instances built from the same seed yield identical sequences on every
/// platform. Reproducible decisions (role shuffle, turn order) must go
/// through an instance seeded from the room code; non-reproducible ones
/// (word draw) use a separate instance seeded from [`entropy_seed`]. The two
/// must never share an instance.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: u64::from(seed) % LCG_MOD,
        }
    }

    /// Next value in [0, 1).
    pub fn next(&mut self) -> f64 {
        self.state = (self.state.wrapping_mul(LCG_MUL).wrapping_add(LCG_INC)) % LCG_MOD;
        self.state as f64 / LCG_MOD as f64
    }

    /// Uniform index in [0, n). `n` must be nonzero.
    pub fn next_below(&mut self, n: usize) -> usize {
        (self.next() * n as f64) as usize
    }

    /// In-place Fisher–Yates pass, one `next()` per remaining-element step.
    ///
    /// The walk order (from the end, `j = floor(next() * remaining)`) is part
    /// of the cross-device contract; changing it changes every derived
    /// permutation.
    pub fn shuffle_in_place<T>(&mut self, items: &mut [T]) {
        let mut remaining = items.len();
        while remaining > 1 {
            let j = self.next_below(remaining);
            remaining -= 1;
            items.swap(remaining, j);
        }
    }

    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut out = items.to_vec();
        self.shuffle_in_place(&mut out);
        out
    }
}

/// Polynomial rolling hash over character codes, for deriving a seed from a
/// non-numeric room code. Must be identical on every device.
pub fn hash_seed(code: &str) -> u32 {
    let mut h: u32 = 0;
    for ch in code.chars() {
        h = h.wrapping_mul(31).wrapping_add(ch as u32);
    }
    h
}

/// Seed for round `round` of the game identified by `base`. Successive
/// rounds of one room reuse the code seed but land on distinct streams.
pub fn round_seed(base: u32, round: u32) -> u32 {
    base.wrapping_add(round.wrapping_mul(0x9E37_79B9))
}

/// A non-deterministic seed for decisions that must *not* agree across
/// devices (word draw, local-only games).
pub fn entropy_seed() -> u32 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    hasher.write_u64(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64,
    );
    hasher.finish() as u32
}
