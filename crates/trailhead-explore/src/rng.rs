//! Deterministic choice sources for the greedy coverage search.
//!
//! Each planning stage gets its own generator seeded from
//! `(global_seed + stage_id)`. Same seed -> same plans, always.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Source of uniform index choices. Injectable so tests can pin sequences.
pub trait ChoiceRng {
    /// Uniform index in `0..len`. `len` is never zero.
    fn next_index(&mut self, len: usize) -> usize;
}

impl ChoiceRng for ChaCha8Rng {
    fn next_index(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }
}

const LCG_MULTIPLIER: u64 = 1_103_515_245;
const LCG_INCREMENT: u64 = 12_345;
const LCG_MODULUS: u64 = 1 << 31;

/// Linear congruential generator with the classic `rand()` constants.
///
/// Kept for reproducing plan sets produced by older seeded runs.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed % LCG_MODULUS,
        }
    }

    pub fn next_u31(&mut self) -> u32 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state as u32
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.next_u31() as f64 / LCG_MODULUS as f64
    }
}

impl ChoiceRng for Lcg {
    fn next_index(&mut self, len: usize) -> usize {
        let index = (self.next_f64() * len as f64) as usize;
        index.min(len - 1)
    }
}

/// Which generator a planning run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RngKind {
    #[default]
    Chacha,
    Lcg,
}

/// Create a deterministic RNG for a given global seed and stage ID.
pub fn stage_rng(global_seed: u64, stage_id: u64) -> ChaCha8Rng {
    let combined = global_seed.wrapping_add(stage_id);
    ChaCha8Rng::seed_from_u64(combined)
}

/// Boxed choice source of the requested kind for one stage.
pub fn seeded(kind: RngKind, global_seed: u64, stage_id: u64) -> Box<dyn ChoiceRng> {
    match kind {
        RngKind::Chacha => Box::new(stage_rng(global_seed, stage_id)),
        RngKind::Lcg => Box::new(Lcg::new(global_seed.wrapping_add(stage_id))),
    }
}

/// Pick one element uniformly, `None` for an empty slice.
pub fn choose<'a, T>(rng: &mut dyn ChoiceRng, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.next_index(items.len()))
}
