//! Deterministic RNG streams for generator tasks.
//!
//! Every generator task owns an independent random stream identified by
//! `locale * max_task_par + worker`, so a run reproduces exactly for a
//! given base seed no matter how rayon schedules the tasks, and no RNG
//! state is ever shared. Seeds are derived by a 64-bit avalanche finalizer
//! (xor-shift/multiply rounds) applied to the base seed and the stream
//! index, salted with crate-specific constants so unrelated consumers of
//! the same base seed do not collide.

use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::locale::LocaleId;

/// `"hyperloo"` in ASCII; separates stream seeding from every other use of
/// a base seed.
const STREAM_SALT: u64 = 0x6879_7065_726C_6F6F;

/// 64-bit avalanche finalizer: three xor-shifts around two odd multipliers.
#[inline]
pub(crate) fn mix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    x ^= x >> 33;
    x = x.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    x ^= x >> 33;
    x
}

/// Derive a sub-seed for a tagged purpose (an affinity-block round, a
/// residual pass) from a base seed. Tags are mixed before combining so
/// small consecutive tags still land far apart.
#[inline]
pub(crate) fn derive_seed(base_seed: u64, tag: u64) -> u64 {
    mix64(base_seed ^ mix64(tag ^ STREAM_SALT))
}

/// Seed of stream `locale * max_task_par + worker` under `base_seed`.
#[inline]
pub fn stream_seed(base_seed: u64, locale: LocaleId, max_task_par: usize, worker: usize) -> u64 {
    let stream = (locale.get() * max_task_par + worker) as u64;
    mix64(mix64(base_seed ^ STREAM_SALT).wrapping_add(stream))
}

/// The RNG for one generator task, owned by that task alone.
pub fn task_rng(base_seed: u64, locale: LocaleId, max_task_par: usize, worker: usize) -> SmallRng {
    SmallRng::seed_from_u64(stream_seed(base_seed, locale, max_task_par, worker))
}
