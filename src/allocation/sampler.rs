use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use super::DrawError;

/// Builds the draw's random stream from an arbitrary seed string.
///
/// The 32-byte `StdRng` seed is `md5(seed) || md5(md5(seed))`, so the same
/// string always replays the same sequence for a given `rand` release.
pub fn seeded_rng(seed: &str) -> StdRng {
    let first = md5::compute(seed.as_bytes());
    let second = md5::compute(first.0);

    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(&first.0);
    bytes[16..].copy_from_slice(&second.0);
    StdRng::from_seed(bytes)
}

/// Picks one key with probability proportional to its weight.
///
/// Entries are walked in ascending key order; that order is part of the
/// replay contract for stored seeds. Non-positive entries can never win.
pub fn weighted_choice<K, R>(rng: &mut R, weights: &BTreeMap<K, f64>) -> Result<K, DrawError>
where
    K: Copy + Ord,
    R: Rng + ?Sized,
{
    let total: f64 = weights.values().filter(|w| **w > 0.0).sum();
    if !(total > 0.0) {
        return Err(DrawError::EmptyWeights);
    }

    let pick = rng.r#gen::<f64>() * total;
    let mut acc = 0.0;
    let mut last_positive = None;
    for (&key, &weight) in weights {
        if weight <= 0.0 {
            continue;
        }
        acc += weight;
        if acc > pick {
            return Ok(key);
        }
        last_positive = Some(key);
    }

    // float rounding can leave `acc` a hair under `pick`
    last_positive.ok_or(DrawError::EmptyWeights)
}
