use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Derive the RNG owned by one region worker, ensuring independent streams.
///
/// Worker streams start at offset 1 so that no worker shares the stream
/// returned by [`create_rng`] for the same seed.
pub fn derive_worker_rng(base_seed: u64, region_index: usize) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(base_seed.wrapping_add(
        (region_index as u64 + 1).wrapping_mul(crate::constants::RNG_DERIVATION_PRIME),
    ))
}
