//! Thread-local randomness for augmentation workers.
//!
//! Every randomized operator draws from a per-thread `StdRng` instead of
//! global state. A worker seeds its generator once with [`init_worker_rng`];
//! threads that never call it get an OS-seeded generator on first use.
//! Because the generator is thread-local, pipelines can be shared across
//! threads without locking.

use rand::rngs::StdRng;
use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::Rng as _;
use rand::SeedableRng;
use std::cell::RefCell;

thread_local! {
    /// Thread-local RNG for deterministic randomness in workers
    pub static WORKER_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Initialize worker's RNG based on worker_id, epoch, and base seed.
/// Seed formula: base_seed + (epoch << 32) + worker_id
/// This ensures each worker has unique but deterministic randomness.
pub fn init_worker_rng(worker_id: usize, epoch: usize, base_seed: u64) {
    WORKER_RNG.with(|rng| {
        let seed = base_seed
            .wrapping_add((epoch as u64) << 32)
            .wrapping_add(worker_id as u64);
        *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
    })
}

/// Runs `f` against this thread's generator, creating it from OS entropy
/// if the worker never seeded it.
///
/// `f` must not call back into any `worker_*` helper.
pub fn with_worker_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    WORKER_RNG.with(|rng| {
        let mut rng_ref = rng.borrow_mut();
        let rng = rng_ref.get_or_insert_with(StdRng::from_os_rng);
        f(rng)
    })
}

/// Bernoulli trial with success probability `p` (must lie in [0, 1]).
pub fn worker_gen_bool(p: f64) -> bool {
    with_worker_rng(|rng| rng.random_bool(p))
}

/// Like [`worker_gen_bool`] but leaves the RNG untouched when `p` is exactly
/// 0 or 1, so always/never steps do not shift the random stream.
pub fn worker_coin(p: f64) -> bool {
    match p {
        0.0 => false,
        1.0 => true,
        _ => worker_gen_bool(p),
    }
}

/// Uniform draw from `range`. Panics on an empty range, like `Rng::random_range`.
pub fn worker_gen_range<T, R>(range: R) -> T
where
    T: SampleUniform,
    R: SampleRange<T>,
{
    with_worker_rng(|rng| rng.random_range(range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_draws() {
        init_worker_rng(0, 0, 7);
        let first: Vec<u32> = (0..16).map(|_| worker_gen_range(0..1000)).collect();

        init_worker_rng(0, 0, 7);
        let second: Vec<u32> = (0..16).map(|_| worker_gen_range(0..1000)).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_workers_get_distinct_streams() {
        init_worker_rng(0, 0, 7);
        let worker0: Vec<u32> = (0..16).map(|_| worker_gen_range(0..1000)).collect();

        init_worker_rng(1, 0, 7);
        let worker1: Vec<u32> = (0..16).map(|_| worker_gen_range(0..1000)).collect();

        assert_ne!(worker0, worker1);
    }

    #[test]
    fn test_unseeded_thread_still_draws() {
        let handle = std::thread::spawn(|| worker_gen_bool(1.0));
        assert!(handle.join().unwrap());
    }
}
