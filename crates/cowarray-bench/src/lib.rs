//! Benchmark profiles and utilities for the cowarray storage layer.
//!
//! Provides pre-built [`ArrayProfile`]s for benchmarking and examples:
//!
//! - [`reference_profile`]: 10K elements with the default growth policy
//! - [`stress_profile`]: 100K elements for stress testing
//! - [`deterministic_values`]: reproducible element values via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use cowarray_buffer::{CowArray, GrowthPolicy};

/// Size and growth policy of a benchmark array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayProfile {
    /// Number of elements.
    pub len: usize,
    /// Growth policy of every buffer the array allocates.
    pub policy: GrowthPolicy,
}

impl ArrayProfile {
    /// Build the profile's array, filled with [`deterministic_values`].
    pub fn build(&self, seed: u64) -> CowArray<i64> {
        let mut array = CowArray::with_policy(self.len, self.policy);
        array.extend(deterministic_values(self.len, seed));
        array
    }
}

/// Reference benchmark profile: 10K elements.
pub fn reference_profile() -> ArrayProfile {
    ArrayProfile {
        len: 10_000,
        policy: GrowthPolicy::default(),
    }
}

/// Stress benchmark profile: 100K elements.
///
/// Same growth policy as [`reference_profile`] at 10x the element count.
pub fn stress_profile() -> ArrayProfile {
    ArrayProfile {
        len: 100_000,
        policy: GrowthPolicy::default(),
    }
}

/// Generate `n` deterministic element values.
///
/// Values come from a linear congruential sequence seeded with `seed`, so
/// runs with the same seed scramble the same data.
pub fn deterministic_values(n: usize, seed: u64) -> Vec<i64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as i64
        })
        .collect()
}
