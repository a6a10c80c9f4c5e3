//! Copy-on-write and allocation counters.
//!
//! [`CowMetrics`] counts the storage events of the current thread: fresh
//! allocations, copies forced by sharing, reallocations forced by growth,
//! mutations performed in place, deferred element checks and foreign
//! bridges. Counters are per-thread so that concurrently running tests do
//! not observe each other; read them with [`snapshot`] and measure an
//! operation by diffing two snapshots with [`CowMetrics::since`].

use std::cell::Cell;

/// Storage event counters for one thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CowMetrics {
    /// Native storage blocks allocated, including empty ones.
    pub allocations: u64,
    /// Buffers copied because another owner shared them.
    pub cow_copies: u64,
    /// Uniquely owned buffers reallocated because they ran out of capacity.
    pub growth_reallocations: u64,
    /// Mutations applied to a uniquely owned buffer without copying.
    pub in_place_mutations: u64,
    /// Elements verified against a declared element type.
    pub element_type_checks: u64,
    /// Foreign arrays whose contents were copied into a native buffer.
    pub foreign_bridges: u64,
}

impl CowMetrics {
    const ZERO: Self = Self {
        allocations: 0,
        cow_copies: 0,
        growth_reallocations: 0,
        in_place_mutations: 0,
        element_type_checks: 0,
        foreign_bridges: 0,
    };

    /// Counter deltas accumulated after `earlier` was taken.
    pub fn since(&self, earlier: &CowMetrics) -> CowMetrics {
        CowMetrics {
            allocations: self.allocations.saturating_sub(earlier.allocations),
            cow_copies: self.cow_copies.saturating_sub(earlier.cow_copies),
            growth_reallocations: self
                .growth_reallocations
                .saturating_sub(earlier.growth_reallocations),
            in_place_mutations: self
                .in_place_mutations
                .saturating_sub(earlier.in_place_mutations),
            element_type_checks: self
                .element_type_checks
                .saturating_sub(earlier.element_type_checks),
            foreign_bridges: self.foreign_bridges.saturating_sub(earlier.foreign_bridges),
        }
    }

    /// Every event that moved elements into a new native buffer.
    pub fn reallocations(&self) -> u64 {
        self.cow_copies + self.growth_reallocations + self.foreign_bridges
    }
}

thread_local! {
    static METRICS: Cell<CowMetrics> = const { Cell::new(CowMetrics::ZERO) };
}

/// The current thread's counters.
pub fn snapshot() -> CowMetrics {
    METRICS.with(Cell::get)
}

/// Zero the current thread's counters.
pub fn reset() {
    METRICS.with(|m| m.set(CowMetrics::ZERO));
}

pub(crate) fn record(update: impl FnOnce(&mut CowMetrics)) {
    METRICS.with(|m| {
        let mut current = m.get();
        update(&mut current);
        m.set(current);
    });
}
