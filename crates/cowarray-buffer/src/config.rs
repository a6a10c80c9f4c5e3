//! Buffer growth configuration.

/// Capacity growth policy for native buffers.
///
/// Every native buffer carries the policy it was allocated with; buffers
/// created from it by copy or reallocation inherit it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrowthPolicy {
    /// Smallest capacity handed out when an append grows a buffer.
    ///
    /// Default: 4. Growing an empty array by one element allocates room
    /// for this many.
    pub min_nonzero_capacity: usize,
}

impl GrowthPolicy {
    /// Default floor for a grown buffer's capacity.
    pub const DEFAULT_MIN_NONZERO_CAPACITY: usize = 4;

    /// Create a policy with default values.
    pub fn new() -> Self {
        Self {
            min_nonzero_capacity: Self::DEFAULT_MIN_NONZERO_CAPACITY,
        }
    }

    /// Create a policy with the given growth floor.
    pub fn with_min_nonzero_capacity(min_nonzero_capacity: usize) -> Self {
        Self {
            min_nonzero_capacity,
        }
    }

    /// Capacity of the buffer to allocate when a buffer of
    /// `old_capacity` must be replaced by one holding at least `minimum`
    /// elements.
    ///
    /// Appends grow geometrically: the old capacity is doubled and then
    /// clamped up to `minimum` and the growth floor, so a run of appends
    /// costs amortized O(1) each. An append that already fits keeps the
    /// old capacity. Any other copy allocates exactly `minimum`, which
    /// may shrink the buffer.
    pub fn capacity_for(&self, old_capacity: usize, minimum: usize, grow_for_append: bool) -> usize {
        if !grow_for_append {
            return minimum;
        }
        if old_capacity >= minimum {
            return old_capacity;
        }
        old_capacity
            .saturating_mul(2)
            .max(minimum)
            .max(self.min_nonzero_capacity)
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::new()
    }
}
