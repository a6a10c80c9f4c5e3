//! Divide-and-conquer stress harness.
//!
//! [`scramble`] recursively splits an array into halves through nested
//! [`SliceMut`] views and swaps the first and last element of every piece
//! shorter than four. When the storage is exclusively owned all of that
//! happens in place, so the harness counts *reallocations*: pieces whose
//! storage no longer lies inside the footprint of the piece they were
//! split from.
//!
//! [`Interference`] tries to break copy-on-write while the scramble runs,
//! either by mutating a temporary copy of a piece (even lengths) or by
//! escaping a copy of it (odd lengths). Neither may change the result.

use std::mem;
use std::ops::RangeInclusive;

use cowarray_buffer::{ArraySlice, CowArray, SliceMut};

/// Interference applied to every piece longer than one element.
pub struct Interference<T> {
    enabled: bool,
    escaped: Option<ArraySlice<T>>,
    escapes: usize,
    mutated_copies: usize,
}

impl<T> Interference<T> {
    /// No interference.
    pub fn off() -> Self {
        Self {
            enabled: false,
            escaped: None,
            escapes: 0,
            mutated_copies: 0,
        }
    }

    /// Mutate copies of even-length pieces and escape odd-length ones.
    pub fn on() -> Self {
        Self {
            enabled: true,
            ..Self::off()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// How many pieces were escaped.
    pub fn escapes(&self) -> usize {
        self.escapes
    }

    /// How many temporary copies were mutated.
    pub fn mutated_copies(&self) -> usize {
        self.mutated_copies
    }

    /// The most recently escaped piece.
    pub fn escaped(&self) -> Option<&ArraySlice<T>> {
        self.escaped.as_ref()
    }

    /// Drop the escaped piece, returning it.
    pub fn release(&mut self) -> Option<ArraySlice<T>> {
        self.escaped.take()
    }
}

/// Address range a piece of `count` elements starting at `base` occupies,
/// including the past-the-end address.
pub fn footprint<T>(base: usize, count: usize) -> RangeInclusive<usize> {
    base..=base + count * mem::size_of::<T>()
}

fn address_of<T>(ptr: Option<*const T>) -> usize {
    ptr.map_or(0, |p| p.addr())
}

/// Scramble `array`, returning the number of reallocations.
pub fn scramble<T: Clone>(array: &mut CowArray<T>, interference: &mut Interference<T>) -> usize {
    let count = array.len();
    scramble_root(&mut array.slice_mut(0..count), interference)
}

/// Scramble `slice`, returning the number of reallocations.
pub fn scramble_slice<T: Clone>(
    slice: &mut ArraySlice<T>,
    interference: &mut Interference<T>,
) -> usize {
    let count = slice.len();
    scramble_root(&mut slice.slice_mut(0..count), interference)
}

fn scramble_root<T: Clone>(view: &mut SliceMut<'_, T>, interference: &mut Interference<T>) -> usize {
    let count = view.len();
    if count < 1 {
        return 0;
    }
    if count < 4 {
        view.swap(0, count - 1);
        return 0;
    }
    let base = address_of(view.first_element_address());
    let expected = footprint::<T>(base, count);
    let m = count / 2;
    let r0 = scramble_in(&mut view.slice_mut(0..m), &expected, interference);
    let r1 = scramble_in(&mut view.slice_mut(m..count), &expected, interference);
    r0 + r1
}

/// Scramble `view`, whose storage was expected to lie within `expected`.
pub fn scramble_in<T: Clone>(
    view: &mut SliceMut<'_, T>,
    expected: &RangeInclusive<usize>,
    interference: &mut Interference<T>,
) -> usize {
    let base = address_of(view.first_element_address());
    let mut reallocations = usize::from(!expected.contains(&base));
    let count = view.len();
    if count < 1 {
        return reallocations;
    }

    if interference.enabled && count > 1 {
        if count % 2 == 0 {
            let mut copy = view.to_slice();
            let second = copy.get(1);
            copy.set(0, second);
            interference.mutated_copies += 1;
        } else {
            interference.escaped = Some(view.to_slice());
            interference.escapes += 1;
        }
    }

    if count < 4 {
        view.swap(0, count - 1);
    } else {
        let footprint = footprint::<T>(base, count);
        let m = count / 2;
        reallocations += scramble_in(&mut view.slice_mut(0..m), &footprint, interference);
        reallocations += scramble_in(&mut view.slice_mut(m..count), &footprint, interference);
    }
    reallocations
}
