//! Divide-and-conquer scramble with and without interference.
//!
//! Demonstrates: build array → scramble in place → scramble while copies
//! escape → compare results and storage counters.

use cowarray_bench::reference_profile;
use cowarray_buffer::metrics;
use cowarray_test_utils::scramble::{scramble, Interference};

fn main() {
    println!("=== cowarray scramble report ===\n");

    let profile = reference_profile();

    let mut quiet = profile.build(42);
    let before = metrics::snapshot();
    let reallocations = scramble(&mut quiet, &mut Interference::off());
    let delta = metrics::snapshot().since(&before);
    println!("Without interference ({} elements)", profile.len);
    println!("  reallocations observed: {reallocations}");
    println!(
        "  in_place={}, cow_copies={}, growth={}",
        delta.in_place_mutations, delta.cow_copies, delta.growth_reallocations,
    );

    let mut noisy = profile.build(42);
    let mut interference = Interference::on();
    let before = metrics::snapshot();
    let reallocations = scramble(&mut noisy, &mut interference);
    let delta = metrics::snapshot().since(&before);
    println!("\nWith interference");
    println!("  reallocations observed: {reallocations}");
    println!(
        "  escapes={}, mutated_copies={}",
        interference.escapes(),
        interference.mutated_copies(),
    );
    println!(
        "  in_place={}, cow_copies={}, allocations={}",
        delta.in_place_mutations, delta.cow_copies, delta.allocations,
    );

    println!(
        "\nResults identical: {}",
        if quiet == noisy { "yes" } else { "NO" }
    );
}
