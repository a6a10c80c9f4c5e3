//! Contract-violation diagnostics.
//!
//! Every failure this storage layer can detect is a programming error on
//! the caller's side: an out-of-range index, an aliasing violation during
//! an operation that assumed exclusive ownership, or an element that does
//! not match the type an array was cast to. None of them is recoverable,
//! because continuing could corrupt other live aliases of the same buffer,
//! so the storage crates report them through [`violation`], which panics
//! with the violation's `Display` text.
//!
//! The enum is still a proper error type so that non-trapping probes
//! (e.g. `try_get`) can hand it back to callers as a `Result`.

use std::error::Error;
use std::fmt;

use crate::id::Representation;

/// A broken storage contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContractViolation {
    /// An element index outside `[0, count)`.
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Number of live elements at the time of the access.
        count: usize,
    },
    /// A range that is inverted or extends past the live elements.
    RangeOutOfBounds {
        /// Lower bound of the requested range.
        start: usize,
        /// Upper bound (exclusive) of the requested range.
        end: usize,
        /// Number of live elements at the time of the access.
        count: usize,
    },
    /// The storage representation changed underneath an operation that
    /// recorded it at its start.
    ExclusivityViolated {
        /// Representation recorded when the operation began.
        expected: Representation,
        /// Representation found when it was re-verified.
        found: Representation,
    },
    /// An element failed a deferred type check.
    ElementTypeMismatch {
        /// Whether the element came from a foreign array.
        foreign: bool,
        /// The declared element type.
        expected: &'static str,
        /// The element's actual runtime type.
        found: &'static str,
    },
    /// A requested element count does not fit in `usize`.
    CapacityOverflow {
        /// Elements already present.
        count: usize,
        /// Elements requested on top of `count`.
        additional: usize,
    },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfBounds { index, count } => {
                write!(
                    f,
                    "index out of bounds: the index is {index} but the count is {count}"
                )
            }
            Self::RangeOutOfBounds { start, end, count } => {
                write!(f, "range {start}..{end} out of bounds for count {count}")
            }
            Self::ExclusivityViolated { expected, found } => {
                write!(
                    f,
                    "inout rules were violated: the array was overwritten \
                     (expected {expected} storage, found {found})"
                )
            }
            Self::ElementTypeMismatch {
                foreign: true,
                expected,
                found,
            } => {
                write!(
                    f,
                    "foreign array element failed to match the declared element type: \
                     expected {expected} but found {found}"
                )
            }
            Self::ElementTypeMismatch {
                foreign: false,
                expected,
                found,
            } => {
                write!(
                    f,
                    "down-casted array element failed to match the target type: \
                     expected {expected} but found {found}"
                )
            }
            Self::CapacityOverflow { count, additional } => {
                write!(
                    f,
                    "capacity overflow: {count} + {additional} elements exceeds usize"
                )
            }
        }
    }
}

impl Error for ContractViolation {}

/// Trap on a broken contract.
///
/// The single panic point of the storage layer. The panic message is the
/// violation's `Display` text, so tests can match on it with
/// `#[should_panic(expected = ...)]`.
#[cold]
#[track_caller]
pub fn violation(v: ContractViolation) -> ! {
    panic!("{v}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_out_of_bounds_message() {
        let v = ContractViolation::IndexOutOfBounds { index: 7, count: 3 };
        assert_eq!(
            v.to_string(),
            "index out of bounds: the index is 7 but the count is 3"
        );
    }

    #[test]
    fn exclusivity_message_names_both_representations() {
        let v = ContractViolation::ExclusivityViolated {
            expected: Representation::NativeTypeChecked,
            found: Representation::Foreign,
        };
        let msg = v.to_string();
        assert!(msg.starts_with("inout rules were violated"));
        assert!(msg.contains("native (type-checked)"));
        assert!(msg.contains("found foreign"));
    }

    #[test]
    fn type_mismatch_message_depends_on_origin() {
        let native = ContractViolation::ElementTypeMismatch {
            foreign: false,
            expected: "Dog",
            found: "Cat",
        };
        let foreign = ContractViolation::ElementTypeMismatch {
            foreign: true,
            expected: "Dog",
            found: "Cat",
        };
        assert!(native.to_string().starts_with("down-casted array element"));
        assert!(foreign.to_string().starts_with("foreign array element"));
        assert!(native.to_string().ends_with("expected Dog but found Cat"));
    }

    #[test]
    #[should_panic(expected = "range 4..2 out of bounds for count 9")]
    fn violation_panics_with_display_text() {
        violation(ContractViolation::RangeOutOfBounds {
            start: 4,
            end: 2,
            count: 9,
        });
    }

    #[test]
    fn violation_is_std_error() {
        fn assert_error<E: Error>(_: &E) {}
        assert_error(&ContractViolation::CapacityOverflow {
            count: usize::MAX,
            additional: 1,
        });
    }
}
