//! First-class invariants over successive game snapshots.
//!
//! Each invariant relates a snapshot to its successor. The model checks
//! them when a remote snapshot replaces the mirror, and the authoritative
//! session checks them before accepting a merged update.

/// A logical property that must hold across a state transition.
pub trait Invariant<S> {
    /// Checks if the invariant holds from `before` to `after`.
    fn holds(before: &S, after: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{}", description)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implemented for a tuple of four [`Invariant`]s.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(before: &S, after: &S) -> Result<(), Vec<InvariantViolation>>;
}

fn check<S, I: Invariant<S>>(before: &S, after: &S, violations: &mut Vec<InvariantViolation>) {
    if !I::holds(before, after) {
        violations.push(InvariantViolation::new(I::description()));
    }
}

impl<S, I1, I2, I3, I4> InvariantSet<S> for (I1, I2, I3, I4)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
    I4: Invariant<S>,
{
    fn check_all(before: &S, after: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        check::<S, I1>(before, after, &mut violations);
        check::<S, I2>(before, after, &mut violations);
        check::<S, I3>(before, after, &mut violations);
        check::<S, I4>(before, after, &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

pub mod frozen_when_finished;
pub mod monotonic_board;
pub mod monotonic_status;
pub mod outcome_exclusive;

pub use frozen_when_finished::FrozenWhenFinishedInvariant;
pub use monotonic_board::MonotonicBoardInvariant;
pub use monotonic_status::MonotonicStatusInvariant;
pub use outcome_exclusive::OutcomeExclusiveInvariant;

/// All snapshot transition invariants as a composable set.
pub type TransitionInvariants = (
    MonotonicStatusInvariant,
    MonotonicBoardInvariant,
    FrozenWhenFinishedInvariant,
    OutcomeExclusiveInvariant,
);
