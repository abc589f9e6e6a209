//! The abstract value trait the fixpoint iterator is parameterized over.

use std::fmt::Debug;

/// An element of a bounded lattice, with the operators required by
/// interleaved fixpoint iteration.
///
/// The binary operators mutate the receiver in place, `a.join_with(b)`
/// computing `a := a ⊔ b`. Implementations must satisfy the usual lattice
/// laws: `bottom` is the least element and the identity of `join`, `widen`
/// is an upper bound with finite ascending chains, and `narrow` returns a
/// value between its arguments with finite descending chains.
pub trait AbstractValue: Clone + Debug + PartialEq {
    /// Return the least element of the lattice.
    fn bottom() -> Self;

    /// Partial order test, true if `self ⊑ other`.
    fn leq(&self, other: &Self) -> bool;

    /// Join this abstract value with another, in place.
    fn join_with(&mut self, other: Self);

    /// The join applied at a cycle head when combining the incoming and
    /// back-edge contributions. Lookahead widening variants hook in here.
    fn join_loop_with(&mut self, other: Self) {
        self.join_with(other);
    }

    /// The join applied by the first increasing iteration of a cycle,
    /// before the widening kicks in.
    fn join_iter_with(&mut self, other: Self) {
        self.join_with(other);
    }

    /// Apply the widening operator, in place.
    fn widen_with(&mut self, other: Self);

    /// Apply the narrowing operator, in place.
    fn narrow_with(&mut self, other: Self);
}
