//! An implementation of an interval abstract domain.
//!
//! Values are intervals `[lower, upper]` over the integers extended with
//! infinities. The widening drops unstable bounds to the infinities, and the
//! narrowing pulls an infinite bound back to the refined side's bound while
//! keeping every finite bound it already has.

use serde::{Deserialize, Serialize};
use std::cmp;
use std::fmt;

use crate::analysis::domain::AbstractValue;

/// One end of an interval, either a value or infinite
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Bound {
    NegativeInfinity,
    Value(i64),
    PositiveInfinity,
}

impl Bound {
    /// Add two bounds, with the infinities absorbing. Finite addition
    /// saturates.
    pub fn add(&self, other: &Bound) -> Bound {
        match (self, other) {
            (Bound::Value(lhs), Bound::Value(rhs)) => Bound::Value(lhs.saturating_add(*rhs)),
            (Bound::NegativeInfinity, _) | (_, Bound::NegativeInfinity) => {
                Bound::NegativeInfinity
            }
            (_, _) => Bound::PositiveInfinity,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Bound::Value(_))
    }
}

/// An interval lattice value
#[derive(Clone, Deserialize, Eq, PartialEq, Serialize)]
pub enum Interval {
    Bottom,
    Range(Bound, Bound),
}

impl Interval {
    /// Create an `Interval` over the given bounds. An empty range collapses
    /// to `Bottom`.
    pub fn range(lower: Bound, upper: Bound) -> Interval {
        if lower > upper || lower == Bound::PositiveInfinity || upper == Bound::NegativeInfinity
        {
            Interval::Bottom
        } else {
            Interval::Range(lower, upper)
        }
    }

    /// Create an `Interval` holding exactly the given value.
    pub fn constant(value: i64) -> Interval {
        Interval::Range(Bound::Value(value), Bound::Value(value))
    }

    /// Create the `Interval` over all values.
    pub fn top() -> Interval {
        Interval::Range(Bound::NegativeInfinity, Bound::PositiveInfinity)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Interval::Bottom)
    }

    /// The lower bound, `None` for `Bottom`.
    pub fn lower(&self) -> Option<&Bound> {
        match self {
            Interval::Bottom => None,
            Interval::Range(lower, _) => Some(lower),
        }
    }

    /// The upper bound, `None` for `Bottom`.
    pub fn upper(&self) -> Option<&Bound> {
        match self {
            Interval::Bottom => None,
            Interval::Range(_, upper) => Some(upper),
        }
    }

    /// Join two intervals into their union hull.
    pub fn join(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Bottom, _) => other.clone(),
            (_, Interval::Bottom) => self.clone(),
            (Interval::Range(llower, lupper), Interval::Range(rlower, rupper)) => {
                Interval::Range(cmp::min(*llower, *rlower), cmp::max(*lupper, *rupper))
            }
        }
    }

    /// Intersect two intervals.
    pub fn meet(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Range(llower, lupper), Interval::Range(rlower, rupper)) => {
                Interval::range(cmp::max(*llower, *rlower), cmp::min(*lupper, *rupper))
            }
        }
    }

    /// Apply the widening operator between this interval and the given
    /// interval. A bound the other interval pushes past is dropped to its
    /// infinity.
    pub fn widen(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Bottom, _) => other.clone(),
            (_, Interval::Bottom) => self.clone(),
            (Interval::Range(llower, lupper), Interval::Range(rlower, rupper)) => {
                let lower = if rlower < llower {
                    Bound::NegativeInfinity
                } else {
                    *llower
                };
                let upper = if rupper > lupper {
                    Bound::PositiveInfinity
                } else {
                    *lupper
                };
                Interval::Range(lower, upper)
            }
        }
    }

    /// Apply the narrowing operator between this interval and the given
    /// interval, keeping this interval's finite bounds and taking the other
    /// side's where this interval is infinite.
    pub fn narrow(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Range(llower, lupper), Interval::Range(rlower, rupper)) => {
                let lower = if *llower == Bound::NegativeInfinity {
                    *rlower
                } else {
                    *llower
                };
                let upper = if *lupper == Bound::PositiveInfinity {
                    *rupper
                } else {
                    *lupper
                };
                Interval::range(lower, upper)
            }
        }
    }

    /// Add two intervals.
    pub fn add(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Range(llower, lupper), Interval::Range(rlower, rupper)) => {
                Interval::range(llower.add(rlower), lupper.add(rupper))
            }
        }
    }
}

impl AbstractValue for Interval {
    fn bottom() -> Interval {
        Interval::Bottom
    }

    fn leq(&self, other: &Interval) -> bool {
        match (self, other) {
            (Interval::Bottom, _) => true,
            (_, Interval::Bottom) => false,
            (Interval::Range(llower, lupper), Interval::Range(rlower, rupper)) => {
                rlower <= llower && lupper <= rupper
            }
        }
    }

    fn join_with(&mut self, other: Interval) {
        *self = self.join(&other);
    }

    fn widen_with(&mut self, other: Interval) {
        *self = self.widen(&other);
    }

    fn narrow_with(&mut self, other: Interval) {
        *self = self.narrow(&other);
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Bound::NegativeInfinity => write!(f, "-∞"),
            Bound::Value(value) => value.fmt(f),
            Bound::PositiveInfinity => write!(f, "∞"),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Interval::Bottom => write!(f, "⊥"),
            Interval::Range(lower, upper) => write!(f, "[{}, {}]", lower, upper),
        }
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(lower: i64, upper: i64) -> Interval {
        Interval::range(Bound::Value(lower), Bound::Value(upper))
    }

    #[test]
    fn test_range_normalizes_empty_to_bottom() {
        assert_eq!(range(5, 3), Interval::Bottom);
        assert_eq!(
            Interval::range(Bound::PositiveInfinity, Bound::PositiveInfinity),
            Interval::Bottom
        );
        assert_eq!(range(3, 3), Interval::constant(3));
    }

    #[test]
    fn test_leq() {
        assert!(Interval::Bottom.leq(&Interval::Bottom));
        assert!(Interval::Bottom.leq(&range(0, 0)));
        assert!(!range(0, 0).leq(&Interval::Bottom));
        assert!(range(1, 2).leq(&range(0, 3)));
        assert!(range(1, 2).leq(&range(1, 2)));
        assert!(!range(0, 3).leq(&range(1, 2)));
        assert!(range(1, 2).leq(&Interval::top()));
    }

    #[test]
    fn test_join_is_the_union_hull() {
        assert_eq!(range(0, 1).join(&range(4, 5)), range(0, 5));
        assert_eq!(range(0, 1).join(&Interval::Bottom), range(0, 1));
        assert_eq!(Interval::Bottom.join(&range(0, 1)), range(0, 1));
        assert_eq!(
            range(0, 1).join(&Interval::top()),
            Interval::top()
        );
    }

    #[test]
    fn test_meet() {
        assert_eq!(range(0, 5).meet(&range(3, 9)), range(3, 5));
        assert_eq!(range(0, 2).meet(&range(3, 9)), Interval::Bottom);
        assert_eq!(range(0, 5).meet(&Interval::Bottom), Interval::Bottom);
        assert_eq!(
            Interval::range(Bound::Value(0), Bound::PositiveInfinity)
                .meet(&Interval::range(Bound::NegativeInfinity, Bound::Value(9))),
            range(0, 9)
        );
    }

    #[test]
    fn test_widen_drops_unstable_bounds() {
        assert_eq!(
            range(0, 1).widen(&range(0, 2)),
            Interval::range(Bound::Value(0), Bound::PositiveInfinity)
        );
        assert_eq!(
            range(0, 1).widen(&range(-1, 1)),
            Interval::range(Bound::NegativeInfinity, Bound::Value(1))
        );
        // stable bounds survive
        assert_eq!(range(0, 9).widen(&range(0, 9)), range(0, 9));
        assert_eq!(range(0, 9).widen(&range(2, 7)), range(0, 9));
        // bottom is neutral
        assert_eq!(Interval::Bottom.widen(&range(0, 1)), range(0, 1));
        assert_eq!(range(0, 1).widen(&Interval::Bottom), range(0, 1));
    }

    #[test]
    fn test_narrow_recovers_infinite_bounds() {
        assert_eq!(
            Interval::range(Bound::Value(0), Bound::PositiveInfinity).narrow(&range(0, 10)),
            range(0, 10)
        );
        assert_eq!(
            Interval::top().narrow(&range(-5, 5)),
            range(-5, 5)
        );
        // finite bounds are kept
        assert_eq!(range(0, 10).narrow(&range(2, 8)), range(0, 10));
        assert_eq!(Interval::Bottom.narrow(&range(0, 1)), Interval::Bottom);
        assert_eq!(range(0, 1).narrow(&Interval::Bottom), Interval::Bottom);
    }

    #[test]
    fn test_add() {
        assert_eq!(range(1, 2).add(&range(10, 20)), range(11, 22));
        assert_eq!(
            Interval::range(Bound::Value(0), Bound::PositiveInfinity).add(&Interval::constant(1)),
            Interval::range(Bound::Value(1), Bound::PositiveInfinity)
        );
        assert_eq!(
            Interval::top().add(&Interval::constant(1)),
            Interval::top()
        );
        assert_eq!(range(1, 2).add(&Interval::Bottom), Interval::Bottom);
    }

    #[test]
    fn test_display() {
        assert_eq!(Interval::Bottom.to_string(), "⊥");
        assert_eq!(range(0, 9).to_string(), "[0, 9]");
        assert_eq!(Interval::top().to_string(), "[-∞, ∞]");
    }
}
