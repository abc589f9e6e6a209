//! The fixpoint iterator, and the traits it is parameterized over.

pub mod domain;
pub mod fixpoint;
pub mod interval;
pub mod wto;

pub use self::domain::AbstractValue;
pub use self::fixpoint::{
    interleaved_fixpoint_forward, FixpointAnalysis, FlowGraph, InterleavedFixpointIterator,
};
pub use self::interval::{Bound, Interval};
pub use self::wto::{Wto, WtoComponent, WtoCycle, WtoNesting, WtoVisitor};
