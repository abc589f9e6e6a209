//! Harrier: An Abstract Interpretation Fixpoint Engine in Rust.
//!
//! Harrier computes per-node pre- and post-invariants over a control flow
//! graph by interleaved forward fixpoint iteration. The graph is decomposed
//! into a Weak Topological Ordering following Bourdoncle's recursive
//! strategy, and every cycle of the ordering is stabilized with a widening
//! phase followed immediately by a localized narrowing phase, as described
//! by Amato and Scozzari. A quick synopsis of Harrier's modules:
//!
//! * **analysis** - The fixpoint iterator, the weak topological ordering,
//! the abstract value trait, and an example interval domain.
//! * **graph** - A simple directed graph library, including a control flow
//! graph with a designated entry.
//!
//! Clients provide a graph, an abstract domain, and transfer functions for
//! nodes and edges, and read back the stabilized invariants:
//!
//! ```
//! use harrier::analysis::{FixpointAnalysis, Interval, InterleavedFixpointIterator};
//! use harrier::graph::{ControlFlowGraph, NullEdge, NullVertex};
//! use harrier::Error;
//!
//! struct Counter;
//!
//! impl FixpointAnalysis<Interval> for Counter {
//!     fn analyze_node(&mut self, _node: usize, state: Interval) -> Result<Interval, Error> {
//!         Ok(state.add(&Interval::constant(1)))
//!     }
//!
//!     fn analyze_edge(
//!         &mut self,
//!         _head: usize,
//!         _tail: usize,
//!         state: &Interval,
//!     ) -> Result<Interval, Error> {
//!         Ok(state.clone())
//!     }
//! }
//!
//! # fn example() -> Result<(), Error> {
//! let mut cfg: ControlFlowGraph<NullVertex, NullEdge> = ControlFlowGraph::new();
//! for index in 0..3 {
//!     cfg.insert_vertex(NullVertex::new(index))?;
//! }
//! cfg.insert_edge(NullEdge::new(0, 1))?;
//! cfg.insert_edge(NullEdge::new(1, 2))?;
//! cfg.set_entry(0)?;
//!
//! let mut iterator = InterleavedFixpointIterator::new(&cfg, Counter)?;
//! iterator.run(Interval::constant(0))?;
//! assert_eq!(*iterator.post(2), Interval::constant(3));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod analysis;
pub mod error;
pub mod graph;

#[cfg(not(feature = "thread_safe"))]
use std::rc::Rc;
#[allow(clippy::upper_case_acronyms)]
#[cfg(not(feature = "thread_safe"))]
pub type RC<T> = Rc<T>;

#[cfg(feature = "thread_safe")]
use std::sync::Arc;
#[allow(clippy::upper_case_acronyms)]
#[cfg(feature = "thread_safe")]
pub type RC<T> = Arc<T>;

pub use error::Error;
