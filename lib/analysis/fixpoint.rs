//! An interleaved forward fixpoint iterator over abstract domains.
//!
//! The iterator walks a weak topological ordering of the control flow graph
//! and computes a pre- and a post-invariant for every vertex. Acyclic parts
//! of the graph are handled in a single pass. Each cycle is stabilized by an
//! increasing phase, which extrapolates with the domain's widening until the
//! iterates stop growing, followed immediately by a decreasing phase, which
//! refines with the domain's narrowing until no refinement is possible. The
//! per-cycle interleaving of the two phases follows Amato and Scozzari's
//! localized narrowing strategy.

use log::trace;
use rustc_hash::FxHashMap;

use crate::analysis::domain::AbstractValue;
use crate::analysis::wto::{Wto, WtoCycle, WtoVisitor};
use crate::{Error, RC};

pub use crate::analysis::wto::FlowGraph;

/// A client analysis: the transfer functions of the abstract domain over a
/// graph, the sinks receiving the stabilized invariants, and optional hooks
/// into the cycle stabilization strategy.
///
/// The callbacks must not re-enter the iterator they are installed in; the
/// invariant tables belong to the iterator while `run` executes.
pub trait FixpointAnalysis<V: AbstractValue> {
    /// The transfer function at a vertex, computing the state after the
    /// vertex from the state before it.
    fn analyze_node(&mut self, vertex: usize, state: V) -> Result<V, Error>;

    /// The edge abstraction, refining the source's post state as it flows
    /// across the edge. Conditional guards hook in here.
    fn analyze_edge(&mut self, head: usize, tail: usize, state: &V) -> Result<V, Error>;

    /// Receives the final pre invariant of every vertex, in the order of
    /// the weak topological ordering.
    fn process_pre(&mut self, _vertex: usize, _state: &V) -> Result<(), Error> {
        Ok(())
    }

    /// Receives the final post invariant of every vertex, in the order of
    /// the weak topological ordering.
    fn process_post(&mut self, _vertex: usize, _state: &V) -> Result<(), Error> {
        Ok(())
    }

    /// Extrapolate the next iterate of a cycle head during the increasing
    /// phase. The default joins on the first iteration and widens on every
    /// later one; overriding allows delayed widening, widening with
    /// thresholds, or an iteration cap.
    fn extrapolate(
        &mut self,
        _head: usize,
        iteration: usize,
        mut before: V,
        after: V,
    ) -> Result<V, Error> {
        if iteration <= 1 {
            before.join_iter_with(after);
        } else {
            before.widen_with(after);
        }
        Ok(before)
    }

    /// Refine the next iterate of a cycle head during the decreasing phase.
    /// The default narrows.
    fn refine(
        &mut self,
        _head: usize,
        _iteration: usize,
        mut before: V,
        after: V,
    ) -> Result<V, Error> {
        before.narrow_with(after);
        Ok(before)
    }

    /// Whether the increasing phase of a cycle has stabilized.
    fn is_increasing_fixpoint(&mut self, before: &V, after: &V) -> bool {
        after.leq(before)
    }

    /// Whether the decreasing phase of a cycle has stabilized.
    fn is_decreasing_fixpoint(&mut self, before: &V, after: &V) -> bool {
        before.leq(after)
    }
}

enum IterationKind {
    Increasing,
    Decreasing,
}

/// An interleaved forward fixpoint iterator.
///
/// The iterator owns the weak topological ordering of one graph and the two
/// invariant tables. `run` seeds the entry with an initial value, drives the
/// iteration to a fixpoint, and hands the results to the analysis sinks;
/// afterwards the invariants stay readable through [`pre`](Self::pre) and
/// [`post`](Self::post) until [`clear`](Self::clear) or the next `run`.
pub struct InterleavedFixpointIterator<'g, G, V, A>
where
    G: FlowGraph,
    V: AbstractValue,
    A: FixpointAnalysis<V>,
{
    graph: &'g G,
    wto: RC<Wto>,
    analysis: A,
    pre: FxHashMap<usize, V>,
    post: FxHashMap<usize, V>,
    bottom: V,
    init: V,
    entry: usize,
}

impl<'g, G, V, A> InterleavedFixpointIterator<'g, G, V, A>
where
    G: FlowGraph,
    V: AbstractValue,
    A: FixpointAnalysis<V>,
{
    /// Create an interleaved fixpoint iterator over the given graph. The
    /// weak topological ordering is built eagerly, so a malformed graph is
    /// rejected here.
    pub fn new(graph: &'g G, analysis: A) -> Result<Self, Error> {
        let entry = graph.entry().ok_or(Error::FixpointRequiresEntry)?;
        let wto = RC::new(Wto::new(graph)?);

        Ok(InterleavedFixpointIterator {
            graph,
            wto,
            analysis,
            pre: FxHashMap::default(),
            post: FxHashMap::default(),
            bottom: V::bottom(),
            init: V::bottom(),
            entry,
        })
    }

    /// Get the graph this iterator runs over.
    pub fn graph(&self) -> &'g G {
        self.graph
    }

    /// Get the weak topological ordering of the graph.
    pub fn wto(&self) -> &Wto {
        &self.wto
    }

    /// Get the installed analysis.
    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Get a mutable reference to the installed analysis.
    pub fn analysis_mut(&mut self) -> &mut A {
        &mut self.analysis
    }

    /// Consume the iterator and return the installed analysis.
    pub fn into_analysis(self) -> A {
        self.analysis
    }

    fn get<'t>(table: &'t FxHashMap<usize, V>, bottom: &'t V, vertex: usize) -> &'t V {
        table.get(&vertex).unwrap_or(bottom)
    }

    /// Get the pre invariant for the given vertex. Vertices never reached
    /// by the iteration are bottom.
    pub fn pre(&self, vertex: usize) -> &V {
        Self::get(&self.pre, &self.bottom, vertex)
    }

    /// Get the post invariant for the given vertex. Vertices never reached
    /// by the iteration are bottom.
    pub fn post(&self, vertex: usize) -> &V {
        Self::get(&self.post, &self.bottom, vertex)
    }

    /// Discard the computed invariants. The weak topological ordering is
    /// retained, so the iterator can be run again.
    pub fn clear(&mut self) {
        self.pre = FxHashMap::default();
        self.post = FxHashMap::default();
        self.init = V::bottom();
    }

    /// Compute the fixpoint with the given initial abstract value at the
    /// entry, then hand every invariant to the analysis sinks in the order
    /// of the weak topological ordering.
    pub fn run(&mut self, init: V) -> Result<(), Error> {
        self.pre.insert(self.entry, init.clone());
        self.init = init;

        let wto = RC::clone(&self.wto);
        wto.accept(self)?;

        let mut processor = WtoProcessor {
            analysis: &mut self.analysis,
            pre: &self.pre,
            post: &self.post,
            bottom: &self.bottom,
        };
        wto.accept(&mut processor)?;

        Ok(())
    }

    // Join the contributions of the head's predecessors on one side of the
    // cycle boundary into `state`. A predecessor strictly more deeply
    // nested than the head is inside the cycle, so its edge is a back edge;
    // every other predecessor is incoming.
    fn join_predecessors(
        &mut self,
        wto: &Wto,
        head: usize,
        back_edges: bool,
        mut state: V,
    ) -> Result<V, Error> {
        let head_nesting = wto.nesting(head);

        for predecessor in self.graph.predecessors(head) {
            if (wto.nesting(predecessor) > head_nesting) == back_edges {
                let edge_state = self.analysis.analyze_edge(
                    predecessor,
                    head,
                    Self::get(&self.post, &self.bottom, predecessor),
                )?;
                state.join_with(edge_state);
            }
        }

        Ok(state)
    }
}

impl<'g, G, V, A> WtoVisitor for InterleavedFixpointIterator<'g, G, V, A>
where
    G: FlowGraph,
    V: AbstractValue,
    A: FixpointAnalysis<V>,
{
    fn visit_vertex(&mut self, vertex: usize) -> Result<(), Error> {
        // The entry keeps its caller-seeded initial value; everything else
        // starts from bottom and accumulates its predecessors.
        let mut state = if vertex == self.entry {
            Self::get(&self.pre, &self.bottom, vertex).clone()
        } else {
            V::bottom()
        };

        for predecessor in self.graph.predecessors(vertex) {
            let edge_state = self.analysis.analyze_edge(
                predecessor,
                vertex,
                Self::get(&self.post, &self.bottom, predecessor),
            )?;
            state.join_with(edge_state);
        }

        let post_state = self.analysis.analyze_node(vertex, state.clone())?;
        self.pre.insert(vertex, state);
        self.post.insert(vertex, post_state);

        Ok(())
    }

    fn visit_cycle(&mut self, cycle: &WtoCycle) -> Result<(), Error> {
        let head = cycle.head();
        let wto = RC::clone(&self.wto);

        // When the entry is the head of a cycle its initial value must
        // survive every recomputation of the incoming join, or narrowing
        // could strip the caller's seed.
        let seed = if head == self.entry {
            self.init.clone()
        } else {
            V::bottom()
        };

        let mut state = self.join_predecessors(&wto, head, false, seed.clone())?;

        let mut kind = IterationKind::Increasing;
        let mut iteration: usize = 1;

        loop {
            self.pre.insert(head, state.clone());
            let post_state = self.analysis.analyze_node(head, state.clone())?;
            self.post.insert(head, post_state);

            for component in cycle.components() {
                component.accept(self)?;
            }

            // The body visit rewrote the posts of the back edge
            // predecessors, so both partitions re-read post here.
            let incoming = self.join_predecessors(&wto, head, false, seed.clone())?;
            let back = self.join_predecessors(&wto, head, true, V::bottom())?;
            let mut new_state = incoming;
            new_state.join_loop_with(back);

            if let IterationKind::Increasing = kind {
                if self.analysis.is_increasing_fixpoint(&state, &new_state) {
                    // Reuse this iterate as the first decreasing candidate
                    // rather than looping once more.
                    trace!(
                        "cycle {}: increasing fixpoint after {} iterations",
                        head,
                        iteration
                    );
                    kind = IterationKind::Decreasing;
                    iteration = 1;
                } else {
                    state = self
                        .analysis
                        .extrapolate(head, iteration, state, new_state)?;
                    iteration += 1;
                    continue;
                }
            }

            let new_state = self
                .analysis
                .refine(head, iteration, state.clone(), new_state)?;
            if self.analysis.is_decreasing_fixpoint(&state, &new_state) {
                trace!(
                    "cycle {}: decreasing fixpoint after {} iterations",
                    head,
                    iteration
                );
                self.pre.insert(head, new_state);
                return Ok(());
            }
            state = new_state;
            iteration += 1;
        }
    }
}

// The second traversal: deliver the stabilized invariants to the analysis
// sinks in the order of the weak topological ordering.
struct WtoProcessor<'i, V, A>
where
    V: AbstractValue,
    A: FixpointAnalysis<V>,
{
    analysis: &'i mut A,
    pre: &'i FxHashMap<usize, V>,
    post: &'i FxHashMap<usize, V>,
    bottom: &'i V,
}

impl<'i, V, A> WtoProcessor<'i, V, A>
where
    V: AbstractValue,
    A: FixpointAnalysis<V>,
{
    fn process(&mut self, vertex: usize) -> Result<(), Error> {
        self.analysis
            .process_pre(vertex, self.pre.get(&vertex).unwrap_or(self.bottom))?;
        self.analysis
            .process_post(vertex, self.post.get(&vertex).unwrap_or(self.bottom))
    }
}

impl<'i, V, A> WtoVisitor for WtoProcessor<'i, V, A>
where
    V: AbstractValue,
    A: FixpointAnalysis<V>,
{
    fn visit_vertex(&mut self, vertex: usize) -> Result<(), Error> {
        self.process(vertex)
    }

    fn visit_cycle(&mut self, cycle: &WtoCycle) -> Result<(), Error> {
        self.process(cycle.head())?;
        for component in cycle.components() {
            component.accept(self)?;
        }
        Ok(())
    }
}

/// Run an interleaved forward fixpoint analysis over the given graph with
/// the given initial value, and return the converged iterator.
pub fn interleaved_fixpoint_forward<'g, G, V, A>(
    analysis: A,
    graph: &'g G,
    init: V,
) -> Result<InterleavedFixpointIterator<'g, G, V, A>, Error>
where
    G: FlowGraph,
    V: AbstractValue,
    A: FixpointAnalysis<V>,
{
    let mut iterator = InterleavedFixpointIterator::new(graph, analysis)?;
    iterator.run(init)?;
    Ok(iterator)
}
