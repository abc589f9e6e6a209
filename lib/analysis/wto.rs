//! A Weak Topological Ordering of a control flow graph.
//!
//! The ordering decomposes a rooted directed graph into a nested sequence of
//! components, each of which is either a single vertex or a cycle with a
//! distinguished head followed by a sub-ordering of the cycle's body. It is
//! computed with Bourdoncle's recursive strategy over depth-first numbers.
//!
//! For every vertex the ordering also yields its nesting, the chain of cycle
//! heads enclosing it from outermost to innermost. The fixpoint iterator
//! compares nestings to tell the predecessors that enter a cycle apart from
//! the predecessors that loop back within it.

use log::trace;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use crate::graph;
use crate::Error;

// Depth-first numbers used by the ordering construction. Vertices start out
// unnumbered and are parked at the maximum once their component is emitted.
const DFN_UNNUMBERED: usize = 0;
const DFN_COMPLETED: usize = usize::MAX;

/// The graph shape consumed by the ordering construction and the fixpoint
/// iterator.
///
/// Predecessor and successor sequences must be finite and restartable, and
/// should be deterministic so analysis results are reproducible.
pub trait FlowGraph {
    /// The entry vertex, if one is designated.
    fn entry(&self) -> Option<usize>;

    /// The immediate predecessors of a vertex.
    fn predecessors(&self, vertex: usize) -> Vec<usize>;

    /// The immediate successors of a vertex.
    fn successors(&self, vertex: usize) -> Vec<usize>;
}

impl<V, E> FlowGraph for graph::ControlFlowGraph<V, E>
where
    V: graph::Vertex,
    E: graph::Edge,
{
    fn entry(&self) -> Option<usize> {
        self.entry()
    }

    fn predecessors(&self, vertex: usize) -> Vec<usize> {
        self.graph().predecessor_indices(vertex).unwrap_or_default()
    }

    fn successors(&self, vertex: usize) -> Vec<usize> {
        self.graph().successor_indices(vertex).unwrap_or_default()
    }
}

/// A component of a weak topological ordering, either a single vertex or a
/// cycle.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum WtoComponent {
    Vertex(usize),
    Cycle(WtoCycle),
}

impl WtoComponent {
    /// Have the given visitor visit this component.
    pub fn accept<T: WtoVisitor>(&self, visitor: &mut T) -> Result<(), Error> {
        match self {
            WtoComponent::Vertex(vertex) => visitor.visit_vertex(*vertex),
            WtoComponent::Cycle(cycle) => visitor.visit_cycle(cycle),
        }
    }
}

/// A cycle of a weak topological ordering: a head vertex followed by the
/// ordering of the cycle's body.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WtoCycle {
    head: usize,
    components: Vec<WtoComponent>,
}

impl WtoCycle {
    /// The head of this cycle.
    pub fn head(&self) -> usize {
        self.head
    }

    /// The components of this cycle's body, in order. The head is not among
    /// them.
    pub fn components(&self) -> &[WtoComponent] {
        &self.components
    }
}

/// The chain of cycle heads enclosing a vertex, outermost first.
///
/// A cycle head is not part of its own nesting. Nestings are ordered by the
/// prefix relation: `a > b` when `b`'s chain is a strict prefix of `a`'s,
/// that is, when `a` is strictly more deeply nested. Chains that diverge are
/// unordered.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct WtoNesting {
    heads: Vec<usize>,
}

impl WtoNesting {
    pub fn new(heads: Vec<usize>) -> WtoNesting {
        WtoNesting { heads }
    }

    /// The enclosing cycle heads, outermost first.
    pub fn heads(&self) -> &[usize] {
        &self.heads
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }
}

impl PartialOrd for WtoNesting {
    fn partial_cmp(&self, other: &WtoNesting) -> Option<Ordering> {
        let common = std::cmp::min(self.heads.len(), other.heads.len());
        if self.heads[..common] != other.heads[..common] {
            return None;
        }
        Some(self.heads.len().cmp(&other.heads.len()))
    }
}

/// A visitor over the components of a weak topological ordering.
///
/// `visit_cycle` is handed the whole cycle and recurses over the body
/// itself, by calling [`WtoComponent::accept`] on each body component.
pub trait WtoVisitor {
    fn visit_vertex(&mut self, vertex: usize) -> Result<(), Error>;
    fn visit_cycle(&mut self, cycle: &WtoCycle) -> Result<(), Error>;
}

/// A weak topological ordering of the vertices reachable from a graph's
/// entry.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Wto {
    components: Vec<WtoComponent>,
    nesting: FxHashMap<usize, WtoNesting>,
    empty_nesting: WtoNesting,
}

impl Wto {
    /// Compute the weak topological ordering of the given graph.
    ///
    /// # Errors
    /// `FixpointRequiresEntry` if the graph has no entry.
    /// `InconsistentEdge` if a successor edge is not mirrored by a
    /// predecessor edge.
    pub fn new<G: FlowGraph>(graph: &G) -> Result<Wto, Error> {
        let entry = graph.entry().ok_or(Error::FixpointRequiresEntry)?;

        let mut builder = WtoBuilder {
            graph,
            dfn: FxHashMap::default(),
            stack: Vec::new(),
            num: 0,
        };

        let mut partition = VecDeque::new();
        builder.visit(entry, &mut partition)?;
        let components: Vec<WtoComponent> = partition.into();

        let mut nesting_builder = NestingBuilder {
            nesting: FxHashMap::default(),
            chain: Vec::new(),
        };
        for component in &components {
            component.accept(&mut nesting_builder)?;
        }

        let wto = Wto {
            components,
            nesting: nesting_builder.nesting,
            empty_nesting: WtoNesting::default(),
        };

        trace!("weak topological ordering: {}", wto);

        Ok(wto)
    }

    /// The root components of the ordering, in order.
    pub fn components(&self) -> &[WtoComponent] {
        &self.components
    }

    /// The nesting of the given vertex. Vertices unreachable from the entry
    /// have the empty nesting.
    pub fn nesting(&self, vertex: usize) -> &WtoNesting {
        self.nesting.get(&vertex).unwrap_or(&self.empty_nesting)
    }

    /// Have the given visitor visit every root component in order.
    pub fn accept<T: WtoVisitor>(&self, visitor: &mut T) -> Result<(), Error> {
        for component in &self.components {
            component.accept(visitor)?;
        }
        Ok(())
    }
}

impl fmt::Display for Wto {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut is_first = true;
        for component in &self.components {
            if !is_first {
                write!(f, " ")?;
            }
            write!(f, "{}", component)?;
            is_first = false;
        }
        Ok(())
    }
}

impl fmt::Display for WtoComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WtoComponent::Vertex(vertex) => write!(f, "{}", vertex),
            WtoComponent::Cycle(cycle) => write!(f, "{}", cycle),
        }
    }
}

impl fmt::Display for WtoCycle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}", self.head)?;
        for component in &self.components {
            write!(f, " {}", component)?;
        }
        write!(f, ")")
    }
}

// Bourdoncle's recursive strategy. Vertices are pushed on a stack as they
// are numbered; when a vertex turns out to be the least reachable number of
// a strongly connected subcomponent, the stack above it holds exactly that
// subcomponent, which becomes a cycle with the vertex as head. The body of
// the cycle is renumbered and partitioned recursively.
struct WtoBuilder<'g, G: FlowGraph> {
    graph: &'g G,
    dfn: FxHashMap<usize, usize>,
    stack: Vec<usize>,
    num: usize,
}

impl<'g, G: FlowGraph> WtoBuilder<'g, G> {
    fn dfn(&self, vertex: usize) -> usize {
        self.dfn.get(&vertex).cloned().unwrap_or(DFN_UNNUMBERED)
    }

    // Successors of a vertex, with each edge checked against the reverse
    // adjacency so a lying graph is caught here rather than looping the
    // driver forever.
    fn successors(&self, vertex: usize) -> Result<Vec<usize>, Error> {
        let successors = self.graph.successors(vertex);
        for &successor in &successors {
            if !self.graph.predecessors(successor).contains(&vertex) {
                return Err(Error::InconsistentEdge(vertex, successor));
            }
        }
        Ok(successors)
    }

    fn visit(
        &mut self,
        vertex: usize,
        partition: &mut VecDeque<WtoComponent>,
    ) -> Result<usize, Error> {
        self.stack.push(vertex);
        self.num += 1;
        self.dfn.insert(vertex, self.num);

        let mut head = self.num;
        let mut is_loop = false;

        for successor in self.successors(vertex)? {
            let min = if self.dfn(successor) == DFN_UNNUMBERED {
                self.visit(successor, partition)?
            } else {
                self.dfn(successor)
            };
            if min <= head {
                head = min;
                is_loop = true;
            }
        }

        if head == self.dfn(vertex) {
            self.dfn.insert(vertex, DFN_COMPLETED);
            let mut element = self.stack.pop().unwrap();
            if is_loop {
                while element != vertex {
                    self.dfn.insert(element, DFN_UNNUMBERED);
                    element = self.stack.pop().unwrap();
                }
                partition.push_front(WtoComponent::Cycle(self.component(vertex)?));
            } else {
                partition.push_front(WtoComponent::Vertex(vertex));
            }
        }

        Ok(head)
    }

    fn component(&mut self, head: usize) -> Result<WtoCycle, Error> {
        let mut partition = VecDeque::new();
        for successor in self.successors(head)? {
            if self.dfn(successor) == DFN_UNNUMBERED {
                self.visit(successor, &mut partition)?;
            }
        }
        Ok(WtoCycle {
            head,
            components: partition.into(),
        })
    }
}

// Walks the component tree accumulating the chain of enclosing cycle heads.
// A head records the chain as it stood on entry to its cycle, so a head is
// never part of its own nesting.
struct NestingBuilder {
    nesting: FxHashMap<usize, WtoNesting>,
    chain: Vec<usize>,
}

impl WtoVisitor for NestingBuilder {
    fn visit_vertex(&mut self, vertex: usize) -> Result<(), Error> {
        self.nesting.insert(vertex, WtoNesting::new(self.chain.clone()));
        Ok(())
    }

    fn visit_cycle(&mut self, cycle: &WtoCycle) -> Result<(), Error> {
        self.nesting
            .insert(cycle.head(), WtoNesting::new(self.chain.clone()));
        self.chain.push(cycle.head());
        for component in cycle.components() {
            component.accept(self)?;
        }
        self.chain.pop();
        Ok(())
    }
}
