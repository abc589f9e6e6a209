//! Implements a directed graph, and a control flow graph on top of it.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::Error;

pub trait Vertex: Clone + Sync {
    // The index of this vertex.
    fn index(&self) -> usize;
    // A string to display in dot graphviz format.
    fn dot_label(&self) -> String;
    // Fill color in dot graphviz format.
    fn dot_fill_color(&self) -> String {
        "#ffddcc".to_string()
    }
    // Font color in dot graphviz format.
    fn dot_font_color(&self) -> String {
        "#000000".to_string()
    }
}

pub trait Edge: Clone + Sync {
    /// The index of the head vertex.
    fn head(&self) -> usize;
    /// The index of the tail vertex.
    fn tail(&self) -> usize;
    /// A string to display in dot graphviz format.
    fn dot_label(&self) -> String;
    // Style in dot graphviz format.
    fn dot_style(&self) -> String {
        "solid".to_string()
    }
}

/// An empty vertex for creating structures when data is not required
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct NullVertex {
    index: usize,
}

impl NullVertex {
    pub fn new(index: usize) -> NullVertex {
        NullVertex { index }
    }
}

impl Vertex for NullVertex {
    fn index(&self) -> usize {
        self.index
    }
    fn dot_label(&self) -> String {
        format!("{}", self.index)
    }
}

/// An empty edge for creating structures when data is not required
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct NullEdge {
    head: usize,
    tail: usize,
}

impl NullEdge {
    pub fn new(head: usize, tail: usize) -> NullEdge {
        NullEdge { head, tail }
    }
}

impl Edge for NullEdge {
    fn head(&self) -> usize {
        self.head
    }
    fn tail(&self) -> usize {
        self.tail
    }
    fn dot_label(&self) -> String {
        format!("{} -> {}", self.head, self.tail)
    }
}

/// A directed graph.
///
/// Vertices and edges are kept in `BTreeMap`s so that traversal order is
/// deterministic across runs.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Default)]
pub struct Graph<V: Vertex, E: Edge> {
    vertices: BTreeMap<usize, V>,
    edges: BTreeMap<(usize, usize), E>,
    successors: BTreeMap<usize, BTreeSet<usize>>,
    predecessors: BTreeMap<usize, BTreeSet<usize>>,
}

impl<V, E> Graph<V, E>
where
    V: Vertex,
    E: Edge,
{
    pub fn new() -> Graph<V, E> {
        Graph {
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            successors: BTreeMap::new(),
            predecessors: BTreeMap::new(),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if the vertex with the given index exists in this graph
    pub fn has_vertex(&self, index: usize) -> bool {
        self.vertices.contains_key(&index)
    }

    /// Returns true if the edge with the given head and tail index exists in this graph
    pub fn has_edge(&self, head: usize, tail: usize) -> bool {
        self.edges.contains_key(&(head, tail))
    }

    /// Inserts a vertex into the graph.
    /// # Errors
    /// Error if the vertex already exists by index.
    pub fn insert_vertex(&mut self, v: V) -> Result<(), Error> {
        if self.vertices.contains_key(&v.index()) {
            return Err("duplicate vertex index".into());
        }
        self.successors.insert(v.index(), BTreeSet::new());
        self.predecessors.insert(v.index(), BTreeSet::new());
        self.vertices.insert(v.index(), v);
        Ok(())
    }

    /// Inserts an edge into the graph.
    /// # Errors
    /// Error if the edge already exists by indices, or if either vertex is
    /// missing.
    pub fn insert_edge(&mut self, edge: E) -> Result<(), Error> {
        if self.edges.contains_key(&(edge.head(), edge.tail())) {
            return Err("duplicate edge".into());
        }
        if !self.vertices.contains_key(&edge.head()) {
            return Err(Error::GraphVertexNotFound(edge.head()));
        }
        if !self.vertices.contains_key(&edge.tail()) {
            return Err(Error::GraphVertexNotFound(edge.tail()));
        }

        self.successors
            .get_mut(&edge.head())
            .unwrap()
            .insert(edge.tail());
        self.predecessors
            .get_mut(&edge.tail())
            .unwrap()
            .insert(edge.head());
        self.edges.insert((edge.head(), edge.tail()), edge);

        Ok(())
    }

    /// Removes an edge
    pub fn remove_edge(&mut self, head: usize, tail: usize) -> Result<(), Error> {
        if self.edges.remove(&(head, tail)).is_none() {
            return Err(Error::GraphEdgeNotFound(head, tail));
        }

        self.successors.get_mut(&head).unwrap().remove(&tail);
        self.predecessors.get_mut(&tail).unwrap().remove(&head);

        Ok(())
    }

    /// Removes a vertex, and all edges associated with that vertex.
    pub fn remove_vertex(&mut self, index: usize) -> Result<(), Error> {
        if !self.has_vertex(index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        let mut edges: Vec<(usize, usize)> = Vec::new();
        for successor in &self.successors[&index] {
            edges.push((index, *successor));
        }
        for predecessor in &self.predecessors[&index] {
            // the self loop, if present, is already queued
            if *predecessor != index {
                edges.push((*predecessor, index));
            }
        }

        for (head, tail) in edges {
            self.remove_edge(head, tail)?;
        }

        self.vertices.remove(&index);
        self.successors.remove(&index);
        self.predecessors.remove(&index);

        Ok(())
    }

    /// Returns all immediate successors of a vertex from the graph.
    pub fn successors(&self, index: usize) -> Result<Vec<&V>, Error> {
        if !self.vertices.contains_key(&index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        Ok(self.successors[&index]
            .iter()
            .map(|successor| &self.vertices[successor])
            .collect())
    }

    /// Returns all immediate predecessors of a vertex from the graph.
    pub fn predecessors(&self, index: usize) -> Result<Vec<&V>, Error> {
        if !self.vertices.contains_key(&index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        Ok(self.predecessors[&index]
            .iter()
            .map(|predecessor| &self.vertices[predecessor])
            .collect())
    }

    /// Returns the indices of all immediate successors of a vertex from the graph.
    pub fn successor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        if !self.vertices.contains_key(&index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        Ok(self.successors[&index].iter().cloned().collect())
    }

    /// Returns the indices of all immediate predecessors of a vertex from the graph.
    pub fn predecessor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        if !self.vertices.contains_key(&index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        Ok(self.predecessors[&index].iter().cloned().collect())
    }

    /// Computes the set of vertices reachable from the given index.
    pub fn reachable_vertices(&self, index: usize) -> Result<FxHashSet<usize>, Error> {
        if !self.has_vertex(index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        let mut reachable_vertices: FxHashSet<usize> = FxHashSet::default();
        let mut queue: Vec<usize> = vec![index];

        reachable_vertices.insert(index);

        while let Some(vertex) = queue.pop() {
            for &successor in &self.successors[&vertex] {
                if reachable_vertices.insert(successor) {
                    queue.push(successor);
                }
            }
        }

        Ok(reachable_vertices)
    }

    /// Computes the set of vertices unreachable from the given index.
    pub fn unreachable_vertices(&self, index: usize) -> Result<FxHashSet<usize>, Error> {
        let reachable_vertices = self.reachable_vertices(index)?;
        Ok(self
            .vertices
            .keys()
            .filter(|index| !reachable_vertices.contains(index))
            .cloned()
            .collect())
    }

    /// Removes all vertices unreachable from the given index, and the edges
    /// touching them.
    pub fn remove_unreachable_vertices(&mut self, index: usize) -> Result<(), Error> {
        for vertex in self.unreachable_vertices(index)? {
            self.remove_vertex(vertex)?;
        }
        Ok(())
    }

    /// Returns all vertices in the graph.
    pub fn vertices(&self) -> Vec<&V> {
        self.vertices.values().collect()
    }

    pub fn vertices_mut(&mut self) -> Vec<&mut V> {
        self.vertices.values_mut().collect()
    }

    /// Fetches a vertex from the graph by index.
    pub fn vertex(&self, index: usize) -> Result<&V, Error> {
        self.vertices
            .get(&index)
            .ok_or(Error::GraphVertexNotFound(index))
    }

    // Fetches a mutable instance of a vertex.
    pub fn vertex_mut(&mut self, index: usize) -> Result<&mut V, Error> {
        self.vertices
            .get_mut(&index)
            .ok_or(Error::GraphVertexNotFound(index))
    }

    pub fn edge(&self, head: usize, tail: usize) -> Result<&E, Error> {
        self.edges
            .get(&(head, tail))
            .ok_or(Error::GraphEdgeNotFound(head, tail))
    }

    pub fn edge_mut(&mut self, head: usize, tail: usize) -> Result<&mut E, Error> {
        self.edges
            .get_mut(&(head, tail))
            .ok_or(Error::GraphEdgeNotFound(head, tail))
    }

    /// Get a reference to every `Edge` in the `Graph`.
    pub fn edges(&self) -> Vec<&E> {
        self.edges.values().collect()
    }

    /// Get a mutable reference to every `Edge` in the `Graph`.
    pub fn edges_mut(&mut self) -> Vec<&mut E> {
        self.edges.values_mut().collect()
    }

    /// Return all edges out of a vertex
    pub fn edges_out(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.successors
            .get(&index)
            .map(|succs| {
                succs
                    .iter()
                    .map(|succ| &self.edges[&(index, *succ)])
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Return all edges into a vertex
    pub fn edges_in(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.predecessors
            .get(&index)
            .map(|preds| {
                preds
                    .iter()
                    .map(|pred| &self.edges[&(*pred, index)])
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Returns a string in the graphviz format
    pub fn dot_graph(&self) -> String {
        let vertices = self
            .vertices
            .values()
            .map(|v| {
                let label = v.dot_label().replace('\n', "\\l");
                format!(
                    "{} [shape=\"box\", label=\"{}\", style=\"filled\", fillcolor=\"{}\", fontcolor=\"{}\"];",
                    v.index(),
                    label,
                    v.dot_fill_color(),
                    v.dot_font_color(),
                )
            })
            .collect::<Vec<String>>();

        let edges = self
            .edges
            .values()
            .map(|e| {
                let label = e.dot_label().replace('\n', "\\l");
                format!(
                    "{} -> {} [label=\"{}\", style=\"{}\"];",
                    e.head(),
                    e.tail(),
                    label,
                    e.dot_style()
                )
            })
            .collect::<Vec<String>>();

        let options = vec![
            "graph [fontname = \"Courier New\", splines=\"polyline\"]",
            "node [fontname = \"Courier New\"]",
            "edge [fontname = \"Courier New\"]",
        ];

        format!(
            "digraph G {{\n{}\n\n{}\n{}\n}}",
            options.join("\n"),
            vertices.join("\n"),
            edges.join("\n")
        )
    }
}

/// A directed `Graph` with an optional designated entry and exit.
///
/// The fixpoint iterator requires a single entry, so a `ControlFlowGraph`
/// without one is rejected when the weak topological ordering is built. The
/// exit is carried for symmetry and is not consumed by the analysis.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, Default)]
pub struct ControlFlowGraph<V: Vertex, E: Edge> {
    // The internal graph used to store the vertices and edges.
    graph: Graph<V, E>,
    // An optional entry index for the graph.
    entry: Option<usize>,
    // An optional exit index for the graph.
    exit: Option<usize>,
}

impl<V, E> ControlFlowGraph<V, E>
where
    V: Vertex,
    E: Edge,
{
    pub fn new() -> ControlFlowGraph<V, E> {
        ControlFlowGraph {
            graph: Graph::new(),
            entry: None,
            exit: None,
        }
    }

    /// Returns the underlying graph
    pub fn graph(&self) -> &Graph<V, E> {
        &self.graph
    }

    /// Returns a mutable reference to the underlying graph
    pub fn graph_mut(&mut self) -> &mut Graph<V, E> {
        &mut self.graph
    }

    /// Sets the entry point for this `ControlFlowGraph` to the given vertex index.
    pub fn set_entry(&mut self, entry: usize) -> Result<(), Error> {
        if self.graph.has_vertex(entry) {
            self.entry = Some(entry);
            return Ok(());
        }
        Err("Index does not exist for set_entry".into())
    }

    /// Sets the exit point for this `ControlFlowGraph` to the given vertex index.
    pub fn set_exit(&mut self, exit: usize) -> Result<(), Error> {
        if self.graph.has_vertex(exit) {
            self.exit = Some(exit);
            return Ok(());
        }
        Err("Index does not exist for set_exit".into())
    }

    /// Get the entry vertex index for this `ControlFlowGraph`.
    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    /// Get the exit vertex index for this `ControlFlowGraph`.
    pub fn exit(&self) -> Option<usize> {
        self.exit
    }

    /// Inserts a vertex into the graph.
    pub fn insert_vertex(&mut self, vertex: V) -> Result<(), Error> {
        self.graph.insert_vertex(vertex)
    }

    /// Inserts an edge into the graph.
    pub fn insert_edge(&mut self, edge: E) -> Result<(), Error> {
        self.graph.insert_edge(edge)
    }

    /// Get a vertex by index.
    pub fn vertex(&self, index: usize) -> Result<&V, Error> {
        self.graph.vertex(index)
    }

    /// Get an `Edge` by its head and tail vertex indices.
    pub fn edge(&self, head: usize, tail: usize) -> Result<&E, Error> {
        self.graph.edge(head, tail)
    }

    /// Get every incoming edge to a vertex.
    pub fn edges_in(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.graph.edges_in(index)
    }

    /// Get every outgoing edge from a vertex.
    pub fn edges_out(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.graph.edges_out(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Vertex for usize {
        fn index(&self) -> usize {
            *self
        }

        fn dot_label(&self) -> String {
            self.to_string()
        }
    }

    impl Edge for (usize, usize) {
        fn head(&self) -> usize {
            self.0
        }

        fn tail(&self) -> usize {
            self.1
        }

        fn dot_label(&self) -> String {
            format!("{} -> {}", self.0, self.1)
        }
    }

    /**
     *           +--> 3 +-+
     *          /          \
     *         | +--> 4 +--+
     *         |/          |
     *         +           v
     * 1 +---> 2 <-------+ 5
     *         +
     *         |
     *         v
     *         6
     */
    fn create_test_graph() -> Graph<usize, (usize, usize)> {
        let mut graph = Graph::new();

        graph.insert_vertex(1).unwrap();
        graph.insert_vertex(2).unwrap();
        graph.insert_vertex(3).unwrap();
        graph.insert_vertex(4).unwrap();
        graph.insert_vertex(5).unwrap();
        graph.insert_vertex(6).unwrap();

        graph.insert_edge((1, 2)).unwrap();
        graph.insert_edge((2, 3)).unwrap();
        graph.insert_edge((2, 4)).unwrap();
        graph.insert_edge((2, 6)).unwrap();
        graph.insert_edge((3, 5)).unwrap();
        graph.insert_edge((4, 5)).unwrap();
        graph.insert_edge((5, 2)).unwrap();

        graph
    }

    #[test]
    fn test_successors() {
        let graph = create_test_graph();

        assert_eq!(graph.successors(2).unwrap(), vec![&3, &4, &6]);

        let empty_vertex_list: Vec<&usize> = vec![];
        assert_eq!(graph.successors(6).unwrap(), empty_vertex_list);

        // vertex 7 does not exist
        assert!(graph.successors(7).is_err());
    }

    #[test]
    fn test_predecessors() {
        let graph = create_test_graph();

        let empty_vertex_list: Vec<&usize> = vec![];
        assert_eq!(graph.predecessors(1).unwrap(), empty_vertex_list);

        assert_eq!(graph.predecessors(2).unwrap(), vec![&1, &5]);

        // vertex 7 does not exist
        assert!(graph.successors(7).is_err());
    }

    #[test]
    fn test_successor_indices_are_deterministic() {
        let graph = create_test_graph();

        assert_eq!(graph.successor_indices(2).unwrap(), vec![3, 4, 6]);
        assert_eq!(graph.predecessor_indices(5).unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_reachable_vertices() {
        let mut graph = Graph::new();

        // reachable from 1
        graph.insert_vertex(1).unwrap();
        graph.insert_vertex(2).unwrap();
        graph.insert_edge((1, 2)).unwrap();

        // unreachable from 1
        graph.insert_vertex(3).unwrap();
        graph.insert_vertex(4).unwrap();
        graph.insert_vertex(5).unwrap();
        graph.insert_edge((4, 5)).unwrap();
        graph.insert_edge((4, 2)).unwrap();

        let reachable_vertices = graph.reachable_vertices(1).unwrap();

        assert_eq!(reachable_vertices.len(), 2);
        assert!(reachable_vertices.contains(&1));
        assert!(reachable_vertices.contains(&2));
    }

    #[test]
    fn test_unreachable_vertices() {
        let mut graph = Graph::new();

        // reachable from 1
        graph.insert_vertex(1).unwrap();
        graph.insert_vertex(2).unwrap();
        graph.insert_edge((1, 2)).unwrap();

        // unreachable from 1
        graph.insert_vertex(3).unwrap();
        graph.insert_vertex(4).unwrap();
        graph.insert_vertex(5).unwrap();
        graph.insert_edge((4, 5)).unwrap();
        graph.insert_edge((4, 2)).unwrap();

        let unreachable_vertices = graph.unreachable_vertices(1).unwrap();

        assert_eq!(unreachable_vertices.len(), 3);
        assert!(unreachable_vertices.contains(&3));
        assert!(unreachable_vertices.contains(&4));
        assert!(unreachable_vertices.contains(&5));
    }

    #[test]
    fn test_remove_unreachable_vertices() {
        let mut graph = Graph::new();

        // reachable
        graph.insert_vertex(1).unwrap();
        graph.insert_vertex(2).unwrap();
        graph.insert_edge((1, 2)).unwrap();

        // unreachable
        graph.insert_vertex(3).unwrap();
        graph.insert_vertex(4).unwrap();
        graph.insert_vertex(5).unwrap();
        graph.insert_edge((4, 5)).unwrap();
        graph.insert_edge((4, 2)).unwrap();

        graph.remove_unreachable_vertices(1).unwrap();

        assert_eq!(graph.num_vertices(), 2);
        assert!(graph.has_vertex(1));
        assert!(graph.has_vertex(2));
    }

    #[test]
    fn test_remove_vertex() {
        let mut graph = Graph::new();

        graph.insert_vertex(1).unwrap();
        graph.insert_vertex(2).unwrap();
        graph.insert_vertex(3).unwrap();

        graph.insert_edge((1, 2)).unwrap(); // ingoing
        graph.insert_edge((2, 3)).unwrap(); // outgoing
        graph.insert_edge((1, 3)).unwrap();

        graph.remove_vertex(2).unwrap();

        // should have removed vertex 2 and its ingoing/outgoing edges
        assert_eq!(vec![&1, &3], graph.vertices());
        assert_eq!(vec![&(1, 3)], graph.edges());
    }

    #[test]
    fn test_remove_vertex_with_self_loop() {
        let mut graph = Graph::new();

        graph.insert_vertex(1).unwrap();
        graph.insert_edge((1, 1)).unwrap(); // self loop

        graph.remove_vertex(1).unwrap();

        assert!(graph.vertices().is_empty());
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_control_flow_graph_entry_exit() {
        let mut cfg: ControlFlowGraph<NullVertex, NullEdge> = ControlFlowGraph::new();

        cfg.insert_vertex(NullVertex::new(0)).unwrap();
        cfg.insert_vertex(NullVertex::new(1)).unwrap();
        cfg.insert_edge(NullEdge::new(0, 1)).unwrap();

        assert_eq!(cfg.entry(), None);

        cfg.set_entry(0).unwrap();
        cfg.set_exit(1).unwrap();

        assert_eq!(cfg.entry(), Some(0));
        assert_eq!(cfg.exit(), Some(1));

        // a vertex that does not exist cannot become the entry
        assert!(cfg.set_entry(7).is_err());
    }
}
