//! Harrier Error types.

/// An error from the graph library or the fixpoint engine.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("Analysis error: {0}")]
    Analysis(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("Fixpoint iteration requires an entry to the control flow graph")]
    FixpointRequiresEntry,
    #[error("The edge with head {0} and tail {1} does not exist in the graph")]
    GraphEdgeNotFound(usize, usize),
    #[error("The vertex id {0} does not exist in the graph")]
    GraphVertexNotFound(usize),
    #[error("The successor edge from {0} to {1} is not mirrored by a predecessor edge")]
    InconsistentEdge(usize, usize),
}

impl From<&str> for Error {
    fn from(s: &str) -> Error {
        Error::Custom(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}
