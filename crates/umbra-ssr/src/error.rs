//! Render error taxonomy
//!
//! Fatal categories surface through [`RenderError`]; recoverable ones
//! (malformed projection, ambiguous style text) degrade output quality and
//! are logged instead.

use umbra_dom::{DomError, NodeId, SetupError};

/// Fatal render failure
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Serializer reached a node id not present in the tree
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// A document node appeared below the render root
    #[error("document node {0:?} encountered inside the tree")]
    UnexpectedDocument(NodeId),

    /// A lifecycle callback or deferred task failed during setup
    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),

    /// Structural mutation failed
    #[error(transparent)]
    Dom(#[from] DomError),
}
