//! DOM error types

use crate::NodeId;

/// Errors raised by tree mutation and registry operations
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} cannot contain children")]
    NotAContainer(NodeId),

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("node {0:?} cannot be inserted into its own subtree")]
    CyclicInsertion(NodeId),

    #[error("shadow root already attached to {0:?}")]
    ShadowAlreadyAttached(NodeId),

    #[error("invalid custom element name: {0}")]
    InvalidName(String),

    #[error("custom element already defined: {0}")]
    AlreadyDefined(String),

    #[error("setup failed: {0}")]
    Setup(#[from] SetupError),
}

/// Failure raised by a custom-element lifecycle callback or deferred task
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct SetupError(pub String);

impl SetupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
