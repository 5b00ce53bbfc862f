//! umbra DOM
//!
//! Memory-efficient arena tree with shadow roots, slots, and an explicit
//! custom-element lifecycle (no monkey-patched mutation primitives: all
//! lifecycle-firing mutations go through [`Document`]).

mod document;
mod error;
mod node;
mod registry;
mod tree;

pub use document::{Document, Task};
pub use error::{DomError, SetupError};
pub use node::{
    Attribute, ElementData, Node, NodeData, ShadowRootData, ShadowRootMode, TextData,
};
pub use registry::{
    ConnectedCallback, CustomElementDefinition, CustomElementRegistry, DisconnectedCallback,
};
pub use tree::DomTree;

/// Node identifier (index into the tree arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Arena index of this node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
