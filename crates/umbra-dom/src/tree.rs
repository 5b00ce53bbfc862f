//! DOM Tree (arena-based allocation)
//!
//! All structural mutation lives here. Lifecycle callbacks are *not* fired
//! by these primitives; [`crate::Document`] layers them on explicitly.

use crate::{DomError, ElementData, Node, NodeData, NodeId, ShadowRootData, ShadowRootMode, TextData};

/// Arena-based DOM tree
#[derive(Debug, Default)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new empty DOM tree
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Create a document node
    pub fn create_document(&mut self) -> NodeId {
        self.alloc(NodeData::Document)
    }

    /// Create an element node (tag name is lowercased)
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(name)))
    }

    /// Create a text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(NodeData::Text(TextData {
            content: content.to_string(),
        }))
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ordered children of a node (empty slice for unknown ids)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children()).unwrap_or(&[])
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Tag name if the node is an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.name.as_str())
    }

    /// Attribute value if the node is an element carrying it
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.attr(name)
    }

    /// Set an attribute on an element
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.get_mut(id)
            .ok_or(DomError::UnknownNode(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?
            .set_attr(name, value);
        Ok(())
    }

    /// Remove an attribute from an element
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<bool, DomError> {
        Ok(self
            .get_mut(id)
            .ok_or(DomError::UnknownNode(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?
            .remove_attr(name))
    }

    fn ensure_container(&self, id: NodeId) -> Result<(), DomError> {
        match &self.get(id).ok_or(DomError::UnknownNode(id))?.data {
            NodeData::Text(_) => Err(DomError::NotAContainer(id)),
            _ => Ok(()),
        }
    }

    fn ensure_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.ensure_container(parent)?;
        if self.get(child).is_none() {
            return Err(DomError::UnknownNode(child));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(DomError::CyclicInsertion(child));
        }
        Ok(())
    }

    /// Append a child, detaching it from any previous parent first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.ensure_insertable(parent, child)?;
        self.detach(child);
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Insert a child before a reference child
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        ref_child: NodeId,
    ) -> Result<(), DomError> {
        self.ensure_insertable(parent, child)?;
        if self.parent(ref_child) != Some(parent) {
            return Err(DomError::NotAChild {
                parent,
                child: ref_child,
            });
        }
        self.detach(child);
        // index computed after detach: child may have been an earlier sibling
        let idx = self.nodes[parent.index()]
            .children
            .iter()
            .position(|&c| c == ref_child)
            .ok_or(DomError::NotAChild {
                parent,
                child: ref_child,
            })?;
        self.nodes[parent.index()].children.insert(idx, child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Remove a child from its parent
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Detach a node from its parent, if any
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.nodes[parent.index()].children.retain(|&c| c != id);
        self.nodes[id.index()].parent = None;
    }

    /// Attach a shadow root to a host element
    ///
    /// The root is not part of the host's child list; it holds a back
    /// reference to the host and owns the encapsulated subtree.
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> Result<NodeId, DomError> {
        let element = self
            .get(host)
            .ok_or(DomError::UnknownNode(host))?
            .as_element()
            .ok_or(DomError::NotAnElement(host))?;
        if element.shadow_root.is_some() {
            return Err(DomError::ShadowAlreadyAttached(host));
        }
        let root = self.alloc(NodeData::ShadowRoot(ShadowRootData { host, mode }));
        if let Some(e) = self.nodes[host.index()].as_element_mut() {
            e.shadow_root = Some(root);
        }
        Ok(root)
    }

    /// Shadow root owned by an element, if any
    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.as_element()?.shadow_root
    }

    /// Host element of a shadow root node
    pub fn host(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.as_shadow_root().map(|s| s.host)
    }

    /// Flattened text content: concatenation of all descendant text
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        if let Some(text) = node.as_text() {
            out.push_str(text);
        }
        for &child in node.children() {
            self.collect_text(child, out);
        }
    }

    /// Whether `ancestor` contains `node` via parent links.
    ///
    /// Does not cross shadow boundaries (a shadow root has no parent; it is
    /// reachable from its host only through the host back-reference).
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self.parent(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// Collect elements with the given tag name, pre-order, light tree only
    pub fn find_elements(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.find_elements_into(root, tag, &mut found);
        found
    }

    fn find_elements_into(&self, id: NodeId, tag: &str, found: &mut Vec<NodeId>) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.as_element().is_some_and(|e| e.name == tag) {
            found.push(id);
        }
        for &child in node.children() {
            self.find_elements_into(child, tag, found);
        }
    }

    /// Pre-order walk over the light tree
    pub fn walk(&self, id: NodeId, call: &mut impl FnMut(NodeId)) {
        if self.get(id).is_none() {
            return;
        }
        call(id);
        let mut i = 0;
        while let Some(&child) = self.children(id).get(i) {
            self.walk(child, call);
            i += 1;
        }
    }
}
