//! Document - host environment for rendering
//!
//! Owns the tree, the custom-element registry, a deferred task queue, and
//! the connection side table. Lifecycle-firing mutations (`append_child`,
//! `remove_child`) live here; raw structural edits stay on [`DomTree`].
//!
//! Connection flags are a side table keyed by node id, never stored on the
//! nodes themselves.

use std::collections::HashSet;

use crate::{
    CustomElementDefinition, CustomElementRegistry, DomError, DomTree, NodeId, SetupError,
    ShadowRootMode,
};

/// Deferred setup task, the server-side stand-in for work a component would
/// schedule after connection (a resolved-promise callback, a macrotask).
pub type Task = Box<dyn FnOnce(&mut Document) -> Result<(), SetupError>>;

/// Host document environment
pub struct Document {
    pub tree: DomTree,
    registry: CustomElementRegistry,
    tasks: Vec<Task>,
    connected: HashSet<NodeId>,
    document: NodeId,
    html: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Document {
    /// Create a document with the html/head/body skeleton
    pub fn new() -> Self {
        let mut tree = DomTree::new();
        let document = tree.create_document();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // skeleton wiring cannot fail on a fresh tree
        let _ = tree.append_child(document, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            registry: CustomElementRegistry::new(),
            tasks: Vec::new(),
            connected: HashSet::new(),
            document,
            html,
            head,
            body,
        }
    }

    /// Document root node
    pub fn document_node(&self) -> NodeId {
        self.document
    }

    /// `<html>` element
    pub fn document_element(&self) -> NodeId {
        self.html
    }

    /// `<head>` element
    pub fn head(&self) -> NodeId {
        self.head
    }

    /// `<body>` element
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Define a custom element
    pub fn define(&mut self, definition: CustomElementDefinition) -> Result<(), DomError> {
        self.registry.define(definition)
    }

    /// Access the registry
    pub fn registry(&self) -> &CustomElementRegistry {
        &self.registry
    }

    /// Create an element node
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.tree.create_element(name)
    }

    /// Create a text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.tree.create_text(content)
    }

    /// Attach a shadow root to a host element (no lifecycle involved)
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId, DomError> {
        self.tree.attach_shadow(host, ShadowRootMode::Open)
    }

    /// Append a child and fire connected callbacks over the inserted subtree
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.tree.append_child(parent, child)?;
        self.connect_subtree(child)?;
        Ok(())
    }

    /// Insert before a reference child, firing connected callbacks
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        ref_child: NodeId,
    ) -> Result<(), DomError> {
        self.tree.insert_before(parent, child, ref_child)?;
        self.connect_subtree(child)?;
        Ok(())
    }

    /// Remove a child and fire disconnected callbacks over the subtree
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.tree.remove_child(parent, child)?;
        self.disconnect_subtree(child);
        Ok(())
    }

    /// Schedule a deferred setup task
    pub fn schedule(&mut self, task: impl FnOnce(&mut Document) -> Result<(), SetupError> + 'static) {
        self.tasks.push(Box::new(task));
    }

    /// Whether deferred tasks are pending
    pub fn has_pending_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Drain the deferred task queue until it stays empty.
    ///
    /// Tasks may schedule further tasks; those run in the same drain.
    pub fn run_tasks(&mut self) -> Result<(), SetupError> {
        while !self.tasks.is_empty() {
            let batch = std::mem::take(&mut self.tasks);
            tracing::debug!("running {} deferred setup task(s)", batch.len());
            for task in batch {
                task(self)?;
            }
        }
        Ok(())
    }

    /// Whether a node has been connected (and not disconnected since)
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.connected.contains(&id)
    }

    /// Fire connected callbacks over a subtree, exactly once per connection.
    ///
    /// Descends into light children and attached shadow subtrees; children
    /// added by a callback are picked up by the same pass.
    pub fn connect_subtree(&mut self, id: NodeId) -> Result<(), SetupError> {
        self.connect_node(id)?;
        let mut i = 0;
        loop {
            let Some(&child) = self.tree.children(id).get(i) else {
                break;
            };
            self.connect_subtree(child)?;
            i += 1;
        }
        if let Some(root) = self.tree.shadow_root(id) {
            self.connect_subtree(root)?;
        }
        Ok(())
    }

    fn connect_node(&mut self, id: NodeId) -> Result<(), SetupError> {
        let Some(tag) = self.tree.tag_name(id).map(str::to_owned) else {
            return Ok(());
        };
        if !self.connected.insert(id) {
            return Ok(());
        }
        let Some(callback) = self.registry.get(&tag).and_then(|d| d.connected.clone()) else {
            return Ok(());
        };
        tracing::debug!(tag = %tag, node = ?id, "connected");
        callback(self, id)
    }

    /// Fire disconnected callbacks over a subtree and clear connection flags
    pub fn disconnect_subtree(&mut self, id: NodeId) {
        self.disconnect_node(id);
        let mut i = 0;
        loop {
            let Some(&child) = self.tree.children(id).get(i) else {
                break;
            };
            self.disconnect_subtree(child);
            i += 1;
        }
        if let Some(root) = self.tree.shadow_root(id) {
            self.disconnect_subtree(root);
        }
    }

    fn disconnect_node(&mut self, id: NodeId) {
        let Some(tag) = self.tree.tag_name(id).map(str::to_owned) else {
            return;
        };
        if !self.connected.remove(&id) {
            return;
        }
        let Some(callback) = self.registry.get(&tag).and_then(|d| d.disconnected.clone()) else {
            return;
        };
        tracing::debug!(tag = %tag, node = ?id, "disconnected");
        callback(self, id);
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
