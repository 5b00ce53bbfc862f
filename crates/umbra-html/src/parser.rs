//! HTML5 Parser implementation
//!
//! Uses html5ever's built-in RcDom and converts to the umbra-dom arena.
//! This is simpler and more reliable than implementing TreeSink directly.
//!
//! Fragments are parsed in document mode: html5ever synthesizes the
//! html/head/body skeleton around bare content, which matches what a
//! browser does to a served page.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use umbra_dom::{DomTree, NodeId};

/// Parsed document: the arena plus the located skeleton nodes
#[derive(Debug)]
pub struct ParsedDocument {
    pub tree: DomTree,
    document: NodeId,
    html: Option<NodeId>,
    head: Option<NodeId>,
    body: Option<NodeId>,
}

impl ParsedDocument {
    /// Document root node
    pub fn document_node(&self) -> NodeId {
        self.document
    }

    /// `<html>` element, if present
    pub fn document_element(&self) -> Option<NodeId> {
        self.html
    }

    /// `<head>` element, if present
    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    /// `<body>` element, if present
    pub fn body(&self) -> Option<NodeId> {
        self.body
    }
}

/// HTML5 parser
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML string into a ParsedDocument
    pub fn parse(&self, html: &str) -> ParsedDocument {
        tracing::debug!(bytes = html.len(), "parsing HTML");

        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut tree = DomTree::new();
        let document = tree.create_document();
        convert_children(&dom.document, &mut tree, document);

        let mut parsed = ParsedDocument {
            tree,
            document,
            html: None,
            head: None,
            body: None,
        };
        locate_skeleton(&mut parsed);

        tracing::debug!(nodes = parsed.tree.len(), "parsed HTML");
        parsed
    }
}

fn convert_children(handle: &Handle, tree: &mut DomTree, parent: NodeId) {
    for child in handle.children.borrow().iter() {
        convert_node(child, tree, parent);
    }
}

/// Convert one RcDom node into the arena
fn convert_node(handle: &Handle, tree: &mut DomTree, parent: NodeId) {
    match &handle.data {
        RcNodeData::Document => {
            convert_children(handle, tree, parent);
        }
        RcNodeData::Doctype { name, .. } => {
            tracing::debug!(doctype = %name, "skipping doctype");
        }
        RcNodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            // text preserved verbatim: slot projection and rehydration are
            // whitespace-sensitive
            let id = tree.create_text(&text);
            if let Err(e) = tree.append_child(parent, id) {
                tracing::warn!(error = %e, "dropping unplaceable text node");
            }
        }
        RcNodeData::Element { name, attrs, .. } => {
            let id = tree.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                let _ = tree.set_attr(id, &attr.name.local, &attr.value);
            }
            if let Err(e) = tree.append_child(parent, id) {
                tracing::warn!(error = %e, "dropping unplaceable element");
                return;
            }
            convert_children(handle, tree, id);
        }
        RcNodeData::Comment { .. } | RcNodeData::ProcessingInstruction { .. } => {}
    }
}

fn locate_skeleton(parsed: &mut ParsedDocument) {
    let html = parsed
        .tree
        .children(parsed.document)
        .iter()
        .copied()
        .find(|&c| parsed.tree.tag_name(c) == Some("html"));
    parsed.html = html;
    if let Some(html) = html {
        for &child in parsed.tree.children(html) {
            match parsed.tree.tag_name(child) {
                Some("head") => parsed.head = Some(child),
                Some("body") => parsed.body = Some(child),
                _ => {}
            }
        }
    }
}
