//! Markup serialization
//!
//! Converts one node (and its shadow subtree, if any) into markup text.
//! Each boundary serializes as
//! `<host>…light…<shadow-root>…</shadow-root><script>fn()</script></host>`:
//! unassigned light children first, then the wrapper, then the trigger, so
//! the trigger's immediately-preceding sibling is always the completed
//! wrapper.
//!
//! Escaping policy (consistent throughout): text nodes escape `&`, `<`, `>`;
//! attribute values escape `&` and `"`; `script` and `style` content is
//! emitted raw.

use std::collections::{HashMap, HashSet};

use umbra_dom::{DomTree, ElementData, NodeData, NodeId};

use crate::error::RenderError;
use crate::render::RenderOptions;
use crate::slot::{self, Projection};
use crate::style::{scope_class_attr, style_dom_id, ScopeTable, StyleEntry};

/// Reserved wrapper tag for serialized shadow subtrees
pub const SHADOW_WRAPPER_TAG: &str = "shadow-root";

/// Marker attribute on a slot that rendered its fallback content
pub const DEFAULT_MARKER: &str = "default";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Scope context at one tree position
#[derive(Debug, Clone, Copy, Default)]
struct Frame<'a> {
    /// Style entry of the innermost scoped boundary, if any
    entry: Option<&'a StyleEntry>,
    /// Inside a shadow subtree (projected light content is not)
    in_shadow: bool,
    /// Inside raw-text content (script/style)
    raw: bool,
}

pub(crate) struct Serializer<'a> {
    tree: &'a DomTree,
    scopes: &'a ScopeTable,
    rehydrate: bool,
    func_name: &'a str,
    debug_format: bool,
    /// Assigned light nodes excluded from their host's light serialization
    consumed: HashSet<NodeId>,
    /// Precomputed projections, filled per boundary before its light pass
    assignments: HashMap<NodeId, Projection>,
    /// Scope frames at each enclosing host position, for projected content
    host_frames: Vec<Frame<'a>>,
    out: String,
    depth: usize,
}

/// Serialize a tree (or document) into markup
pub(crate) fn serialize_tree(
    tree: &DomTree,
    root: NodeId,
    scopes: &ScopeTable,
    opts: &RenderOptions,
) -> Result<String, RenderError> {
    let mut serializer = Serializer {
        tree,
        scopes,
        rehydrate: opts.rehydrate,
        func_name: &opts.func_name,
        debug_format: opts.debug_format,
        consumed: HashSet::new(),
        assignments: HashMap::new(),
        host_frames: Vec::new(),
        out: String::new(),
        depth: 0,
    };

    let node = tree.get(root).ok_or(RenderError::UnknownNode(root))?;
    if matches!(node.data, NodeData::Document) {
        for &child in node.children() {
            serializer.node(child, Frame::default())?;
        }
    } else {
        serializer.node(root, Frame::default())?;
    }
    Ok(serializer.out)
}

impl<'a> Serializer<'a> {
    fn node(&mut self, id: NodeId, frame: Frame<'a>) -> Result<(), RenderError> {
        let tree = self.tree;
        let node = tree.get(id).ok_or(RenderError::UnknownNode(id))?;
        match &node.data {
            NodeData::Document => Err(RenderError::UnexpectedDocument(id)),
            NodeData::Text(t) => {
                if frame.raw {
                    self.out.push_str(&t.content);
                } else {
                    push_escaped_text(&mut self.out, &t.content);
                }
                Ok(())
            }
            NodeData::ShadowRoot(_) => {
                for &child in node.children() {
                    self.node(child, frame)?;
                }
                Ok(())
            }
            NodeData::Element(e) => self.element(id, e, frame),
        }
    }

    fn element(&mut self, id: NodeId, e: &'a ElementData, frame: Frame<'a>) -> Result<(), RenderError> {
        // styles behind a boundary were folded into the scope table; emit a
        // restyle trigger in their place so the client knows a style tag
        // existed at this position
        if e.name == "style" && frame.in_shadow {
            if self.rehydrate {
                let text = self.tree.text_content(id);
                if let Some(entry) = self.scopes.entry_for_text(&text) {
                    self.out.push_str("<script>");
                    self.out.push_str(self.func_name);
                    self.out.push_str(".s(\"");
                    self.out.push_str(&style_dom_id(self.func_name, entry));
                    self.out.push_str("\")</script>");
                }
            }
            return Ok(());
        }

        if e.name == "slot" {
            return self.slot(id, e, frame);
        }

        // snapshot-then-transform: this boundary's assignments are computed
        // before its light children are walked
        if let Some(root) = e.shadow_root {
            for (slot_id, projection) in slot::project_host(self.tree, root) {
                if let Projection::Assigned(nodes) = &projection {
                    self.consumed.extend(nodes.iter().copied());
                }
                self.assignments.insert(slot_id, projection);
            }
        }

        self.indent();
        self.out.push('<');
        self.out.push_str(&e.name);
        self.attrs(e, frame);
        self.out.push('>');

        if e.shadow_root.is_none()
            && self.tree.children(id).is_empty()
            && VOID_ELEMENTS.contains(&e.name.as_str())
        {
            return Ok(());
        }

        let raw = matches!(e.name.as_str(), "script" | "style");
        self.depth += 1;

        for &child in self.tree.children(id) {
            if self.consumed.contains(&child) {
                continue;
            }
            self.node(
                child,
                Frame {
                    entry: frame.entry,
                    in_shadow: frame.in_shadow,
                    raw,
                },
            )?;
        }

        if let Some(root) = e.shadow_root {
            self.indent();
            self.out.push('<');
            self.out.push_str(SHADOW_WRAPPER_TAG);
            self.out.push('>');

            let inner = self.scopes.root_entry(root).filter(|entry| entry.scoped);
            self.host_frames.push(frame);
            self.depth += 1;
            for &child in self.tree.children(root) {
                self.node(
                    child,
                    Frame {
                        entry: inner,
                        in_shadow: true,
                        raw: false,
                    },
                )?;
            }
            self.depth -= 1;
            self.host_frames.pop();

            self.indent();
            self.out.push_str("</");
            self.out.push_str(SHADOW_WRAPPER_TAG);
            self.out.push('>');

            if self.rehydrate {
                self.out.push_str("<script>");
                self.out.push_str(self.func_name);
                self.out.push_str("()</script>");
            }
        }

        self.depth -= 1;
        self.out.push_str("</");
        self.out.push_str(&e.name);
        self.out.push('>');
        Ok(())
    }

    fn slot(&mut self, id: NodeId, e: &'a ElementData, frame: Frame<'a>) -> Result<(), RenderError> {
        let projection = self
            .assignments
            .remove(&id)
            .unwrap_or_else(|| slot::resolve(self.tree, id));

        self.indent();
        self.out.push_str("<slot");
        self.attrs(e, frame);
        if matches!(projection, Projection::Fallback) {
            self.out.push(' ');
            self.out.push_str(DEFAULT_MARKER);
        }
        self.out.push('>');

        self.depth += 1;
        match projection {
            Projection::Assigned(nodes) => {
                // projected content lives at the host's position; it takes
                // the scope in effect there, not the shadow scope
                let host_frame = self.host_frames.last().copied().unwrap_or_default();
                for node in nodes {
                    self.node(node, host_frame)?;
                }
            }
            Projection::Fallback | Projection::Unresolvable => {
                for &child in self.tree.children(id) {
                    self.node(child, frame)?;
                }
            }
        }
        self.depth -= 1;
        self.out.push_str("</slot>");
        Ok(())
    }

    fn attrs(&mut self, e: &ElementData, frame: Frame<'a>) {
        for attr in &e.attrs {
            self.out.push(' ');
            self.out.push_str(&attr.name);
            self.out.push_str("=\"");
            let scoped_class = match frame.entry {
                Some(entry) if entry.scoped && attr.name == "class" => {
                    Some(scope_class_attr(&attr.value, &entry.suffix()))
                }
                _ => None,
            };
            match scoped_class {
                Some(value) => push_escaped_attr(&mut self.out, &value),
                None => push_escaped_attr(&mut self.out, &attr.value),
            }
            self.out.push('"');
        }
    }

    /// Cosmetic pretty printing: newline plus two-space indent before
    /// element open tags
    fn indent(&mut self) {
        if self.debug_format && !self.out.is_empty() {
            self.out.push('\n');
            for _ in 0..self.depth {
                self.out.push_str("  ");
            }
        }
    }
}

fn push_escaped_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn push_escaped_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
