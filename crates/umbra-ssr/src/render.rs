//! Render orchestration
//!
//! The public entry points. A render has two phases: `begin_render` settles
//! the tree into a connected state (temporarily attaching detached nodes),
//! `complete_render` waits on the scheduling barrier, extracts styles,
//! serializes, and undoes every temporary attachment whether or not the walk
//! succeeded. `render` is the two glued together.

use umbra_dom::{Document, NodeData, NodeId, SetupError};

use crate::error::RenderError;
use crate::rehydrate::client_script;
use crate::serialize::serialize_tree;
use crate::style::{style_dom_id, ScopeTable};

/// Function name the rehydration markers call when none is configured
pub const DEFAULT_FUNC_NAME: &str = "__ssr";

/// Suspension point between setup and serialization.
///
/// The default drains the document's deferred task queue. Callers with their
/// own scheduling (an async runtime, a deadline) supply a closure instead.
pub trait SchedulingBarrier {
    fn wait(&mut self, doc: &mut Document) -> Result<(), SetupError>;
}

/// Default barrier: drain the deferred task queue until it stays empty
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainTasks;

impl SchedulingBarrier for DrainTasks {
    fn wait(&mut self, doc: &mut Document) -> Result<(), SetupError> {
        doc.run_tasks()
    }
}

impl<F> SchedulingBarrier for F
where
    F: FnMut(&mut Document) -> Result<(), SetupError>,
{
    fn wait(&mut self, doc: &mut Document) -> Result<(), SetupError> {
        self(doc)
    }
}

/// Render configuration
pub struct RenderOptions {
    /// Emit rehydration markers and the client bootstrap script
    pub rehydrate: bool,
    /// Name of the generated client function; also prefixes style DOM ids
    pub func_name: String,
    /// Barrier run between setup and serialization
    pub barrier: Box<dyn SchedulingBarrier>,
    /// Cosmetic pretty printing of the output
    pub debug_format: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            rehydrate: true,
            func_name: DEFAULT_FUNC_NAME.to_string(),
            barrier: Box::new(DrainTasks),
            debug_format: false,
        }
    }
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("rehydrate", &self.rehydrate)
            .field("func_name", &self.func_name)
            .field("debug_format", &self.debug_format)
            .finish_non_exhaustive()
    }
}

/// How the render root is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Root is the document node; the whole document serializes, hoisted
    /// elements are temporarily inserted into head
    Document,
    /// Root is a fragment; hoisted output is prefixed to the markup string
    Detached,
}

/// Receipt from [`begin_render`], consumed by [`complete_render`].
///
/// Records what must be undone at settle time.
#[derive(Debug)]
pub struct RenderToken {
    root: NodeId,
    mode: RenderMode,
    /// Root was temporarily appended to body
    attached: bool,
}

impl RenderToken {
    pub fn mode(&self) -> RenderMode {
        self.mode
    }
}

/// Phase one: connect the render root.
///
/// A detached root (no parent) is appended to `document.body` so connected
/// callbacks fire with a live ancestry; the token records the attachment for
/// settle-time removal. On callback failure the attachment is undone before
/// the error propagates.
pub fn begin_render(doc: &mut Document, node: NodeId) -> Result<RenderToken, RenderError> {
    let data = &doc.tree.get(node).ok_or(RenderError::UnknownNode(node))?.data;
    let mode = if matches!(data, NodeData::Document) {
        RenderMode::Document
    } else {
        RenderMode::Detached
    };

    let mut token = RenderToken {
        root: node,
        mode,
        attached: false,
    };
    if mode == RenderMode::Detached && doc.tree.parent(node).is_none() {
        let body = doc.body();
        doc.tree.append_child(body, node)?;
        token.attached = true;
    }
    if let Err(err) = doc.connect_subtree(node) {
        cleanup(doc, &token);
        return Err(RenderError::Setup(err));
    }
    tracing::debug!(mode = ?mode, root = ?node, "render began");
    Ok(token)
}

/// Phase two: barrier, styles, serialization, settle.
///
/// Temporary attachments are undone on every path out, including a failing
/// barrier and a failing serialization.
pub fn complete_render(
    doc: &mut Document,
    token: RenderToken,
    mut opts: RenderOptions,
) -> Result<String, RenderError> {
    let result = pipeline(doc, &token, &mut opts);
    cleanup(doc, &token);
    result
}

/// Render a node (or a whole document) to markup
pub fn render(doc: &mut Document, node: NodeId, opts: RenderOptions) -> Result<String, RenderError> {
    let token = begin_render(doc, node)?;
    complete_render(doc, token, opts)
}

fn pipeline(
    doc: &mut Document,
    token: &RenderToken,
    opts: &mut RenderOptions,
) -> Result<String, RenderError> {
    opts.barrier.wait(doc)?;

    let scopes = ScopeTable::extract(&doc.tree, token.root);
    match token.mode {
        RenderMode::Detached => {
            let body = serialize_tree(&doc.tree, token.root, &scopes, opts)?;
            let mut out = String::new();
            if opts.rehydrate {
                out.push_str("<script>");
                out.push_str(&client_script(&opts.func_name));
                out.push_str("</script>");
            }
            for entry in scopes.entries() {
                out.push_str("<style id=\"");
                out.push_str(&style_dom_id(&opts.func_name, entry));
                out.push_str("\">");
                out.push_str(&entry.css);
                out.push_str("</style>");
            }
            out.push_str(&body);
            Ok(out)
        }
        RenderMode::Document => {
            // hoisted elements become real head children so they serialize
            // in place; removed again below on both paths
            let head = doc.head();
            let mut hoisted = Vec::new();
            if opts.rehydrate {
                let script = doc.tree.create_element("script");
                let text = doc.tree.create_text(&client_script(&opts.func_name));
                doc.tree.append_child(script, text)?;
                doc.tree.append_child(head, script)?;
                hoisted.push(script);
            }
            for entry in scopes.entries() {
                let style = doc.tree.create_element("style");
                doc.tree.set_attr(style, "id", &style_dom_id(&opts.func_name, entry))?;
                let text = doc.tree.create_text(&entry.css);
                doc.tree.append_child(style, text)?;
                doc.tree.append_child(head, style)?;
                hoisted.push(style);
            }

            let result = serialize_tree(&doc.tree, token.root, &scopes, opts);
            for node in hoisted {
                doc.tree.detach(node);
            }
            result
        }
    }
}

/// Undo the token's temporary attachment, firing disconnected callbacks
fn cleanup(doc: &mut Document, token: &RenderToken) {
    if !token.attached {
        return;
    }
    let body = doc.body();
    if doc.remove_child(body, token.root).is_err() {
        // a callback moved the root; settle its lifecycle state anyway
        doc.tree.detach(token.root);
        doc.disconnect_subtree(token.root);
    }
    tracing::debug!(root = ?token.root, "temporary attachment undone");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use umbra_dom::CustomElementDefinition;

    fn plain_opts() -> RenderOptions {
        RenderOptions {
            rehydrate: false,
            ..RenderOptions::default()
        }
    }

    fn define_greeter(doc: &mut Document) {
        doc.define(
            CustomElementDefinition::new("x-hello").on_connected(|doc, id| {
                let root = doc
                    .attach_shadow(id)
                    .map_err(|e| SetupError::new(e.to_string()))?;
                let span = doc.create_element("span");
                let text = doc.create_text("Hello");
                doc.tree
                    .append_child(span, text)
                    .and_then(|_| doc.tree.append_child(root, span))
                    .map_err(|e| SetupError::new(e.to_string()))
            }),
        )
        .unwrap();
    }

    #[test]
    fn test_detached_render_of_plain_tree() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let text = doc.create_text("hi");
        doc.tree.append_child(div, text).unwrap();

        let markup = render(&mut doc, div, plain_opts()).unwrap();
        assert_eq!(markup, "<div>hi</div>");
    }

    #[test]
    fn test_connected_callback_builds_shadow_before_serialization() {
        let mut doc = Document::new();
        define_greeter(&mut doc);
        let host = doc.create_element("x-hello");

        let markup = render(&mut doc, host, plain_opts()).unwrap();
        assert_eq!(
            markup,
            "<x-hello><shadow-root><span>Hello</span></shadow-root></x-hello>"
        );
    }

    #[test]
    fn test_detached_root_is_settled_after_render() {
        let disconnects = Rc::new(Cell::new(0));
        let seen = disconnects.clone();
        let mut doc = Document::new();
        doc.define(
            CustomElementDefinition::new("x-probe")
                .on_connected(|_, _| Ok(()))
                .on_disconnected(move |_, _| seen.set(seen.get() + 1)),
        )
        .unwrap();

        let host = doc.create_element("x-probe");
        render(&mut doc, host, plain_opts()).unwrap();

        assert_eq!(doc.tree.parent(host), None);
        assert!(!doc.is_connected(host));
        assert_eq!(disconnects.get(), 1);
    }

    #[test]
    fn test_already_attached_root_stays_attached() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, div).unwrap();

        render(&mut doc, div, plain_opts()).unwrap();
        assert_eq!(doc.tree.parent(div), Some(body));
    }

    #[test]
    fn test_barrier_failure_still_cleans_up() {
        let disconnects = Rc::new(Cell::new(0));
        let seen = disconnects.clone();
        let mut doc = Document::new();
        doc.define(
            CustomElementDefinition::new("x-probe")
                .on_connected(|_, _| Ok(()))
                .on_disconnected(move |_, _| seen.set(seen.get() + 1)),
        )
        .unwrap();
        let host = doc.create_element("x-probe");

        let opts = RenderOptions {
            rehydrate: false,
            barrier: Box::new(|_: &mut Document| Err(SetupError::new("deadline exceeded"))),
            ..RenderOptions::default()
        };
        let err = render(&mut doc, host, opts).unwrap_err();
        assert!(matches!(err, RenderError::Setup(_)));
        assert_eq!(doc.tree.parent(host), None);
        assert_eq!(disconnects.get(), 1);
    }

    #[test]
    fn test_deferred_task_runs_before_serialization() {
        let mut doc = Document::new();
        doc.define(
            CustomElementDefinition::new("x-yell").on_connected(|doc, id| {
                doc.schedule(move |doc| {
                    let root = doc
                        .attach_shadow(id)
                        .map_err(|e| SetupError::new(e.to_string()))?;
                    let text = doc.create_text("LOUD");
                    doc.tree
                        .append_child(root, text)
                        .map_err(|e| SetupError::new(e.to_string()))
                });
                Ok(())
            }),
        )
        .unwrap();

        let host = doc.create_element("x-yell");
        let markup = render(&mut doc, host, plain_opts()).unwrap();
        assert_eq!(markup, "<x-yell><shadow-root>LOUD</shadow-root></x-yell>");
    }

    #[test]
    fn test_detached_output_hoists_styles_in_front() {
        let mut doc = Document::new();
        let host = doc.create_element("x-box");
        let root = doc.attach_shadow(host).unwrap();
        let style = doc.create_element("style");
        let css = doc.create_text(".a{color:red}");
        doc.tree.append_child(style, css).unwrap();
        doc.tree.append_child(root, style).unwrap();

        let markup = render(&mut doc, host, plain_opts()).unwrap();
        assert_eq!(
            markup,
            "<style id=\"__ssr-s0\">.a-0{color:red}</style>\
             <x-box><shadow-root></shadow-root></x-box>"
        );
    }

    #[test]
    fn test_rehydrating_render_prefixes_bootstrap() {
        let mut doc = Document::new();
        define_greeter(&mut doc);
        let host = doc.create_element("x-hello");

        let markup = render(&mut doc, host, RenderOptions::default()).unwrap();
        assert!(markup.starts_with("<script>"));
        assert!(markup.contains("function __ssr()"));
        assert!(markup.ends_with("<script>__ssr()</script></x-hello>"));
    }

    #[test]
    fn test_document_mode_restores_head() {
        let mut doc = Document::new();
        define_greeter(&mut doc);
        let host = doc.create_element("x-hello");
        let body = doc.body();
        doc.append_child(body, host).unwrap();
        let head_len = doc.tree.children(doc.head()).len();

        let root = doc.document_node();
        let markup = render(&mut doc, root, RenderOptions::default()).unwrap();
        assert!(markup.starts_with("<html><head><script>"));
        assert!(markup.contains("<x-hello>"));
        // hoisted head elements are gone again
        assert_eq!(doc.tree.children(doc.head()).len(), head_len);
    }

    #[test]
    fn test_unknown_root_is_fatal() {
        let mut doc = Document::new();
        let mut other = Document::new();
        for _ in 0..10 {
            other.create_element("div");
        }
        let foreign = other.create_element("div");
        assert!(matches!(
            render(&mut doc, foreign, plain_opts()),
            Err(RenderError::UnknownNode(_))
        ));
    }
}
