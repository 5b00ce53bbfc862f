//! Rehydration
//!
//! The wire format puts, inside each host element: unassigned light
//! children, a `<shadow-root>` wrapper holding the serialized shadow
//! subtree, and a trigger `<script>fn()</script>`. Because scripts execute
//! in document order and inner boundaries serialize before their enclosing
//! trigger, each trigger always finds a fully-settled wrapper as its
//! immediately-preceding element sibling.
//!
//! Two renditions of the procedure live here: the generated client script
//! (a browser reconstructs real shadow roots as it parses), and
//! [`rehydrate`], the same algorithm over a parsed [`DomTree`], used by
//! tests and server-side tooling.

use umbra_dom::{DomTree, NodeId, ShadowRootMode};

use crate::error::RenderError;
use crate::serialize::{DEFAULT_MARKER, SHADOW_WRAPPER_TAG};

const CLIENT_TEMPLATE: &str = r#"function __FN__() {
  var script = document.currentScript;
  var frame = script.previousElementSibling;
  var host = frame.parentNode;
  var slots = frame.querySelectorAll("slot");
  var topmost = [];
  for (var i = 0; i < slots.length; i++) {
    var nested = false;
    for (var j = 0; j < topmost.length; j++) {
      if (topmost[j].contains(slots[i])) { nested = true; break; }
    }
    if (!nested) topmost.push(slots[i]);
  }
  for (var k = 0; k < topmost.length; k++) {
    var slot = topmost[k];
    if (slot.hasAttribute("default")) {
      slot.removeAttribute("default");
    } else {
      while (slot.firstChild) host.appendChild(slot.firstChild);
    }
  }
  var root = host.attachShadow({ mode: "open" });
  while (frame.firstChild) root.appendChild(frame.firstChild);
  host.removeChild(frame);
  host.removeChild(script);
}
__FN__.s = function (id) {
  var script = document.currentScript;
  var source = document.getElementById(id);
  var style = document.createElement("style");
  style.textContent = source ? source.textContent : "";
  script.parentNode.replaceChild(style, script);
};"#;

/// The client bootstrap, with the configured function name substituted
pub fn client_script(func_name: &str) -> String {
    CLIENT_TEMPLATE.replace("__FN__", func_name)
}

#[derive(Debug)]
enum Trigger {
    Boundary(NodeId),
    Restyle { script: NodeId, dom_id: String },
}

/// Reconstruct real shadow boundaries in a parsed tree.
///
/// Triggers are collected up front in document order and then processed in
/// that order (the browser's script-execution order), so inner boundaries
/// settle before the enclosing one runs. Returns the number of boundaries
/// hydrated; unrecognized wire shapes are skipped with a warning.
pub fn rehydrate(tree: &mut DomTree, root: NodeId, func_name: &str) -> Result<usize, RenderError> {
    let triggers = collect_triggers(tree, root, func_name);
    let mut hydrated = 0;
    for trigger in triggers {
        match trigger {
            Trigger::Boundary(script) => {
                if hydrate_boundary(tree, script)? {
                    hydrated += 1;
                }
            }
            Trigger::Restyle { script, dom_id } => restyle(tree, root, script, &dom_id)?,
        }
    }
    tracing::debug!(boundaries = hydrated, "rehydrated");
    Ok(hydrated)
}

fn collect_triggers(tree: &DomTree, root: NodeId, func_name: &str) -> Vec<Trigger> {
    let boundary_call = format!("{func_name}()");
    let restyle_open = format!("{func_name}.s(\"");
    let mut triggers = Vec::new();
    tree.walk(root, &mut |id| {
        if tree.tag_name(id) != Some("script") {
            return;
        }
        let text = tree.text_content(id);
        let text = text.trim();
        if text == boundary_call {
            triggers.push(Trigger::Boundary(id));
        } else if let Some(rest) = text.strip_prefix(&restyle_open) {
            if let Some(dom_id) = rest.strip_suffix("\")") {
                triggers.push(Trigger::Restyle {
                    script: id,
                    dom_id: dom_id.to_string(),
                });
            }
        }
    });
    triggers
}

/// The wrapper is the trigger's preceding element sibling; only whitespace
/// text (pretty printing) may sit between them.
fn preceding_element(tree: &DomTree, parent: NodeId, node: NodeId) -> Option<NodeId> {
    let children = tree.children(parent);
    let idx = children.iter().position(|&c| c == node)?;
    for &candidate in children[..idx].iter().rev() {
        let n = tree.get(candidate)?;
        if n.is_element() {
            return Some(candidate);
        }
        if n.as_text().is_some_and(|t| t.trim().is_empty()) {
            continue;
        }
        return None;
    }
    None
}

fn topmost_slots(tree: &DomTree, wrapper: NodeId) -> Vec<NodeId> {
    let slots = tree.find_elements(wrapper, "slot");
    let mut topmost: Vec<NodeId> = Vec::new();
    for slot in slots {
        if !topmost.iter().any(|&t| tree.is_ancestor(t, slot)) {
            topmost.push(slot);
        }
    }
    topmost
}

fn hydrate_boundary(tree: &mut DomTree, script: NodeId) -> Result<bool, RenderError> {
    let Some(host) = tree.parent(script) else {
        tracing::warn!(script = ?script, "boundary trigger has no parent");
        return Ok(false);
    };
    let Some(wrapper) = preceding_element(tree, host, script) else {
        tracing::warn!(script = ?script, "boundary trigger has no preceding element");
        return Ok(false);
    };
    if tree.tag_name(wrapper) != Some(SHADOW_WRAPPER_TAG) {
        tracing::warn!(
            tag = tree.tag_name(wrapper).unwrap_or(""),
            "element before boundary trigger is not a shadow wrapper"
        );
        return Ok(false);
    }

    // assigned content goes back to the host's light tree; a default-marked
    // slot keeps its fallback and just drops the marker
    for slot in topmost_slots(tree, wrapper) {
        if tree.attr(slot, DEFAULT_MARKER).is_some() {
            tree.remove_attr(slot, DEFAULT_MARKER)?;
        } else {
            while let Some(&child) = tree.children(slot).first() {
                tree.append_child(host, child)?;
            }
        }
    }

    tree.detach(script);
    tree.detach(wrapper);
    let shadow = tree.attach_shadow(host, ShadowRootMode::Open)?;
    while let Some(&child) = tree.children(wrapper).first() {
        tree.append_child(shadow, child)?;
    }
    Ok(true)
}

/// Replace a restyle trigger by a style element carrying the hoisted
/// (deduplicated, scoped) text it points at.
fn restyle(
    tree: &mut DomTree,
    root: NodeId,
    script: NodeId,
    dom_id: &str,
) -> Result<(), RenderError> {
    let Some(parent) = tree.parent(script) else {
        return Ok(());
    };
    match find_style_text(tree, root, dom_id) {
        Some(css) => {
            let style = tree.create_element("style");
            let text = tree.create_text(&css);
            tree.append_child(style, text)?;
            tree.insert_before(parent, style, script)?;
        }
        None => tracing::warn!(id = %dom_id, "no hoisted style with this id"),
    }
    tree.detach(script);
    Ok(())
}

fn find_style_text(tree: &DomTree, root: NodeId, dom_id: &str) -> Option<String> {
    tree.find_elements(root, "style")
        .into_iter()
        .find(|&s| tree.attr(s, "id") == Some(dom_id))
        .map(|s| tree.text_content(s))
}
