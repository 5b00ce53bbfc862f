//! Slot projection
//!
//! Resolves which light nodes render in place of each projection point.
//! The assignment relation is derived from current attribute state at
//! serialization time, never stored. Exclusion of assigned nodes from the
//! host's light serialization happens through the serializer's consumed
//! set (snapshot-then-transform), so the caller's tree is never mutated.

use std::collections::HashSet;

use umbra_dom::{DomTree, NodeId};

/// Outcome of resolving one projection point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Light nodes assigned to this slot, in host child order
    Assigned(Vec<NodeId>),
    /// Nothing assigned; the slot renders its static fallback children and
    /// carries the default marker
    Fallback,
    /// No enclosing shadow root (malformed tree); fallback children render
    /// without the marker
    Unresolvable,
}

/// Nearest enclosing shadow root, found by walking parent links
pub fn enclosing_shadow_root(tree: &DomTree, id: NodeId) -> Option<NodeId> {
    let mut cur = tree.parent(id);
    while let Some(node) = cur {
        if tree.get(node).is_some_and(|n| n.is_shadow_root()) {
            return Some(node);
        }
        cur = tree.parent(node);
    }
    None
}

/// Effective slot name (None for the unnamed slot)
fn slot_name(tree: &DomTree, slot: NodeId) -> Option<String> {
    tree.attr(slot, "name")
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// The assignment relation for (host, name): the host's direct children
/// whose `slot` attribute matches, or, for the unnamed slot, all children
/// lacking a `slot` attribute (text nodes always lack one).
pub fn assigned_nodes(tree: &DomTree, host: NodeId, name: Option<&str>) -> Vec<NodeId> {
    tree.children(host)
        .iter()
        .copied()
        .filter(|&child| {
            let slot_attr = tree.attr(child, "slot");
            match name {
                Some(n) => slot_attr == Some(n),
                None => slot_attr.is_none(),
            }
        })
        .collect()
}

/// Resolve a single projection point against its host's current children
pub fn resolve(tree: &DomTree, slot: NodeId) -> Projection {
    let Some(root) = enclosing_shadow_root(tree, slot) else {
        tracing::warn!(slot = ?slot, "projection point has no enclosing shadow root");
        return Projection::Unresolvable;
    };
    let Some(host) = tree.host(root) else {
        tracing::warn!(root = ?root, "shadow root lost its host back-reference");
        return Projection::Unresolvable;
    };
    let name = slot_name(tree, slot);
    let nodes = assigned_nodes(tree, host, name.as_deref());
    if nodes.is_empty() {
        Projection::Fallback
    } else {
        Projection::Assigned(nodes)
    }
}

/// Precompute the assignment relation for every slot under one shadow root.
///
/// Runs before the host's light children are serialized so assigned nodes
/// can be excluded up front. Slots are visited in document order; a later
/// slot with the same effective name receives nothing (first slot wins).
/// A slot sitting inside the fallback of a slot that received assignment
/// never renders, so it gets no projection and its candidates stay
/// ordinary light children. Does not descend into nested shadow subtrees:
/// their slots belong to their own boundary.
pub fn project_host(tree: &DomTree, root: NodeId) -> Vec<(NodeId, Projection)> {
    let host = tree.host(root);
    let mut slots = Vec::new();
    collect_slots(tree, root, &mut slots);

    let mut taken: HashSet<NodeId> = HashSet::new();
    let mut assigned_slots: Vec<NodeId> = Vec::new();
    let mut out = Vec::with_capacity(slots.len());
    for slot in slots {
        // document order puts an enclosing slot before the slots in its
        // fallback, so displaced fallback subtrees are known by now
        if assigned_slots.iter().any(|&a| tree.is_ancestor(a, slot)) {
            continue;
        }
        let projection = match host {
            Some(h) => {
                let name = slot_name(tree, slot);
                let nodes: Vec<NodeId> = assigned_nodes(tree, h, name.as_deref())
                    .into_iter()
                    .filter(|n| !taken.contains(n))
                    .collect();
                if nodes.is_empty() {
                    Projection::Fallback
                } else {
                    taken.extend(nodes.iter().copied());
                    assigned_slots.push(slot);
                    Projection::Assigned(nodes)
                }
            }
            None => Projection::Unresolvable,
        };
        out.push((slot, projection));
    }
    out
}

fn collect_slots(tree: &DomTree, id: NodeId, out: &mut Vec<NodeId>) {
    let Some(node) = tree.get(id) else {
        return;
    };
    if node.as_element().is_some_and(|e| e.name == "slot") {
        out.push(id);
    }
    for &child in node.children() {
        collect_slots(tree, child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_dom::ShadowRootMode;

    struct Fixture {
        tree: DomTree,
        root: NodeId,
        host: NodeId,
    }

    fn host_with_shadow() -> Fixture {
        let mut tree = DomTree::new();
        let host = tree.create_element("x-card");
        let root = tree.attach_shadow(host, ShadowRootMode::Open).unwrap();
        Fixture { tree, root, host }
    }

    #[test]
    fn test_named_assignment() {
        let mut f = host_with_shadow();
        let slot = f.tree.create_element("slot");
        f.tree.set_attr(slot, "name", "title").unwrap();
        f.tree.append_child(f.root, slot).unwrap();

        let h1 = f.tree.create_element("h1");
        f.tree.set_attr(h1, "slot", "title").unwrap();
        let p = f.tree.create_element("p");
        f.tree.append_child(f.host, h1).unwrap();
        f.tree.append_child(f.host, p).unwrap();

        assert_eq!(resolve(&f.tree, slot), Projection::Assigned(vec![h1]));
    }

    #[test]
    fn test_unnamed_slot_takes_unattributed_children() {
        let mut f = host_with_shadow();
        let slot = f.tree.create_element("slot");
        f.tree.append_child(f.root, slot).unwrap();

        let text = f.tree.create_text("World");
        let named = f.tree.create_element("h1");
        f.tree.set_attr(named, "slot", "title").unwrap();
        f.tree.append_child(f.host, text).unwrap();
        f.tree.append_child(f.host, named).unwrap();

        assert_eq!(resolve(&f.tree, slot), Projection::Assigned(vec![text]));
    }

    #[test]
    fn test_empty_assignment_falls_back() {
        let mut f = host_with_shadow();
        let slot = f.tree.create_element("slot");
        f.tree.set_attr(slot, "name", "missing").unwrap();
        f.tree.append_child(f.root, slot).unwrap();

        assert_eq!(resolve(&f.tree, slot), Projection::Fallback);
    }

    #[test]
    fn test_slot_without_shadow_root_is_unresolvable() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let slot = tree.create_element("slot");
        tree.append_child(div, slot).unwrap();

        assert_eq!(resolve(&tree, slot), Projection::Unresolvable);
    }

    #[test]
    fn test_first_duplicate_slot_wins() {
        let mut f = host_with_shadow();
        let s1 = f.tree.create_element("slot");
        let s2 = f.tree.create_element("slot");
        f.tree.append_child(f.root, s1).unwrap();
        f.tree.append_child(f.root, s2).unwrap();

        let text = f.tree.create_text("once");
        f.tree.append_child(f.host, text).unwrap();

        let projected = project_host(&f.tree, f.root);
        assert_eq!(projected[0], (s1, Projection::Assigned(vec![text])));
        assert_eq!(projected[1], (s2, Projection::Fallback));
    }

    #[test]
    fn test_slot_in_displaced_fallback_gets_no_projection() {
        let mut f = host_with_shadow();
        let outer = f.tree.create_element("slot");
        f.tree.set_attr(outer, "name", "a").unwrap();
        let inner = f.tree.create_element("slot");
        f.tree.set_attr(inner, "name", "b").unwrap();
        f.tree.append_child(outer, inner).unwrap();
        f.tree.append_child(f.root, outer).unwrap();

        let em = f.tree.create_element("em");
        f.tree.set_attr(em, "slot", "a").unwrap();
        let strong = f.tree.create_element("strong");
        f.tree.set_attr(strong, "slot", "b").unwrap();
        f.tree.append_child(f.host, em).unwrap();
        f.tree.append_child(f.host, strong).unwrap();

        // the outer slot's assignment displaces its fallback, so the inner
        // slot never renders and must not claim the strong element
        let projected = project_host(&f.tree, f.root);
        assert_eq!(projected, vec![(outer, Projection::Assigned(vec![em]))]);
    }

    #[test]
    fn test_slot_in_rendered_fallback_still_projects() {
        let mut f = host_with_shadow();
        let outer = f.tree.create_element("slot");
        f.tree.set_attr(outer, "name", "a").unwrap();
        let inner = f.tree.create_element("slot");
        f.tree.set_attr(inner, "name", "b").unwrap();
        f.tree.append_child(outer, inner).unwrap();
        f.tree.append_child(f.root, outer).unwrap();

        let strong = f.tree.create_element("strong");
        f.tree.set_attr(strong, "slot", "b").unwrap();
        f.tree.append_child(f.host, strong).unwrap();

        let projected = project_host(&f.tree, f.root);
        assert_eq!(
            projected,
            vec![
                (outer, Projection::Fallback),
                (inner, Projection::Assigned(vec![strong])),
            ]
        );
    }

    #[test]
    fn test_project_host_skips_nested_boundaries() {
        let mut f = host_with_shadow();
        let inner_host = f.tree.create_element("x-inner");
        let inner_root = f
            .tree
            .attach_shadow(inner_host, ShadowRootMode::Open)
            .unwrap();
        let inner_slot = f.tree.create_element("slot");
        f.tree.append_child(inner_root, inner_slot).unwrap();
        f.tree.append_child(f.root, inner_host).unwrap();

        let projected = project_host(&f.tree, f.root);
        assert!(projected.iter().all(|(slot, _)| *slot != inner_slot));
    }
}
