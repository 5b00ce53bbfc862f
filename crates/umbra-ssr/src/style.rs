//! Style extraction and scoping
//!
//! Walks both sides of every encapsulation boundary collecting style text,
//! deduplicates byte-identical text into one entry, and assigns each
//! boundary a render-local scope identifier. Scoping rewrites class
//! selectors (`.foo` becomes `.foo-0`) and, at serialization time, class
//! attribute tokens, so deduplicated styles cannot leak across boundaries.
//!
//! The identifier counter lives in the table, so its lifetime is exactly one
//! render and concurrent renders on separate tables never interleave.

use std::collections::HashMap;

use umbra_dom::{DomTree, NodeData, NodeId};

/// Render-local scope identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn value(self) -> u32 {
        self.0
    }
}

/// One unique style entry
#[derive(Debug)]
pub struct StyleEntry {
    pub id: ScopeId,
    /// Scoped style text (original text when tokenization was ambiguous)
    pub css: String,
    /// False when the text could not be tokenized and was passed through
    pub scoped: bool,
}

impl StyleEntry {
    /// Suffix appended to class selectors and class attribute tokens
    pub fn suffix(&self) -> String {
        format!("-{}", self.id.0)
    }
}

/// DOM id carried by the emitted style tag for this entry
pub fn style_dom_id(func_name: &str, entry: &StyleEntry) -> String {
    format!("{}-s{}", func_name, entry.id.0)
}

#[derive(Debug, Clone, Copy)]
struct RootScope {
    entry: usize,
    introduced: bool,
}

/// Per-render scope table: style text -> entry, boundary -> entry
#[derive(Debug, Default)]
pub struct ScopeTable {
    entries: Vec<StyleEntry>,
    by_text: HashMap<String, usize>,
    roots: HashMap<NodeId, RootScope>,
    next_id: u32,
}

impl ScopeTable {
    /// Extract styles from the full tree under `root`, descending into both
    /// light children and attached shadow subtrees.
    pub fn extract(tree: &DomTree, root: NodeId) -> Self {
        let mut table = Self::default();
        table.collect(tree, root, None);
        tracing::debug!(
            entries = table.entries.len(),
            boundaries = table.roots.len(),
            "extracted styles"
        );
        table
    }

    fn collect(&mut self, tree: &DomTree, id: NodeId, enclosing: Option<NodeId>) {
        let Some(node) = tree.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Element(e) => {
                // only styles behind a boundary are folded; light styles
                // serialize as ordinary elements
                if e.name == "style" {
                    if let Some(root) = enclosing {
                        self.fold(tree, id, root);
                        return;
                    }
                }
                for &child in node.children() {
                    self.collect(tree, child, enclosing);
                }
                if let Some(shadow) = e.shadow_root {
                    self.collect(tree, shadow, enclosing);
                }
            }
            NodeData::ShadowRoot(_) => {
                for &child in node.children() {
                    self.collect(tree, child, Some(id));
                }
            }
            NodeData::Document => {
                for &child in node.children() {
                    self.collect(tree, child, enclosing);
                }
            }
            NodeData::Text(_) => {}
        }
    }

    fn fold(&mut self, tree: &DomTree, style: NodeId, root: NodeId) {
        // cache key is the flattened text, verbatim: divergent whitespace
        // produces distinct entries by design
        let text = tree.text_content(style);
        if text.is_empty() {
            return;
        }
        if let Some(&idx) = self.by_text.get(&text) {
            self.roots.entry(root).or_insert(RootScope {
                entry: idx,
                introduced: false,
            });
            return;
        }

        let id = ScopeId(self.next_id);
        self.next_id += 1;
        let suffix = format!("-{}", id.0);
        let (css, scoped) = match scope_css(&text, &suffix) {
            Some(css) => (css, true),
            None => {
                tracing::warn!(
                    "ambiguous style text (unterminated comment or string), emitting unscoped"
                );
                (text.clone(), false)
            }
        };
        let idx = self.entries.len();
        self.entries.push(StyleEntry { id, css, scoped });
        self.by_text.insert(text, idx);
        self.roots.entry(root).or_insert(RootScope {
            entry: idx,
            introduced: true,
        });
    }

    /// Unique entries, in discovery order
    pub fn entries(&self) -> &[StyleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for the given flattened style text
    pub fn entry_for_text(&self, text: &str) -> Option<&StyleEntry> {
        self.by_text.get(text).map(|&i| &self.entries[i])
    }

    /// Entry assigned to an encapsulation root (its first style element)
    pub fn root_entry(&self, root: NodeId) -> Option<&StyleEntry> {
        self.roots.get(&root).map(|r| &self.entries[r.entry])
    }

    /// Whether the root introduced a new entry (vs. reusing one)
    pub fn root_introduced(&self, root: NodeId) -> Option<bool> {
        self.roots.get(&root).map(|r| r.introduced)
    }
}

/// Rewrite class attribute tokens with the scope suffix
pub(crate) fn scope_class_attr(value: &str, suffix: &str) -> String {
    value
        .split_whitespace()
        .map(|token| format!("{token}{suffix}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Append `suffix` to every class selector in `css`.
///
/// Comments, quoted strings, and `url(...)` bodies are opaque to the
/// tokenizer. Class tokens are rewritten only in the chunk immediately
/// preceding a `{`, which keeps declaration values untouched and still
/// reaches selectors nested inside at-rule blocks. Returns None when the
/// text is ambiguous (unterminated comment or string).
pub(crate) fn scope_css(css: &str, suffix: &str) -> Option<String> {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len() + 16);
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if css[i..].starts_with("/*") => {
                let end = css[i..].find("*/").map(|p| i + p + 2)?;
                out.push_str(&css[start..i]);
                out.push_str(&css[i..end]);
                i = end;
                start = i;
            }
            quote @ (b'\'' | b'"') => {
                let end = find_string_end(bytes, i, quote)?;
                out.push_str(&css[start..i]);
                out.push_str(&css[i..end]);
                i = end;
                start = i;
            }
            b'u' | b'U' if is_url_open(css, i) => {
                match css[i..].find(')') {
                    Some(p) => {
                        let end = i + p + 1;
                        out.push_str(&css[start..i]);
                        out.push_str(&css[i..end]);
                        i = end;
                        start = i;
                    }
                    // no closing paren: not treated as a url token
                    None => i += 1,
                }
            }
            b'{' => {
                rewrite_selector_chunk(&css[start..i], suffix, &mut out);
                out.push('{');
                i += 1;
                start = i;
            }
            b'}' => {
                out.push_str(&css[start..i]);
                out.push('}');
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }

    out.push_str(&css[start..]);
    Some(out)
}

/// `url(` at a word boundary, case-insensitive
fn is_url_open(css: &str, i: usize) -> bool {
    let bytes = css.as_bytes();
    if i + 4 > bytes.len() || !bytes[i..i + 4].eq_ignore_ascii_case(b"url(") {
        return false;
    }
    i == 0 || !is_ident_char(bytes[i - 1])
}

/// Index one past the closing quote; None when unterminated
fn find_string_end(bytes: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'-'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Rewrite `.class` tokens in a selector chunk
fn rewrite_selector_chunk(chunk: &str, suffix: &str, out: &mut String) {
    let bytes = chunk.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'.' && i + 1 < bytes.len() && is_ident_start(bytes[i + 1]) {
            let mut j = i + 1;
            while j < bytes.len() && is_ident_char(bytes[j]) {
                j += 1;
            }
            out.push_str(&chunk[start..j]);
            out.push_str(suffix);
            i = j;
            start = j;
        } else {
            i += 1;
        }
    }
    out.push_str(&chunk[start..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_dom::ShadowRootMode;

    fn scoped(css: &str) -> String {
        scope_css(css, "-0").expect("tokenizable")
    }

    #[test]
    fn test_class_selector_rewritten() {
        assert_eq!(scoped(".a{color:red}"), ".a-0{color:red}");
    }

    #[test]
    fn test_selector_lists_and_combinators() {
        assert_eq!(scoped(".a,.b{x:y}"), ".a-0,.b-0{x:y}");
        assert_eq!(scoped(".a > .b{x:y}"), ".a-0 > .b-0{x:y}");
    }

    #[test]
    fn test_pseudo_class_kept_outside_token() {
        assert_eq!(scoped(".a:hover{x:y}"), ".a-0:hover{x:y}");
    }

    #[test]
    fn test_declaration_values_untouched() {
        assert_eq!(
            scoped(".a{background:url(.dots.png)}"),
            ".a-0{background:url(.dots.png)}"
        );
        assert_eq!(scoped(".a{content:'.b'}"), ".a-0{content:'.b'}");
        assert_eq!(scoped(".a{width:.5em}"), ".a-0{width:.5em}");
    }

    #[test]
    fn test_comments_untouched() {
        assert_eq!(scoped("/* .x{} */.a{c:r}"), "/* .x{} */.a-0{c:r}");
    }

    #[test]
    fn test_strings_in_selector_position_untouched() {
        assert_eq!(
            scoped("[data-x='.a'] .b{c:r}"),
            "[data-x='.a'] .b-0{c:r}"
        );
    }

    #[test]
    fn test_at_rule_nesting() {
        assert_eq!(
            scoped("@media screen{.a{color:red}}"),
            "@media screen{.a-0{color:red}}"
        );
    }

    #[test]
    fn test_unterminated_comment_is_ambiguous() {
        assert!(scope_css(".a{c:r} /* oops", "-0").is_none());
        assert!(scope_css(".a{content:'oops}", "-0").is_none());
    }

    #[test]
    fn test_class_attr_tokens() {
        assert_eq!(scope_class_attr("a  b", "-3"), "a-3 b-3");
    }

    #[test]
    fn test_extract_dedups_identical_text() {
        let mut tree = DomTree::new();
        let container = tree.create_element("div");
        let mut roots = Vec::new();
        for _ in 0..2 {
            let host = tree.create_element("x-box");
            let root = tree.attach_shadow(host, ShadowRootMode::Open).unwrap();
            let style = tree.create_element("style");
            let text = tree.create_text(".a{color:red}");
            tree.append_child(style, text).unwrap();
            tree.append_child(root, style).unwrap();
            tree.append_child(container, host).unwrap();
            roots.push(root);
        }

        let table = ScopeTable::extract(&tree, container);
        assert_eq!(table.entries().len(), 1);
        assert_eq!(table.root_introduced(roots[0]), Some(true));
        assert_eq!(table.root_introduced(roots[1]), Some(false));
        let e0 = table.root_entry(roots[0]).unwrap();
        let e1 = table.root_entry(roots[1]).unwrap();
        assert_eq!(e0.id, e1.id);
        assert_eq!(e0.css, ".a-0{color:red}");
    }

    #[test]
    fn test_whitespace_divergence_makes_distinct_entries() {
        let mut tree = DomTree::new();
        let container = tree.create_element("div");
        for css in [".a{color:red}", ".a{ color:red }"] {
            let host = tree.create_element("x-box");
            let root = tree.attach_shadow(host, ShadowRootMode::Open).unwrap();
            let style = tree.create_element("style");
            let text = tree.create_text(css);
            tree.append_child(style, text).unwrap();
            tree.append_child(root, style).unwrap();
            tree.append_child(container, host).unwrap();
        }
        let table = ScopeTable::extract(&tree, container);
        assert_eq!(table.entries().len(), 2);
    }

    #[test]
    fn test_light_styles_not_folded() {
        let mut tree = DomTree::new();
        let container = tree.create_element("div");
        let style = tree.create_element("style");
        let text = tree.create_text(".a{color:red}");
        tree.append_child(style, text).unwrap();
        tree.append_child(container, style).unwrap();
        let table = ScopeTable::extract(&tree, container);
        assert!(table.is_empty());
    }
}
