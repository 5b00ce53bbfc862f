//! Parser integration tests
//!
//! Structural checks over the converted arena.

use umbra_html::parse;

#[test]
fn test_parse_minimal_html() {
    let doc = parse("");
    assert!(doc.tree.len() >= 1, "even empty HTML should have a root");
    assert!(doc.document_element().is_some());
}

#[test]
fn test_parse_skeleton_located() {
    let doc = parse("<html><head><title>t</title></head><body><p>x</p></body></html>");
    assert!(doc.head().is_some());
    assert!(doc.body().is_some());
}

#[test]
fn test_bare_fragment_lands_in_body() {
    let doc = parse(r#"<x-hello name="a">World</x-hello>"#);
    let body = doc.body().expect("body");
    let hosts = doc.tree.find_elements(body, "x-hello");
    assert_eq!(hosts.len(), 1);
    assert_eq!(doc.tree.attr(hosts[0], "name"), Some("a"));
    assert_eq!(doc.tree.text_content(hosts[0]), "World");
}

#[test]
fn test_attributes_preserved_in_order() {
    let doc = parse(r#"<div id="a" class="b c" data-x="1"></div>"#);
    let body = doc.body().expect("body");
    let div = doc.tree.find_elements(body, "div")[0];
    let node = doc.tree.get(div).expect("div node");
    let element = node.as_element().expect("element");
    let names: Vec<&str> = element.attrs.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["id", "class", "data-x"]);
}

#[test]
fn test_script_content_is_raw_text() {
    let doc = parse("<body><script>__ssr()</script></body>");
    let body = doc.body().expect("body");
    let script = doc.tree.find_elements(body, "script")[0];
    assert_eq!(doc.tree.text_content(script), "__ssr()");
}

#[test]
fn test_custom_wrapper_tags_survive() {
    let doc = parse("<x-a><shadow-root><slot default=\"\">f</slot></shadow-root></x-a>");
    let body = doc.body().expect("body");
    let wrappers = doc.tree.find_elements(body, "shadow-root");
    assert_eq!(wrappers.len(), 1);
    let slots = doc.tree.find_elements(wrappers[0], "slot");
    assert_eq!(slots.len(), 1);
    assert!(doc.tree.attr(slots[0], "default").is_some());
}

#[test]
fn test_malformed_html_does_not_panic() {
    let doc = parse("<div><p>unclosed <span>nested");
    assert!(doc.tree.len() > 3);
}
