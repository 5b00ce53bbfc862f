//! Render a small custom element and print the wire markup.
//!
//! ```sh
//! cargo run -p umbra-ssr --example hello
//! ```

use umbra_dom::{CustomElementDefinition, Document, SetupError};
use umbra_ssr::{render, RenderOptions};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut doc = Document::new();
    doc.define(
        CustomElementDefinition::new("x-hello").on_connected(|doc, id| {
            let setup = |e: umbra_dom::DomError| SetupError::new(e.to_string());
            let root = doc.attach_shadow(id).map_err(setup)?;
            let style = doc.create_element("style");
            let css = doc.create_text(".greeting{font-weight:bold}");
            let span = doc.create_element("span");
            doc.tree.set_attr(span, "class", "greeting").map_err(setup)?;
            let lead = doc.create_text("Hello, ");
            let slot = doc.create_element("slot");
            let fallback = doc.create_text("World");
            let bang = doc.create_text("!");
            doc.tree.append_child(style, css).map_err(setup)?;
            doc.tree.append_child(span, lead).map_err(setup)?;
            doc.tree.append_child(span, slot).map_err(setup)?;
            doc.tree.append_child(slot, fallback).map_err(setup)?;
            doc.tree.append_child(span, bang).map_err(setup)?;
            doc.tree.append_child(root, style).map_err(setup)?;
            doc.tree.append_child(root, span).map_err(setup)
        }),
    )?;

    let host = doc.create_element("x-hello");
    let name = doc.create_text("Rust");
    doc.tree.append_child(host, name)?;

    let opts = RenderOptions {
        debug_format: true,
        ..RenderOptions::default()
    };
    let markup = render(&mut doc, host, opts)?;
    println!("{markup}");
    Ok(())
}
