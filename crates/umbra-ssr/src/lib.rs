//! umbra-ssr - server-side rendering for shadow-DOM trees
//!
//! Renders a tree whose elements may encapsulate subtrees behind shadow
//! boundaries into one self-contained markup string, plus a small client
//! script that reconstructs the real boundaries after parse.
//!
//! ```
//! use umbra_dom::{CustomElementDefinition, Document, SetupError};
//! use umbra_ssr::{render, RenderOptions};
//!
//! let mut doc = Document::new();
//! doc.define(CustomElementDefinition::new("x-hello").on_connected(|doc, id| {
//!     let root = doc.attach_shadow(id).map_err(|e| SetupError::new(e.to_string()))?;
//!     let text = doc.create_text("Hello");
//!     doc.tree
//!         .append_child(root, text)
//!         .map_err(|e| SetupError::new(e.to_string()))
//! }))?;
//!
//! let host = doc.create_element("x-hello");
//! let markup = render(&mut doc, host, RenderOptions::default())?;
//! assert!(markup.contains("<shadow-root>Hello</shadow-root>"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod rehydrate;
pub mod render;
pub mod serialize;
pub mod slot;
pub mod style;

pub use error::RenderError;
pub use rehydrate::{client_script, rehydrate};
pub use render::{
    begin_render, complete_render, render, DrainTasks, RenderMode, RenderOptions, RenderToken,
    SchedulingBarrier, DEFAULT_FUNC_NAME,
};
pub use serialize::{DEFAULT_MARKER, SHADOW_WRAPPER_TAG};
pub use slot::Projection;
pub use style::{ScopeId, ScopeTable, StyleEntry};
