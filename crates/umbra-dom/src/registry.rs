//! Custom Elements
//!
//! Custom element registry with explicit lifecycle callbacks. Callbacks are
//! plain closures invoked by [`crate::Document`]; tree primitives are never
//! intercepted.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{Document, DomError, NodeId, SetupError};

/// Callback fired when a defined element becomes connected.
///
/// May mutate the document (attach shadow roots, append children) or
/// schedule deferred tasks via [`Document::schedule`].
pub type ConnectedCallback = Rc<dyn Fn(&mut Document, NodeId) -> Result<(), SetupError>>;

/// Callback fired when a previously connected element is disconnected.
pub type DisconnectedCallback = Rc<dyn Fn(&mut Document, NodeId)>;

/// Custom element definition
#[derive(Clone)]
pub struct CustomElementDefinition {
    pub name: String,
    pub connected: Option<ConnectedCallback>,
    pub disconnected: Option<DisconnectedCallback>,
}

impl CustomElementDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            connected: None,
            disconnected: None,
        }
    }

    pub fn on_connected(
        mut self,
        callback: impl Fn(&mut Document, NodeId) -> Result<(), SetupError> + 'static,
    ) -> Self {
        self.connected = Some(Rc::new(callback));
        self
    }

    pub fn on_disconnected(mut self, callback: impl Fn(&mut Document, NodeId) + 'static) -> Self {
        self.disconnected = Some(Rc::new(callback));
        self
    }
}

impl fmt::Debug for CustomElementDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomElementDefinition")
            .field("name", &self.name)
            .field("connected", &self.connected.is_some())
            .field("disconnected", &self.disconnected.is_some())
            .finish()
    }
}

/// Custom elements registry
#[derive(Debug, Default)]
pub struct CustomElementRegistry {
    definitions: HashMap<String, CustomElementDefinition>,
}

impl CustomElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a custom element
    pub fn define(&mut self, definition: CustomElementDefinition) -> Result<(), DomError> {
        let name = definition.name.clone();
        if !Self::is_valid_name(&name) {
            return Err(DomError::InvalidName(name));
        }
        if self.definitions.contains_key(&name) {
            return Err(DomError::AlreadyDefined(name));
        }
        self.definitions.insert(name, definition);
        Ok(())
    }

    /// Get element definition
    pub fn get(&self, name: &str) -> Option<&CustomElementDefinition> {
        self.definitions.get(name)
    }

    /// Check if element is defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Validate custom element name
    fn is_valid_name(name: &str) -> bool {
        // Must contain hyphen
        if !name.contains('-') {
            return false;
        }

        // Must start with lowercase letter
        if !name
            .chars()
            .next()
            .map(|c| c.is_ascii_lowercase())
            .unwrap_or(false)
        {
            return false;
        }

        // Reserved names
        let reserved = [
            "annotation-xml",
            "color-profile",
            "font-face",
            "font-face-src",
            "font-face-uri",
            "font-face-format",
            "font-face-name",
            "missing-glyph",
        ];
        !reserved.contains(&name)
    }
}
