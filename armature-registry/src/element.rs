//! Abstract configuration element tree.
//!
//! The underlying document parser (XML/DOM or equivalent) is an
//! external collaborator; it hands this crate a tree of [`Element`]
//! values and the reader never sees raw markup. Elements without a
//! namespace belong to the default vocabulary (`beans`, `bean`,
//! `import`, `alias`, ...); namespaced elements are routed to the
//! extension point.

use indexmap::IndexMap;

/// One node in a configuration document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: IndexMap<String, String>,
    children: Vec<Element>,
}

impl Element {
    /// Creates a default-vocabulary element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Creates an element in an extension namespace.
    pub fn in_namespace(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Sets an attribute (builder style).
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Appends a child element (builder style).
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace URI, or `None` for the default vocabulary.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_default_namespace(&self) -> bool {
        self.namespace.is_none()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Children in document order.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Compact one-line rendering used as diagnostic context.
    pub fn describe(&self) -> String {
        let mut out = String::from("<");
        if let Some(ns) = &self.namespace {
            out.push_str(ns);
            out.push(':');
        }
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push_str(&format!(" {key}={value:?}"));
        }
        out.push('>');
        out
    }
}

/// A parsed configuration document: the root element plus the location
/// it was loaded from, needed to resolve relative imports.
#[derive(Debug, Clone)]
pub struct Document {
    location: String,
    root: Element,
}

impl Document {
    pub fn new(location: impl Into<String>, root: Element) -> Self {
        Self {
            location: location.into(),
            root,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}
