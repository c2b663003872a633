//! Extension point for non-default element vocabularies.
//!
//! Each namespace URI registers exactly one handler. The document
//! reader routes standalone custom elements to [`NamespaceHandler::parse`]
//! and custom children under a default-vocabulary `bean` element to
//! [`NamespaceHandler::decorate`], without knowing their syntax.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::definition::DefinitionHolder;
use crate::element::Element;
use crate::error::Result;
use crate::reader::ReaderContext;

/// Handler for one extension vocabulary.
pub trait NamespaceHandler: Send + Sync {
    /// Parses a standalone custom element. Returning `Ok(None)` means
    /// the element produced registrations through side effects (e.g.
    /// escalation) rather than a holder of its own.
    fn parse(&self, element: &Element, ctx: &ReaderContext) -> Result<Option<DefinitionHolder>>;

    /// Decorates a definition holder when a custom child element
    /// appears under a default-vocabulary element. May wrap or replace
    /// the definition.
    fn decorate(
        &self,
        _element: &Element,
        holder: DefinitionHolder,
        _ctx: &ReaderContext,
    ) -> DefinitionHolder {
        holder
    }
}

/// Namespace URI → handler lookup table.
#[derive(Default)]
pub struct NamespaceHandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn NamespaceHandler>>>,
}

impl NamespaceHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, uri: impl Into<String>, handler: Arc<dyn NamespaceHandler>) {
        let uri = uri.into();
        debug!(uri, "registered namespace handler");
        self.handlers.write().insert(uri, handler);
    }

    pub fn resolve(&self, uri: &str) -> Option<Arc<dyn NamespaceHandler>> {
        self.handlers.read().get(uri).cloned()
    }
}
