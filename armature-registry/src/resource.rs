//! Resource loader collaborator.
//!
//! Imports reference other configuration documents by location string.
//! Fetching and parsing them is external; this crate only classifies
//! locations as absolute or relative and asks the loader for the
//! already-parsed [`Document`].

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::element::{Document, Element};
use crate::error::{ImportResolutionError, RegistryError, Result};

/// Loads configuration documents by location.
pub trait ResourceLoader: Send + Sync {
    /// Loads and parses the document at `location`.
    fn load(&self, location: &str) -> Result<Document>;

    /// Resolves `relative` against the location of the importing
    /// document.
    fn resolve_relative(&self, base: &str, relative: &str) -> String;

    /// Whether a document exists at `location`.
    fn exists(&self, location: &str) -> bool;
}

/// Whether a location names a resource directly (URL scheme or
/// filesystem-absolute path) rather than relative to the importing
/// document.
pub fn is_absolute(location: &str) -> bool {
    location.contains("://") || location.starts_with('/')
}

/// String-based fallback for relative resolution: replaces the last
/// path segment of `base` with `relative`.
pub fn apply_relative_path(base: &str, relative: &str) -> String {
    match base.rfind('/') {
        Some(idx) => format!("{}/{}", &base[..idx], relative),
        None => relative.to_string(),
    }
}

/// In-memory loader keyed by exact location, used by tests and
/// embedders that assemble element trees programmatically.
#[derive(Default)]
pub struct InMemoryResourceLoader {
    documents: RwLock<HashMap<String, Element>>,
}

impl InMemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the document root reachable under `location`.
    pub fn put(&self, location: impl Into<String>, root: Element) {
        self.documents.write().insert(location.into(), root);
    }
}

impl ResourceLoader for InMemoryResourceLoader {
    fn load(&self, location: &str) -> Result<Document> {
        match self.documents.read().get(location) {
            Some(root) => Ok(Document::new(location, root.clone())),
            None => Err(RegistryError::ImportResolution(ImportResolutionError {
                location: location.to_string(),
                reason: "resource does not exist".into(),
            })),
        }
    }

    fn resolve_relative(&self, base: &str, relative: &str) -> String {
        apply_relative_path(base, relative)
    }

    fn exists(&self, location: &str) -> bool {
        self.documents.read().contains_key(location)
    }
}
