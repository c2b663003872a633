//! Document reader: turns one configuration document into registry
//! entries, recursively across nested scopes and imports.
//!
//! Element-level problems (empty import locations, blank aliases,
//! unknown namespaces, malformed beans) are reported through the
//! problem reporter and the reader continues with the remaining
//! siblings. Only registry-level failures surface to the caller of a
//! lookup, never from here.

use std::sync::Arc;

use tracing::{debug, instrument, trace};

use crate::element::{Document, Element};
use crate::env::Environment;
use crate::error::{RegistryError, UnknownNamespaceError};
use crate::events::{ProblemReporter, ReaderEventListener};
use crate::namespace::NamespaceHandlerRegistry;
use crate::parser::{
    ALIAS_ELEMENT, BEAN_ELEMENT, DefaultElementParser, ElementParser, IMPORT_ELEMENT,
    MULTI_VALUE_DELIMITERS, NESTED_SCOPE_ELEMENT, ParseDefaults,
};
use crate::registry::DefinitionRegistry;
use crate::resource::{self, ResourceLoader};

const PROFILE_ATTRIBUTE: &str = "profile";
const RESOURCE_ATTRIBUTE: &str = "resource";

/// Everything a document-reading pass needs: the registry being
/// populated and the external collaborators.
#[derive(Clone)]
pub struct ReaderContext {
    pub registry: Arc<DefinitionRegistry>,
    pub environment: Arc<dyn Environment>,
    pub loader: Arc<dyn ResourceLoader>,
    pub listener: Arc<dyn ReaderEventListener>,
    pub reporter: Arc<dyn ProblemReporter>,
    pub namespaces: Arc<NamespaceHandlerRegistry>,
}

impl ReaderContext {
    /// Reports a non-fatal problem with the offending element as
    /// context.
    pub fn error(&self, message: &str, element: Option<&Element>, cause: Option<&RegistryError>) {
        self.reporter.error(message, element, cause);
    }
}

/// Hooks invoked once per document scope, before and after its
/// children are processed. Default implementations do nothing.
pub trait ReaderHooks: Send + Sync {
    fn pre_process(&self, _root: &Element, _ctx: &ReaderContext) {}

    fn post_process(&self, _root: &Element, _ctx: &ReaderContext) {}
}

struct NoHooks;

impl ReaderHooks for NoHooks {}

/// Recursive-descent reader for the default configuration vocabulary.
pub struct DocumentReader {
    context: ReaderContext,
    parser: Arc<dyn ElementParser>,
    hooks: Arc<dyn ReaderHooks>,
}

impl DocumentReader {
    pub fn new(context: ReaderContext) -> Self {
        Self {
            context,
            parser: Arc::new(DefaultElementParser),
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ElementParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ReaderHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn context(&self) -> &ReaderContext {
        &self.context
    }

    /// Registers every definition in the document.
    #[instrument(skip(self, document), fields(location = %document.location()))]
    pub fn register_definitions(&self, document: &Document) {
        debug!("loading definitions");
        self.do_register(document.root(), document.location(), None);
    }

    /// One document scope. Nested `beans` elements recurse here; the
    /// child defaults chain lives on this call stack, so returning
    /// restores the enclosing scope's defaults (strict push/pop).
    fn do_register(
        &self,
        root: &Element,
        location: &str,
        parent_defaults: Option<&ParseDefaults<'_>>,
    ) {
        if !root.is_default_namespace() {
            self.parse_custom_element(root);
            return;
        }

        if let Some(profile_spec) = root.attribute(PROFILE_ATTRIBUTE) {
            let tokens: Vec<&str> = profile_spec
                .split(MULTI_VALUE_DELIMITERS)
                .filter(|t| !t.is_empty())
                .collect();
            if !tokens.is_empty() && !self.context.environment.accepts_profiles(&tokens) {
                debug!(
                    profiles = profile_spec,
                    "skipped definition subtree, no specified profile is active"
                );
                return;
            }
        }

        let defaults = ParseDefaults::from_element(root, parent_defaults);

        self.hooks.pre_process(root, &self.context);
        self.parse_children(root, location, &defaults);
        self.hooks.post_process(root, &self.context);
    }

    fn parse_children(&self, root: &Element, location: &str, defaults: &ParseDefaults<'_>) {
        for child in root.children() {
            if !child.is_default_namespace() {
                self.parse_custom_element(child);
                continue;
            }
            match child.name() {
                IMPORT_ELEMENT => self.import_resource(child, location),
                ALIAS_ELEMENT => self.process_alias(child),
                BEAN_ELEMENT => self.process_definition(child, location, defaults),
                NESTED_SCOPE_ELEMENT => self.do_register(child, location, Some(defaults)),
                other => trace!(element = other, "ignoring unrecognized default element"),
            }
        }
    }

    /// Loads the document referenced by an `import` element. Any load
    /// failure is reported, not thrown; parsing continues with the
    /// remaining siblings.
    fn import_resource(&self, element: &Element, base_location: &str) {
        let raw = element.attribute(RESOURCE_ATTRIBUTE).unwrap_or("").trim();
        if raw.is_empty() {
            self.context
                .error("resource location must not be empty", Some(element), None);
            return;
        }

        let location = match self.context.environment.resolve_placeholders(raw) {
            Ok(location) => location,
            Err(cause) => {
                self.context.error(
                    "failed to resolve placeholders in import location",
                    Some(element),
                    Some(&cause),
                );
                return;
            }
        };

        let mut resolved = Vec::with_capacity(1);

        if resource::is_absolute(&location) {
            match self.load_import(&location) {
                Ok(()) => {
                    debug!(location, "imported definitions from absolute location");
                    resolved.push(location.clone());
                }
                Err(cause) => self.context.error(
                    &format!("failed to import definitions from [{location}]"),
                    Some(element),
                    Some(&cause),
                ),
            }
        } else {
            // Relative: prefer direct relative resolution, fall back
            // to string-based path joining.
            let candidate = self.context.loader.resolve_relative(base_location, &location);
            let target = if self.context.loader.exists(&candidate) {
                candidate
            } else {
                resource::apply_relative_path(base_location, &location)
            };
            match self.load_import(&target) {
                Ok(()) => {
                    debug!(location, target, "imported definitions from relative location");
                    resolved.push(target);
                }
                Err(cause) => self.context.error(
                    &format!("failed to import definitions from [{location}]"),
                    Some(element),
                    Some(&cause),
                ),
            }
        }

        self.context.listener.import_processed(&location, &resolved);
    }

    fn load_import(&self, location: &str) -> crate::error::Result<()> {
        let document = self.context.loader.load(location)?;
        // Imported documents start their own defaults chain.
        self.register_definitions(&document);
        Ok(())
    }

    fn process_alias(&self, element: &Element) {
        let name = element.attribute("name").unwrap_or("").trim();
        let alias = element.attribute("alias").unwrap_or("").trim();
        let mut valid = true;
        if name.is_empty() {
            self.context.error("name must not be empty", Some(element), None);
            valid = false;
        }
        if alias.is_empty() {
            self.context.error("alias must not be empty", Some(element), None);
            valid = false;
        }
        if !valid {
            return;
        }
        match self.context.registry.register_alias(name, alias) {
            Ok(()) => self.context.listener.alias_registered(name, alias),
            Err(cause) => self.context.error(
                &format!("failed to register alias '{alias}' for '{name}'"),
                Some(element),
                Some(&cause),
            ),
        }
    }

    fn process_definition(&self, element: &Element, location: &str, defaults: &ParseDefaults<'_>) {
        match self
            .parser
            .parse_definition(element, defaults, &self.context.registry)
        {
            Ok(mut holder) => {
                holder.definition.source = Some(location.to_string());
                let holder = self.decorate_if_required(element, holder);
                self.register_holder(holder, element);
            }
            Err(cause) => self.context.error(
                "failed to parse definition element",
                Some(element),
                Some(&cause),
            ),
        }
    }

    /// Runs the holder through the handler of every custom-namespace
    /// child, which may wrap or replace the definition.
    fn decorate_if_required(
        &self,
        element: &Element,
        mut holder: crate::definition::DefinitionHolder,
    ) -> crate::definition::DefinitionHolder {
        for child in element.children().iter().filter(|c| !c.is_default_namespace()) {
            let uri = child.namespace().unwrap_or_default();
            match self.context.namespaces.resolve(uri) {
                Some(handler) => holder = handler.decorate(child, holder, &self.context),
                None => self.report_unknown_namespace(uri, child),
            }
        }
        holder
    }

    fn parse_custom_element(&self, element: &Element) {
        let uri = element.namespace().unwrap_or_default();
        let Some(handler) = self.context.namespaces.resolve(uri) else {
            self.report_unknown_namespace(uri, element);
            return;
        };
        match handler.parse(element, &self.context) {
            Ok(Some(holder)) => self.register_holder(holder, element),
            Ok(None) => {}
            Err(cause) => self.context.error(
                "namespace handler failed to parse element",
                Some(element),
                Some(&cause),
            ),
        }
    }

    fn report_unknown_namespace(&self, uri: &str, element: &Element) {
        let cause = RegistryError::UnknownNamespace(UnknownNamespaceError {
            uri: uri.to_string(),
            element: element.describe(),
        });
        self.context.error(
            &format!("no handler registered for namespace [{uri}]"),
            Some(element),
            Some(&cause),
        );
    }

    fn register_holder(
        &self,
        holder: crate::definition::DefinitionHolder,
        element: &Element,
    ) {
        let name = holder.name.clone();
        match self.context.registry.register(holder) {
            Ok(()) => self.context.listener.component_registered(&name),
            Err(cause) => self.context.error(
                &format!("failed to register definition '{name}'"),
                Some(element),
                Some(&cause),
            ),
        }
    }
}
