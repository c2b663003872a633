//! Definition registry: the authoritative store of definitions,
//! names and aliases.
//!
//! The registry is shared between the document reader (which mutates
//! it while parsing) and the container (which reads it at lookup
//! time). Every structural mutation takes the single internal lock
//! for its duration and nothing more, never across import I/O.

use std::collections::HashMap;

use armature_support::rendering::suggest_similar;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::definition::{Definition, DefinitionHolder};
use crate::error::{
    AliasCycleError, DefinitionCollisionError, DefinitionNotFoundError, MalformedDefinitionError,
    RegistryError, Result,
};

const MAX_SUGGESTIONS: usize = 3;

#[derive(Default)]
struct Inner {
    /// Registration order is iteration order, required for
    /// deterministic downstream initialization.
    definitions: IndexMap<String, Definition>,
    aliases: HashMap<String, String>,
    generated: u64,
}

/// Stores all component definitions and their aliases.
///
/// Collision policy is registry-wide: strict (reject redefinition) or
/// permissive (last write wins with a warning; the original
/// registration slot is kept, so iteration order stays equal to first
/// registration order).
pub struct DefinitionRegistry {
    inner: RwLock<Inner>,
    allow_overriding: bool,
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionRegistry {
    /// Creates a strict registry (duplicate names rejected).
    pub fn new() -> Self {
        Self::with_overriding(false)
    }

    pub fn with_overriding(allow_overriding: bool) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            allow_overriding,
        }
    }

    /// Registers a holder: the definition under its name, then each
    /// alias. Alias failures abort the remaining aliases.
    pub fn register(&self, holder: DefinitionHolder) -> Result<()> {
        self.register_definition(&holder.name, holder.definition)?;
        for alias in &holder.aliases {
            self.register_alias(&holder.name, alias)?;
        }
        Ok(())
    }

    /// Registers a definition under `name`, applying the collision
    /// policy.
    pub fn register_definition(&self, name: &str, definition: Definition) -> Result<()> {
        let mut inner = self.inner.write();

        if inner.aliases.contains_key(name) {
            return Err(RegistryError::DefinitionCollision(DefinitionCollisionError {
                name: name.to_string(),
                detail: "the name is already bound as an alias".into(),
            }));
        }
        if inner.definitions.contains_key(name) {
            if !self.allow_overriding {
                return Err(RegistryError::DefinitionCollision(DefinitionCollisionError {
                    name: name.to_string(),
                    detail: "a definition with this name already exists and overriding is disabled"
                        .into(),
                }));
            }
            warn!(name, "overriding existing definition");
        }

        debug!(name, scope = %definition.effective_scope(), "registered definition");
        inner.definitions.insert(name.to_string(), definition);
        Ok(())
    }

    /// Registers `alias` → `name`.
    ///
    /// An alias equal to its target is dropped silently. Re-binding an
    /// alias to the same target is a no-op; re-binding to a different
    /// target is a hard error. A registration that would close an
    /// alias loop is rejected as a cycle.
    pub fn register_alias(&self, name: &str, alias: &str) -> Result<()> {
        if alias == name {
            debug!(alias, "alias equals target name, ignoring");
            return Ok(());
        }
        let mut inner = self.inner.write();

        if let Some(existing) = inner.aliases.get(alias) {
            if existing == name {
                return Ok(());
            }
            return Err(RegistryError::DefinitionCollision(DefinitionCollisionError {
                name: alias.to_string(),
                detail: format!("the alias is already bound to '{existing}'"),
            }));
        }
        if inner.definitions.contains_key(alias) {
            return Err(RegistryError::DefinitionCollision(DefinitionCollisionError {
                name: alias.to_string(),
                detail: "a definition is already registered under this name".into(),
            }));
        }

        // Would walking from `name` reach `alias`? Then the new entry
        // closes a loop.
        let mut chain = vec![alias.to_string(), name.to_string()];
        let mut current = name;
        while let Some(next) = inner.aliases.get(current) {
            if next == alias {
                chain.push(alias.to_string());
                return Err(RegistryError::AliasCycle(AliasCycleError { chain }));
            }
            chain.push(next.clone());
            current = next;
        }

        debug!(alias, name, "registered alias");
        inner.aliases.insert(alias.to_string(), name.to_string());
        Ok(())
    }

    /// Follows the alias chain from `name` until a canonical name is
    /// reached. Names with no alias entry are their own canonical name
    /// whether or not a definition exists yet.
    pub fn canonical_name(&self, name: &str) -> Result<String> {
        let inner = self.inner.read();
        let mut chain = vec![name.to_string()];
        let mut current = name;
        while let Some(next) = inner.aliases.get(current) {
            if chain.iter().any(|seen| seen == next) {
                chain.push(next.clone());
                return Err(RegistryError::AliasCycle(AliasCycleError { chain }));
            }
            chain.push(next.clone());
            current = next;
        }
        Ok(current.to_string())
    }

    /// Resolves a name or alias to its definition.
    pub fn resolve(&self, name_or_alias: &str) -> Result<Definition> {
        let canonical = self.canonical_name(name_or_alias)?;
        let inner = self.inner.read();
        match inner.definitions.get(&canonical) {
            Some(definition) => Ok(definition.clone()),
            None => Err(self.not_found(&inner, name_or_alias)),
        }
    }

    /// Resolves a name and merges the parent chain: the child wins per
    /// field, constructor arguments replace wholesale, properties and
    /// attributes merge per key.
    pub fn merged_definition(&self, name_or_alias: &str) -> Result<Definition> {
        let mut lineage = vec![self.resolve(name_or_alias)?];
        let mut seen = vec![self.canonical_name(name_or_alias)?];

        while let Some(parent_name) = lineage.last().and_then(|d| d.parent.clone()) {
            let canonical = self.canonical_name(&parent_name)?;
            if seen.contains(&canonical) {
                return Err(RegistryError::MalformedDefinition(
                    MalformedDefinitionError::new(format!(
                        "parent chain of '{name_or_alias}' loops through '{canonical}'"
                    )),
                ));
            }
            seen.push(canonical);
            lineage.push(self.resolve(&parent_name)?);
        }

        // Fold ancestors onto the root of the chain, oldest first.
        let mut merged = lineage.pop().expect("lineage is never empty");
        while let Some(child) = lineage.pop() {
            if child.class_name.is_some() {
                merged.class_name = child.class_name;
            }
            if child.scope.is_some() {
                merged.scope = child.scope;
            }
            if child.lazy_init.is_some() {
                merged.lazy_init = child.lazy_init;
            }
            if child.autowire.is_some() {
                merged.autowire = child.autowire;
            }
            if !child.constructor_args.is_empty() {
                merged.constructor_args = child.constructor_args;
            }
            merged.property_values.extend(child.property_values);
            merged.attributes.extend(child.attributes);
            merged.is_abstract = child.is_abstract;
            if child.source.is_some() {
                merged.source = child.source;
            }
        }
        merged.parent = None;
        Ok(merged)
    }

    /// Mutates a registered definition in place (used by the
    /// escalation resolver).
    pub fn update<F>(&self, name: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Definition),
    {
        let canonical = self.canonical_name(name)?;
        let mut inner = self.inner.write();
        match inner.definitions.get_mut(&canonical) {
            Some(definition) => {
                mutate(definition);
                Ok(())
            }
            None => Err(self.not_found(&inner, name)),
        }
    }

    pub fn has_definition(&self, name: &str) -> bool {
        match self.canonical_name(name) {
            Ok(canonical) => self.inner.read().definitions.contains_key(&canonical),
            Err(_) => false,
        }
    }

    /// Definition names in registration order.
    pub fn definition_names(&self) -> Vec<String> {
        self.inner.read().definitions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().definitions.is_empty()
    }

    /// Generates a unique name for an anonymous definition.
    pub fn generate_name(&self, class_name: &str) -> String {
        let mut inner = self.inner.write();
        loop {
            inner.generated += 1;
            let candidate = format!("{class_name}#{}", inner.generated);
            if !inner.definitions.contains_key(&candidate) && !inner.aliases.contains_key(&candidate)
            {
                return candidate;
            }
        }
    }

    fn not_found(&self, inner: &Inner, name: &str) -> RegistryError {
        let mut known: Vec<String> = inner.definitions.keys().cloned().collect();
        known.extend(inner.aliases.keys().cloned());
        RegistryError::DefinitionNotFound(DefinitionNotFoundError {
            name: name.to_string(),
            suggestions: suggest_similar(name, &known, MAX_SUGGESTIONS),
        })
    }
}
