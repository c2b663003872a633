//! The container builds live instances from registered definitions.
//!
//! # Instantiation protocol
//! A definition under construction moves through
//! `Unstarted → InProgress → Completed` (or `Failed`). While a
//! definition is in progress on the current call stack, a reference
//! back to it is a cycle, resolved by position:
//!
//! - constructor argument → unresolvable, always;
//! - property wiring of a singleton that has already exposed its
//!   early reference → the early `Arc` is handed out and resolves to
//!   the identical final instance;
//! - anything involving a prototype-scoped member → unresolvable.
//!
//! Singletons are additionally guarded across threads: at most one
//! construction per name, concurrent requesters block until the first
//! completes and then reuse the cache.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, info, instrument, trace};

use crate::definition::{Definition, Scope, ValueSpec};
use crate::error::{CircularDependencyError, RegistryError, Result};
use crate::instance::{ComponentInstance, WiredValue};
use crate::registry::DefinitionRegistry;

/// Why a value is being resolved; decides how cycles are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Constructor,
    Property,
}

/// This thread's definitions currently under construction, in order.
#[derive(Default)]
struct ResolutionStack {
    frames: Vec<(String, Scope)>,
}

impl ResolutionStack {
    fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|(n, _)| n == name)
    }

    fn push(&mut self, name: &str, scope: Scope) {
        self.frames.push((name.to_string(), scope));
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// The cycle slice: frames from the first occurrence of `target`
    /// to the top, closed by `target` again.
    fn cycle_through(&self, target: &str) -> Vec<(String, Scope)> {
        let start = self
            .frames
            .iter()
            .position(|(n, _)| n == target)
            .unwrap_or(0);
        self.frames[start..].to_vec()
    }
}

/// Thread-safe instance container over a [`DefinitionRegistry`].
pub struct Container {
    registry: Arc<DefinitionRegistry>,
    /// Completed singletons, cached for the registry's lifetime.
    singletons: DashMap<String, Arc<ComponentInstance>>,
    /// Forward handles to singletons whose properties are still being
    /// wired. Entries exist only while their creator is on some call
    /// stack; they never outlive the cyclic group's resolution.
    early_refs: Mutex<HashMap<String, Arc<ComponentInstance>>>,
    /// Serializes singleton creation container-wide. Held for the
    /// whole outermost creation; nested creations on the same call
    /// stack re-enter. A per-name guard would let two threads entering
    /// one setter cycle from different members each wait on the
    /// other's name forever.
    creation_lock: ReentrantMutex<()>,
    /// How many times each definition's constructor path ran.
    creation_counts: DashMap<String, u64>,
}

impl Container {
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            registry,
            singletons: DashMap::new(),
            early_refs: Mutex::new(HashMap::new()),
            creation_lock: ReentrantMutex::new(()),
            creation_counts: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    /// Resolves a name or alias to a live instance, constructing it
    /// (and its dependencies) as needed.
    pub fn get(&self, name: &str) -> Result<Arc<ComponentInstance>> {
        let mut stack = ResolutionStack::default();
        self.resolve_named(name, &mut stack, Position::Property)
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        match self.registry.canonical_name(name) {
            Ok(canonical) => self.singletons.contains_key(&canonical),
            Err(_) => false,
        }
    }

    /// How many times the given definition was constructed.
    pub fn creation_count(&self, name: &str) -> u64 {
        self.registry
            .canonical_name(name)
            .ok()
            .and_then(|canonical| self.creation_counts.get(&canonical).map(|c| *c))
            .unwrap_or(0)
    }

    /// Eagerly constructs every non-lazy, non-abstract singleton, in
    /// registration order.
    #[instrument(skip(self))]
    pub fn instantiate_singletons(&self) -> Result<()> {
        let names = self.registry.definition_names();
        info!(definitions = names.len(), "pre-instantiating singletons");
        for name in names {
            let definition = self.registry.merged_definition(&name)?;
            if definition.is_abstract
                || !definition.effective_scope().is_singleton()
                || definition.lazy_init.unwrap_or(false)
            {
                continue;
            }
            self.get(&name)?;
        }
        Ok(())
    }

    fn resolve_named(
        &self,
        name: &str,
        stack: &mut ResolutionStack,
        position: Position,
    ) -> Result<Arc<ComponentInstance>> {
        let canonical = self.registry.canonical_name(name)?;

        if let Some(existing) = self.singletons.get(&canonical) {
            return Ok(existing.clone());
        }

        if stack.contains(&canonical) {
            return self.handle_cycle(&canonical, stack, position);
        }

        let definition = self.registry.merged_definition(&canonical)?;
        if definition.is_abstract {
            return Err(RegistryError::AbstractDefinition { name: canonical });
        }

        match definition.effective_scope() {
            Scope::Prototype => {
                trace!(name = canonical, "creating prototype instance");
                self.create_instance(&canonical, &definition, stack, false)
            }
            Scope::Singleton => self.resolve_singleton(&canonical, &definition, stack),
        }
    }

    /// Applies the cycle-resolution policy when `canonical` is already
    /// under construction on this call stack.
    ///
    /// The positional rule is strict: a constructor-position reference
    /// fails even when the target has already exposed an early
    /// reference. Constructor arguments are part of an instance's
    /// identity and never observe a partially built peer.
    fn handle_cycle(
        &self,
        canonical: &str,
        stack: &ResolutionStack,
        position: Position,
    ) -> Result<Arc<ComponentInstance>> {
        let cycle = stack.cycle_through(canonical);
        let target_scope = self
            .registry
            .merged_definition(canonical)?
            .effective_scope();

        let reason = if target_scope.is_prototype()
            || cycle.iter().any(|(_, scope)| scope.is_prototype())
        {
            "a prototype-scoped definition participates in the cycle, so no instance can be \
             cached to break it"
        } else if position == Position::Constructor {
            "constructor arguments cannot be satisfied by a partially built instance"
        } else if let Some(early) = self.early_refs.lock().get(canonical) {
            trace!(name = canonical, "handing out early reference");
            return Ok(early.clone());
        } else {
            "the referenced definition has not exposed an instance yet"
        };

        let mut chain: Vec<String> = cycle.into_iter().map(|(n, _)| n).collect();
        chain.push(canonical.to_string());
        Err(RegistryError::UnresolvableCircularDependency(
            CircularDependencyError {
                chain,
                reason: reason.into(),
            },
        ))
    }

    /// Singleton path: at most one construction per name, process-wide.
    fn resolve_singleton(
        &self,
        canonical: &str,
        definition: &Definition,
        stack: &mut ResolutionStack,
    ) -> Result<Arc<ComponentInstance>> {
        let _creation = self.creation_lock.lock();

        // A concurrent requester arrives here only after the creation
        // that beat it has fully completed.
        if let Some(existing) = self.singletons.get(canonical) {
            return Ok(existing.clone());
        }

        let result = self.create_instance(canonical, definition, stack, true);

        if let Ok(instance) = &result {
            self.singletons.insert(canonical.to_string(), instance.clone());
            debug!(name = canonical, "singleton cached");
        }
        self.early_refs.lock().remove(canonical);

        result
    }

    /// Builds one instance: constructor arguments strictly first, then
    /// (for singletons) early-reference exposure, then property wiring.
    fn create_instance(
        &self,
        canonical: &str,
        definition: &Definition,
        stack: &mut ResolutionStack,
        expose_early: bool,
    ) -> Result<Arc<ComponentInstance>> {
        *self
            .creation_counts
            .entry(canonical.to_string())
            .or_insert(0) += 1;

        stack.push(canonical, definition.effective_scope());
        let built = self.populate(canonical, definition, stack, expose_early);
        stack.pop();

        if built.is_err() {
            // Failed constructions must not leave a partial instance
            // visible anywhere.
            self.early_refs.lock().remove(canonical);
        }
        built
    }

    fn populate(
        &self,
        canonical: &str,
        definition: &Definition,
        stack: &mut ResolutionStack,
        expose_early: bool,
    ) -> Result<Arc<ComponentInstance>> {
        let mut args = Vec::with_capacity(definition.constructor_args.len());
        for spec in &definition.constructor_args {
            args.push(self.resolve_value(spec, stack, Position::Constructor)?);
        }

        let instance = Arc::new(ComponentInstance::new(
            canonical,
            definition.class_name.clone(),
            args,
        ));

        if expose_early {
            self.early_refs
                .lock()
                .insert(canonical.to_string(), instance.clone());
            trace!(name = canonical, "early reference exposed");
        }

        for (property, spec) in &definition.property_values {
            let value = self.resolve_value(spec, stack, Position::Property)?;
            instance.set_property(property.clone(), value);
        }

        Ok(instance)
    }

    fn resolve_value(
        &self,
        spec: &ValueSpec,
        stack: &mut ResolutionStack,
        position: Position,
    ) -> Result<WiredValue> {
        match spec {
            ValueSpec::Value(value) => Ok(WiredValue::Value(value.clone())),
            ValueSpec::Ref(target) => Ok(WiredValue::Ref(
                self.resolve_named(target, stack, position)?,
            )),
            ValueSpec::List(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    resolved.push(self.resolve_value(item, stack, position)?);
                }
                Ok(WiredValue::List(resolved))
            }
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("definitions", &self.registry.len())
            .field("singletons", &self.singletons.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<DefinitionRegistry> {
        Arc::new(DefinitionRegistry::new())
    }

    fn register(registry: &DefinitionRegistry, name: &str, definition: Definition) {
        registry.register_definition(name, definition).unwrap();
    }

    #[test]
    fn singleton_cached_and_identical() {
        let reg = registry();
        register(&reg, "a", Definition::new());
        let container = Container::new(reg);

        let first = container.get("a").unwrap();
        let second = container.get("a").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(container.creation_count("a"), 1);
        assert!(container.contains_singleton("a"));
    }

    #[test]
    fn prototype_fresh_every_time() {
        let reg = registry();
        register(&reg, "p", Definition::new().with_scope(Scope::Prototype));
        let container = Container::new(reg);

        let first = container.get("p").unwrap();
        let second = container.get("p").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(container.creation_count("p"), 2);
        assert!(!container.contains_singleton("p"));
    }

    #[test]
    fn wires_values_and_references() {
        let reg = registry();
        register(&reg, "dataSource", Definition::of_class("app.DataSource"));
        register(
            &reg,
            "repo",
            Definition::new()
                .constructor_arg(ValueSpec::reference("dataSource"))
                .constructor_arg(ValueSpec::value("users"))
                .property("timeout", ValueSpec::value("30")),
        );
        let container = Container::new(reg);

        let repo = container.get("repo").unwrap();
        let ds = container.get("dataSource").unwrap();
        assert!(Arc::ptr_eq(repo.constructor_args()[0].as_instance().unwrap(), &ds));
        assert_eq!(repo.constructor_args()[1].as_str(), Some("users"));
        assert_eq!(
            repo.property("timeout").and_then(|v| v.as_str().map(String::from)),
            Some("30".to_string())
        );
    }

    #[test]
    fn resolves_through_alias() {
        let reg = registry();
        register(&reg, "dataSource", Definition::new());
        reg.register_alias("dataSource", "ds").unwrap();
        let container = Container::new(reg);

        let via_alias = container.get("ds").unwrap();
        let direct = container.get("dataSource").unwrap();
        assert!(Arc::ptr_eq(&via_alias, &direct));
    }

    #[test]
    fn missing_definition_fails() {
        let container = Container::new(registry());
        assert!(matches!(
            container.get("ghost"),
            Err(RegistryError::DefinitionNotFound(_))
        ));
    }

    #[test]
    fn abstract_definition_rejected() {
        let reg = registry();
        let mut def = Definition::new();
        def.is_abstract = true;
        register(&reg, "template", def);
        let container = Container::new(reg);

        assert!(matches!(
            container.get("template"),
            Err(RegistryError::AbstractDefinition { .. })
        ));
    }

    // Cycle protocol.

    fn setter_cycle(reg: &DefinitionRegistry) {
        register(reg, "a", Definition::new().property("b", ValueSpec::reference("b")));
        register(reg, "b", Definition::new().property("c", ValueSpec::reference("c")));
        register(reg, "c", Definition::new().property("a", ValueSpec::reference("a")));
    }

    #[test]
    fn setter_cycle_resolves_with_consistent_back_references() {
        let reg = registry();
        setter_cycle(&reg);
        let container = Container::new(reg);

        let a = container.get("a").unwrap();
        let b = container.get("b").unwrap();
        let c = container.get("c").unwrap();

        assert!(Arc::ptr_eq(&a.reference("b").unwrap(), &b));
        assert!(Arc::ptr_eq(&b.reference("c").unwrap(), &c));
        assert!(Arc::ptr_eq(&c.reference("a").unwrap(), &a));
        assert_eq!(container.creation_count("a"), 1);
        assert_eq!(container.creation_count("b"), 1);
        assert_eq!(container.creation_count("c"), 1);
    }

    #[test]
    fn constructor_cycle_rejected_from_every_entry_point() {
        let reg = registry();
        register(&reg, "a", Definition::new().constructor_arg(ValueSpec::reference("b")));
        register(&reg, "b", Definition::new().constructor_arg(ValueSpec::reference("c")));
        register(&reg, "c", Definition::new().constructor_arg(ValueSpec::reference("a")));
        let container = Container::new(reg);

        for name in ["a", "b", "c"] {
            match container.get(name) {
                Err(RegistryError::UnresolvableCircularDependency(err)) => {
                    assert!(err.chain.len() >= 4);
                    assert!(err.reason.contains("constructor"));
                }
                other => panic!("expected cycle error for '{name}', got: {other:?}"),
            }
            assert!(!container.contains_singleton(name));
        }
    }

    #[test]
    fn mixed_cycle_with_constructor_edge_rejected() {
        // a --property--> b --constructor--> a
        let reg = registry();
        register(&reg, "a", Definition::new().property("b", ValueSpec::reference("b")));
        register(&reg, "b", Definition::new().constructor_arg(ValueSpec::reference("a")));
        let container = Container::new(reg);

        assert!(matches!(
            container.get("a"),
            Err(RegistryError::UnresolvableCircularDependency(_))
        ));
    }

    #[test]
    fn prototype_member_poisons_setter_cycle() {
        for prototype_member in ["a", "b", "c"] {
            let reg = registry();
            setter_cycle(&reg);
            reg.update(prototype_member, |def| def.scope = Some(Scope::Prototype))
                .unwrap();
            let container = Container::new(reg);

            for name in ["a", "b", "c"] {
                match container.get(name) {
                    Err(RegistryError::UnresolvableCircularDependency(err)) => {
                        assert!(err.reason.contains("prototype"));
                    }
                    other => panic!(
                        "expected cycle error for '{name}' with prototype '{prototype_member}', \
                         got: {other:?}"
                    ),
                }
            }
        }
    }

    #[test]
    fn failed_construction_is_not_cached() {
        let reg = registry();
        register(
            &reg,
            "broken",
            Definition::new().property("dep", ValueSpec::reference("ghost")),
        );
        let container = Container::new(reg);

        assert!(container.get("broken").is_err());
        assert!(!container.contains_singleton("broken"));

        // The name is fully released: a later attempt fails the same
        // way instead of finding a stale partial instance.
        assert!(matches!(
            container.get("broken"),
            Err(RegistryError::DefinitionNotFound(_))
        ));
    }

    #[test]
    fn early_reference_not_visible_after_resolution() {
        let reg = registry();
        setter_cycle(&reg);
        let container = Container::new(reg);
        container.get("a").unwrap();
        assert!(container.early_refs.lock().is_empty());
    }

    #[test]
    fn instantiate_singletons_in_registration_order() {
        let reg = registry();
        register(&reg, "second", Definition::new().property("first", ValueSpec::reference("first")));
        register(&reg, "first", Definition::new());
        register(&reg, "lazy", {
            let mut def = Definition::new();
            def.lazy_init = Some(true);
            def
        });
        register(&reg, "proto", Definition::new().with_scope(Scope::Prototype));
        let container = Container::new(reg);

        container.instantiate_singletons().unwrap();
        assert!(container.contains_singleton("second"));
        assert!(container.contains_singleton("first"));
        assert!(!container.contains_singleton("lazy"));
        assert!(!container.contains_singleton("proto"));
        assert_eq!(container.creation_count("lazy"), 0);
    }

    #[test]
    fn concurrent_entries_into_setter_cycle_both_complete() {
        use std::thread;

        // Two threads resolve opposite members of an a <-> b setter
        // cycle. Whichever creation starts first must run the whole
        // cycle to completion while the other blocks, so both lookups
        // return and agree on the cached instances. Repeated because
        // the failure mode depends on thread interleaving.
        for _ in 0..50 {
            let reg = registry();
            register(&reg, "a", Definition::new().property("b", ValueSpec::reference("b")));
            register(&reg, "b", Definition::new().property("a", ValueSpec::reference("a")));
            let container = Arc::new(Container::new(reg));

            let from_a = {
                let container = container.clone();
                thread::spawn(move || container.get("a").unwrap())
            };
            let from_b = {
                let container = container.clone();
                thread::spawn(move || container.get("b").unwrap())
            };

            let a = from_a.join().unwrap();
            let b = from_b.join().unwrap();
            assert!(Arc::ptr_eq(&a.reference("b").unwrap(), &b));
            assert!(Arc::ptr_eq(&b.reference("a").unwrap(), &a));
            assert_eq!(container.creation_count("a"), 1);
            assert_eq!(container.creation_count("b"), 1);
        }
    }

    #[test]
    fn concurrent_lookups_construct_singleton_once() {
        use std::thread;

        let reg = registry();
        register(&reg, "shared", Definition::new());
        let container = Arc::new(Container::new(reg));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let container = container.clone();
                thread::spawn(move || container.get("shared").unwrap())
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for instance in &instances[1..] {
            assert!(Arc::ptr_eq(instance, &instances[0]));
        }
        assert_eq!(container.creation_count("shared"), 1);
    }
}
