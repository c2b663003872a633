//! Component definition model.
//!
//! A [`Definition`] is the declarative blueprint for one named
//! component: its scope, constructor arguments, property values and
//! metadata. Definitions are pure data; instantiation lives in
//! [`crate::container`].

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Lifecycle policy for instances produced from a definition.
///
/// # Examples
/// ```
/// use armature_registry::definition::Scope;
///
/// assert!(Scope::Singleton.is_singleton());
/// assert!(!Scope::Prototype.is_singleton());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Scope {
    /// One shared instance, created at most once and cached for the
    /// registry's lifetime.
    #[default]
    Singleton,

    /// A fresh instance on every resolution request, never cached.
    Prototype,
}

impl Scope {
    #[inline]
    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }

    #[inline]
    pub fn is_prototype(&self) -> bool {
        matches!(self, Scope::Prototype)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "singleton"),
            Scope::Prototype => write!(f, "prototype"),
        }
    }
}

/// A value-or-reference spec for a constructor argument or property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValueSpec {
    /// A literal value. Type conversion is an external concern; the
    /// registry carries values as strings.
    Value(String),
    /// A reference to another definition by name or alias.
    Ref(String),
    /// An ordered collection of nested specs.
    List(Vec<ValueSpec>),
}

impl ValueSpec {
    pub fn value(v: impl Into<String>) -> Self {
        ValueSpec::Value(v.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        ValueSpec::Ref(name.into())
    }
}

/// Wiring mode applied when a definition does not list its
/// dependencies explicitly. Carried through parsing for external
/// autowiring machinery; the core resolver only wires explicit specs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AutowireMode {
    #[default]
    No,
    ByName,
    ByType,
}

/// Declarative blueprint for constructing one named component.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Definition {
    /// Implementation class name (opaque to the registry, ranked by
    /// the escalation resolver).
    pub class_name: Option<String>,
    /// `None` inherits from the parent definition, defaulting to
    /// singleton.
    pub scope: Option<Scope>,
    /// `None` inherits; resolved against the parse-defaults chain.
    pub lazy_init: Option<bool>,
    pub autowire: Option<AutowireMode>,
    /// Template-only definition; never instantiated.
    pub is_abstract: bool,
    /// Name of a definition to inherit unset fields from.
    pub parent: Option<String>,
    /// Ordered constructor argument specs.
    pub constructor_args: Vec<ValueSpec>,
    /// Property name → spec. Insertion order is kept for stable
    /// diagnostics only; wiring semantics do not depend on it.
    pub property_values: IndexMap<String, ValueSpec>,
    /// Arbitrary string metadata from `<meta>` entries.
    pub attributes: IndexMap<String, String>,
    /// Provenance (document location) for diagnostics.
    pub source: Option<String>,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            ..Self::default()
        }
    }

    // Builder-style helpers, used by tests and namespace handlers.

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn constructor_arg(mut self, spec: ValueSpec) -> Self {
        self.constructor_args.push(spec);
        self
    }

    pub fn property(mut self, name: impl Into<String>, spec: ValueSpec) -> Self {
        self.property_values.insert(name.into(), spec);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The scope this definition resolves to once inheritance is done.
    pub fn effective_scope(&self) -> Scope {
        self.scope.unwrap_or_default()
    }
}

/// A parsed definition together with its registered name and aliases.
#[derive(Debug, Clone)]
pub struct DefinitionHolder {
    pub name: String,
    pub aliases: Vec<String>,
    pub definition: Definition,
}

impl DefinitionHolder {
    pub fn new(name: impl Into<String>, definition: Definition) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            definition,
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }
}
