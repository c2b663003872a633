//! Error types for registry and resolution operations.
//!
//! Element-level structural problems are reported through the problem
//! reporter and skipped; the variants here surface where an operation
//! is fatal to its caller (strict-mode collisions, unresolvable
//! cycles, missing definitions).

use armature_support::rendering::render_chain;
use std::fmt;

/// Main error type for all registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A definition element is structurally invalid (missing required
    /// attribute or value, unparseable scope, ...).
    #[error("{}", .0)]
    MalformedDefinition(MalformedDefinitionError),

    /// An imported resource could not be resolved or loaded.
    #[error("{}", .0)]
    ImportResolution(ImportResolutionError),

    /// An alias chain loops back on itself.
    #[error("{}", .0)]
    AliasCycle(AliasCycleError),

    /// A name or alias clash rejected under the strict collision policy.
    #[error("{}", .0)]
    DefinitionCollision(DefinitionCollisionError),

    /// A constructor-time or prototype-scoped dependency cycle that the
    /// early-reference protocol cannot break.
    #[error("{}", .0)]
    UnresolvableCircularDependency(CircularDependencyError),

    /// No handler is registered for an extension namespace.
    #[error("{}", .0)]
    UnknownNamespace(UnknownNamespaceError),

    /// Requested definition does not exist.
    #[error("{}", .0)]
    DefinitionNotFound(DefinitionNotFoundError),

    /// Abstract definitions are templates and cannot be instantiated.
    #[error(
        "definition '{name}' is abstract and cannot be instantiated\n  \
         Hint: give a concrete child definition its own name and resolve that instead"
    )]
    AbstractDefinition { name: String },
}

/// A structurally invalid definition element.
#[derive(Debug)]
pub struct MalformedDefinitionError {
    pub message: String,
    /// Compact rendering of the offending element, when known.
    pub element: Option<String>,
}

impl MalformedDefinitionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            element: None,
        }
    }

    pub fn in_element(message: impl Into<String>, element: String) -> Self {
        Self {
            message: message.into(),
            element: Some(element),
        }
    }
}

impl fmt::Display for MalformedDefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed definition: {}", self.message)?;
        if let Some(element) = &self.element {
            write!(f, "\n  In element: {element}")?;
        }
        Ok(())
    }
}

/// A resource import that could not be completed.
#[derive(Debug)]
pub struct ImportResolutionError {
    pub location: String,
    pub reason: String,
}

impl fmt::Display for ImportResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to import definitions from [{}]: {}",
            self.location, self.reason
        )
    }
}

/// An alias chain that loops.
#[derive(Debug)]
pub struct AliasCycleError {
    /// The chain of names that forms the loop, e.g. `["a", "b", "a"]`.
    pub chain: Vec<String>,
}

impl fmt::Display for AliasCycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alias cycle detected:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: every alias must eventually reach a canonical definition name"
        )
    }
}

/// A name registration rejected by the collision policy.
#[derive(Debug)]
pub struct DefinitionCollisionError {
    pub name: String,
    pub detail: String,
}

impl fmt::Display for DefinitionCollisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot register '{}': {}", self.name, self.detail)?;
        write!(
            f,
            "\n  Hint: enable overriding on the registry to allow redefinition"
        )
    }
}

/// A dependency cycle the instantiation protocol cannot break.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The chain of definitions under construction, ending at the one
    /// that closed the cycle.
    pub chain: Vec<String>,
    pub reason: String,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unresolvable circular dependency:\n  {}",
            render_chain(&self.chain)
        )?;
        write!(f, "\n  {}", self.reason)?;
        write!(
            f,
            "\n  Hint: reference-based cycles resolve only between singleton definitions wired through properties"
        )
    }
}

/// An extension-vocabulary element with no registered handler.
#[derive(Debug)]
pub struct UnknownNamespaceError {
    pub uri: String,
    pub element: String,
}

impl fmt::Display for UnknownNamespaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no handler registered for namespace [{}]\n  In element: {}",
            self.uri, self.element
        )
    }
}

/// A lookup for a name with no definition behind it.
#[derive(Debug)]
pub struct DefinitionNotFoundError {
    pub name: String,
    /// Similar names that ARE registered (for "did you mean?" output).
    pub suggestions: Vec<String>,
}

impl fmt::Display for DefinitionNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no definition registered under name '{}'", self.name)?;
        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }
        Ok(())
    }
}

/// Convenient Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
