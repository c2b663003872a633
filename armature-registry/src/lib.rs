//! Core registry and wiring implementation for Armature.

pub mod container;
pub mod definition;
pub mod element;
pub mod env;
pub mod error;
pub mod escalation;
pub mod events;
pub mod instance;
pub mod namespace;
pub mod parser;
pub mod reader;
pub mod registry;
pub mod resource;

pub use container::Container;
pub use definition::{AutowireMode, Definition, DefinitionHolder, Scope, ValueSpec};
pub use element::{Document, Element};
pub use env::{Environment, StandardEnvironment};
pub use error::{RegistryError, Result};
pub use escalation::{apply_proxy_settings, ensure_auto_proxy_creator};
pub use events::{ProblemReporter, ReaderEventListener};
pub use instance::{ComponentInstance, WiredValue};
pub use namespace::{NamespaceHandler, NamespaceHandlerRegistry};
pub use parser::{DefaultElementParser, ElementParser, ParseDefaults};
pub use reader::{DocumentReader, ReaderContext, ReaderHooks};
pub use registry::DefinitionRegistry;
pub use resource::{InMemoryResourceLoader, ResourceLoader};
