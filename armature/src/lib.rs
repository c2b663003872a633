//! # Armature: declarative component registry for Rust
//!
//! Reads hierarchical configuration documents into a registry of named
//! component definitions and wires the resulting object graph on
//! demand, with singleton/prototype scoping and circular-dependency
//! resolution.

pub use armature_registry::*;
pub use armature_support::*;
