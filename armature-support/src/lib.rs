//! # Armature Support
//!
//! Shared utilities for the Armature registry crates.
//!
//! This crate provides:
//! - Text rendering for error messages (chains, class names, suggestions)

pub mod rendering;
