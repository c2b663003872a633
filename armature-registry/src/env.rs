//! Environment collaborator: placeholder expansion and profile matching.
//!
//! The reader consults the environment when expanding `${...}`
//! placeholders in import locations and when deciding whether a
//! profile-filtered subtree should be registered at all.

use std::collections::{HashMap, HashSet};

use crate::error::{MalformedDefinitionError, RegistryError, Result};

/// Abstraction over the configuration environment.
pub trait Environment: Send + Sync {
    /// Expands every `${key}` placeholder in `input`. A placeholder
    /// with no value and no `${key:default}` fallback is an error.
    fn resolve_placeholders(&self, input: &str) -> Result<String>;

    /// Returns `true` when at least one of the given profile tokens is
    /// active. A token prefixed with `!` matches when the named
    /// profile is NOT active.
    fn accepts_profiles(&self, profiles: &[&str]) -> bool;
}

/// Environment backed by an in-process property map and an explicit
/// active-profile set.
#[derive(Debug, Default)]
pub struct StandardEnvironment {
    properties: HashMap<String, String>,
    active_profiles: HashSet<String>,
}

impl StandardEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn add_active_profile(&mut self, profile: impl Into<String>) {
        self.active_profiles.insert(profile.into());
    }
}

impl Environment for StandardEnvironment {
    fn resolve_placeholders(&self, input: &str) -> Result<String> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                return Err(RegistryError::MalformedDefinition(
                    MalformedDefinitionError::new(format!(
                        "unterminated placeholder in \"{input}\""
                    )),
                ));
            };
            let body = &after[..end];
            let (key, default) = match body.split_once(':') {
                Some((key, default)) => (key, Some(default)),
                None => (body, None),
            };
            match self.properties.get(key).map(String::as_str).or(default) {
                Some(value) => out.push_str(value),
                None => {
                    return Err(RegistryError::MalformedDefinition(
                        MalformedDefinitionError::new(format!(
                            "could not resolve required placeholder '{key}' in \"{input}\""
                        )),
                    ));
                }
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn accepts_profiles(&self, profiles: &[&str]) -> bool {
        if profiles.is_empty() {
            return true;
        }
        for token in profiles {
            if let Some(negated) = token.strip_prefix('!') {
                if !self.active_profiles.contains(negated) {
                    return true;
                }
            } else if self.active_profiles.contains(*token) {
                return true;
            }
        }
        false
    }
}
