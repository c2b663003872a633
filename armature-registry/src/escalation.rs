//! Escalation resolver for competing cross-cutting registrations.
//!
//! Multiple independent configuration fragments may each request
//! "please ensure auto-proxying is enabled", naming different
//! implementations. Only one auto proxy creator may exist per
//! registry, so requests escalate a single canonical definition: a
//! stronger implementation upgrades it in place, a weaker or equal one
//! leaves it untouched, and nothing is ever downgraded or duplicated.

use once_cell::sync::Lazy;
use tracing::debug;

use crate::definition::{Definition, Scope, ValueSpec};
use crate::error::{MalformedDefinitionError, RegistryError, Result};
use crate::element::Element;
use crate::registry::DefinitionRegistry;

/// Name of the single canonical auto-proxy-creator definition.
pub const AUTO_PROXY_CREATOR_NAME: &str = "armature.internal.autoProxyCreator";

pub const BASIC_AUTO_PROXY_CREATOR: &str = "armature.proxy.BasicAutoProxyCreator";
pub const ASPECT_AUTO_PROXY_CREATOR: &str = "armature.proxy.AspectAwareAutoProxyCreator";
pub const ANNOTATION_AUTO_PROXY_CREATOR: &str = "armature.proxy.AnnotationAwareAutoProxyCreator";

const PROXY_TARGET_CLASS_ATTRIBUTE: &str = "proxy-target-class";
const EXPOSE_PROXY_ATTRIBUTE: &str = "expose-proxy";

/// Implementation strength, weakest first. Index is priority.
static PRIORITY_LADDER: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        BASIC_AUTO_PROXY_CREATOR,
        ASPECT_AUTO_PROXY_CREATOR,
        ANNOTATION_AUTO_PROXY_CREATOR,
    ]
});

fn priority_of(class_name: &str) -> Option<usize> {
    PRIORITY_LADDER.iter().position(|c| *c == class_name)
}

/// Ensures the canonical auto-proxy-creator definition exists at least
/// at the strength of `class_name`.
///
/// Returns the canonical definition name when a registration or
/// upgrade happened, `None` when the registry was already at or above
/// the requested strength. Callers must not notify listeners twice.
pub fn ensure_auto_proxy_creator(
    registry: &DefinitionRegistry,
    class_name: &str,
    source: Option<&str>,
) -> Result<Option<String>> {
    let requested = priority_of(class_name).ok_or_else(|| {
        RegistryError::MalformedDefinition(MalformedDefinitionError::new(format!(
            "unknown auto proxy creator class '{class_name}'"
        )))
    })?;

    if registry.has_definition(AUTO_PROXY_CREATOR_NAME) {
        let existing = registry.resolve(AUTO_PROXY_CREATOR_NAME)?;
        let current = existing
            .class_name
            .as_deref()
            .and_then(priority_of)
            .unwrap_or(0);
        if requested <= current {
            return Ok(None);
        }
        debug!(
            from = existing.class_name.as_deref().unwrap_or("<unset>"),
            to = class_name,
            "upgrading auto proxy creator"
        );
        registry.update(AUTO_PROXY_CREATOR_NAME, |def| {
            def.class_name = Some(class_name.to_string());
        })?;
        return Ok(Some(AUTO_PROXY_CREATOR_NAME.to_string()));
    }

    let mut definition = Definition::of_class(class_name)
        .with_scope(Scope::Singleton)
        .attribute("role", "infrastructure");
    definition.source = source.map(str::to_string);

    debug!(class = class_name, "registering auto proxy creator");
    registry.register_definition(AUTO_PROXY_CREATOR_NAME, definition)?;
    Ok(Some(AUTO_PROXY_CREATOR_NAME.to_string()))
}

/// Forces class-based proxying on the canonical definition. Monotonic:
/// the flag is only ever set, never cleared. No-op when no auto proxy
/// creator is registered.
pub fn force_class_proxying(registry: &DefinitionRegistry) -> Result<()> {
    set_flag(registry, "proxyTargetClass")
}

/// Forces exposure of the current proxy. Monotonic, like
/// [`force_class_proxying`].
pub fn force_expose_proxy(registry: &DefinitionRegistry) -> Result<()> {
    set_flag(registry, "exposeProxy")
}

fn set_flag(registry: &DefinitionRegistry, property: &str) -> Result<()> {
    if !registry.has_definition(AUTO_PROXY_CREATOR_NAME) {
        return Ok(());
    }
    registry.update(AUTO_PROXY_CREATOR_NAME, |def| {
        def.property_values
            .insert(property.to_string(), ValueSpec::Value("true".into()));
    })
}

/// Reads the proxying toggles off a source element and applies them to
/// the canonical definition.
pub fn apply_proxy_settings(registry: &DefinitionRegistry, element: &Element) -> Result<()> {
    if element.attribute(PROXY_TARGET_CLASS_ATTRIBUTE) == Some("true") {
        force_class_proxying(registry)?;
    }
    if element.attribute(EXPOSE_PROXY_ATTRIBUTE) == Some("true") {
        force_expose_proxy(registry)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(registry: &DefinitionRegistry, property: &str) -> Option<ValueSpec> {
        registry
            .resolve(AUTO_PROXY_CREATOR_NAME)
            .unwrap()
            .property_values
            .get(property)
            .cloned()
    }

    #[test]
    fn first_request_registers_canonical_definition() {
        let registry = DefinitionRegistry::new();
        let changed =
            ensure_auto_proxy_creator(&registry, BASIC_AUTO_PROXY_CREATOR, Some("a.xml")).unwrap();

        assert_eq!(changed.as_deref(), Some(AUTO_PROXY_CREATOR_NAME));
        let def = registry.resolve(AUTO_PROXY_CREATOR_NAME).unwrap();
        assert_eq!(def.class_name.as_deref(), Some(BASIC_AUTO_PROXY_CREATOR));
        assert_eq!(def.source.as_deref(), Some("a.xml"));
    }

    #[test]
    fn escalation_is_monotonic_over_any_sequence() {
        let registry = DefinitionRegistry::new();
        let sequence = [
            ASPECT_AUTO_PROXY_CREATOR,
            BASIC_AUTO_PROXY_CREATOR,
            ANNOTATION_AUTO_PROXY_CREATOR,
            ASPECT_AUTO_PROXY_CREATOR,
            BASIC_AUTO_PROXY_CREATOR,
        ];
        for class in sequence {
            ensure_auto_proxy_creator(&registry, class, None).unwrap();
        }

        // Final strength is the maximum requested across the sequence.
        let def = registry.resolve(AUTO_PROXY_CREATOR_NAME).unwrap();
        assert_eq!(def.class_name.as_deref(), Some(ANNOTATION_AUTO_PROXY_CREATOR));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn no_change_returns_none() {
        let registry = DefinitionRegistry::new();
        assert!(
            ensure_auto_proxy_creator(&registry, ASPECT_AUTO_PROXY_CREATOR, None)
                .unwrap()
                .is_some()
        );
        assert!(
            ensure_auto_proxy_creator(&registry, ASPECT_AUTO_PROXY_CREATOR, None)
                .unwrap()
                .is_none()
        );
        assert!(
            ensure_auto_proxy_creator(&registry, BASIC_AUTO_PROXY_CREATOR, None)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn unknown_class_rejected() {
        let registry = DefinitionRegistry::new();
        assert!(ensure_auto_proxy_creator(&registry, "app.NotACreator", None).is_err());
    }

    #[test]
    fn flags_stick_across_upgrades() {
        let registry = DefinitionRegistry::new();
        ensure_auto_proxy_creator(&registry, BASIC_AUTO_PROXY_CREATOR, None).unwrap();
        force_class_proxying(&registry).unwrap();

        ensure_auto_proxy_creator(&registry, ANNOTATION_AUTO_PROXY_CREATOR, None).unwrap();
        force_class_proxying(&registry).unwrap();
        force_expose_proxy(&registry).unwrap();

        assert_eq!(
            flag(&registry, "proxyTargetClass"),
            Some(ValueSpec::Value("true".into()))
        );
        assert_eq!(
            flag(&registry, "exposeProxy"),
            Some(ValueSpec::Value("true".into()))
        );
    }

    #[test]
    fn flags_are_noops_without_creator() {
        let registry = DefinitionRegistry::new();
        force_class_proxying(&registry).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn proxy_settings_read_from_element() {
        let registry = DefinitionRegistry::new();
        ensure_auto_proxy_creator(&registry, BASIC_AUTO_PROXY_CREATOR, None).unwrap();

        let element = Element::new("config")
            .attr("proxy-target-class", "true")
            .attr("expose-proxy", "false");
        apply_proxy_settings(&registry, &element).unwrap();

        assert!(flag(&registry, "proxyTargetClass").is_some());
        assert!(flag(&registry, "exposeProxy").is_none());
    }
}
