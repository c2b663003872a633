//! Live component instances.
//!
//! The registry does not own user construction logic; an instance is
//! a generic record of the resolved constructor arguments plus a
//! settable property map. Properties live behind interior mutability
//! because the cycle-breaking protocol hands out references to an
//! instance before its own properties are populated; all holders of
//! the same `Arc` observe the later wiring.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

/// A resolved wiring value.
#[derive(Debug, Clone)]
pub enum WiredValue {
    Value(String),
    List(Vec<WiredValue>),
    Ref(Arc<ComponentInstance>),
}

impl WiredValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            WiredValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Arc<ComponentInstance>> {
        match self {
            WiredValue::Ref(instance) => Some(instance),
            _ => None,
        }
    }
}

/// One live component built from a definition.
pub struct ComponentInstance {
    name: String,
    class_name: Option<String>,
    constructor_args: Vec<WiredValue>,
    properties: RwLock<IndexMap<String, WiredValue>>,
}

impl ComponentInstance {
    pub(crate) fn new(
        name: impl Into<String>,
        class_name: Option<String>,
        constructor_args: Vec<WiredValue>,
    ) -> Self {
        Self {
            name: name.into(),
            class_name,
            constructor_args,
            properties: RwLock::new(IndexMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Constructor arguments in declaration order, fully resolved
    /// before the instance became visible to anyone.
    pub fn constructor_args(&self) -> &[WiredValue] {
        &self.constructor_args
    }

    pub fn property(&self, name: &str) -> Option<WiredValue> {
        self.properties.read().get(name).cloned()
    }

    pub(crate) fn set_property(&self, name: impl Into<String>, value: WiredValue) {
        self.properties.write().insert(name.into(), value);
    }

    /// Convenience accessor for reference-valued properties.
    pub fn reference(&self, name: &str) -> Option<Arc<ComponentInstance>> {
        match self.property(name) {
            Some(WiredValue::Ref(instance)) => Some(instance),
            _ => None,
        }
    }
}

// Manual Debug: a cyclic graph of instances must not recurse through
// reference-valued properties.
impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_visible_after_late_wiring() {
        let instance = Arc::new(ComponentInstance::new("a", None, vec![]));
        let other_handle = instance.clone();
        assert!(other_handle.property("flag").is_none());

        instance.set_property("flag", WiredValue::Value("on".into()));
        assert_eq!(
            other_handle.property("flag").and_then(|v| v.as_str().map(String::from)),
            Some("on".to_string())
        );
    }

    #[test]
    fn reference_accessor() {
        let target = Arc::new(ComponentInstance::new("b", None, vec![]));
        let instance = ComponentInstance::new("a", None, vec![]);
        instance.set_property("peer", WiredValue::Ref(target.clone()));

        let resolved = instance.reference("peer").unwrap();
        assert!(Arc::ptr_eq(&resolved, &target));
        assert!(instance.reference("missing").is_none());
    }

    #[test]
    fn debug_does_not_follow_cycles() {
        let a = Arc::new(ComponentInstance::new("a", Some("app.A".into()), vec![]));
        let b = Arc::new(ComponentInstance::new("b", None, vec![]));
        a.set_property("b", WiredValue::Ref(b.clone()));
        b.set_property("a", WiredValue::Ref(a.clone()));

        let rendered = format!("{a:?}");
        assert!(rendered.contains("app.A"));
    }
}
