//! Element parsing delegate: translates one `bean` element into a
//! [`DefinitionHolder`].
//!
//! Defaults declared on an enclosing `beans` element (default
//! lazy-init, default autowire) are carried in a [`ParseDefaults`]
//! chain with one parent link per nesting level. The chain lives on
//! the reader's call stack: entering a nested scope pushes a child,
//! returning from the recursion pops it, so sibling and parent
//! subtrees never see leaked defaults.

use std::sync::Arc;

use crate::definition::{AutowireMode, Definition, DefinitionHolder, Scope, ValueSpec};
use crate::element::Element;
use crate::error::{MalformedDefinitionError, RegistryError, Result};
use crate::registry::DefinitionRegistry;

pub const BEAN_ELEMENT: &str = "bean";
pub const NESTED_SCOPE_ELEMENT: &str = "beans";
pub const IMPORT_ELEMENT: &str = "import";
pub const ALIAS_ELEMENT: &str = "alias";

const CONSTRUCTOR_ARG_ELEMENT: &str = "constructor-arg";
const PROPERTY_ELEMENT: &str = "property";
const META_ELEMENT: &str = "meta";

/// Delimiters accepted between multiple names in a `name` attribute
/// and between profile tokens.
pub const MULTI_VALUE_DELIMITERS: [char; 3] = [',', ';', ' '];

/// Inheritable default settings of one document scope.
#[derive(Debug, Default)]
pub struct ParseDefaults<'a> {
    lazy_init: Option<bool>,
    autowire: Option<AutowireMode>,
    parent: Option<&'a ParseDefaults<'a>>,
}

impl<'a> ParseDefaults<'a> {
    /// Reads the `default-*` attributes off a scope root, falling back
    /// to the enclosing scope's defaults for anything unset (the
    /// literal value `"default"` also inherits).
    pub fn from_element(root: &Element, parent: Option<&'a ParseDefaults<'a>>) -> Self {
        let lazy_init = match root.attribute("default-lazy-init") {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        };
        let autowire = match root.attribute("default-autowire") {
            Some("no") => Some(AutowireMode::No),
            Some("byName") => Some(AutowireMode::ByName),
            Some("byType") => Some(AutowireMode::ByType),
            _ => None,
        };
        Self {
            lazy_init,
            autowire,
            parent,
        }
    }

    pub fn lazy_init(&self) -> bool {
        match self.lazy_init {
            Some(value) => value,
            None => self.parent.map(|p| p.lazy_init()).unwrap_or(false),
        }
    }

    pub fn autowire(&self) -> AutowireMode {
        match self.autowire {
            Some(mode) => mode,
            None => self.parent.map(|p| p.autowire()).unwrap_or_default(),
        }
    }
}

/// Converts one definition element into a `(name, aliases, Definition)`
/// holder. The document reader only consumes the output.
pub trait ElementParser: Send + Sync {
    fn parse_definition(
        &self,
        element: &Element,
        defaults: &ParseDefaults<'_>,
        registry: &Arc<DefinitionRegistry>,
    ) -> Result<DefinitionHolder>;
}

/// Parser for the default `bean` vocabulary.
#[derive(Debug, Default)]
pub struct DefaultElementParser;

impl DefaultElementParser {
    fn malformed(&self, message: impl Into<String>, element: &Element) -> RegistryError {
        RegistryError::MalformedDefinition(MalformedDefinitionError::in_element(
            message,
            element.describe(),
        ))
    }

    fn parse_value_or_ref(&self, element: &Element) -> Result<ValueSpec> {
        match (element.attribute("value"), element.attribute("ref")) {
            (Some(_), Some(_)) => Err(self.malformed(
                "element must not carry both 'value' and 'ref'",
                element,
            )),
            (Some(value), None) => Ok(ValueSpec::Value(value.to_string())),
            (None, Some(target)) if !target.trim().is_empty() => {
                Ok(ValueSpec::Ref(target.to_string()))
            }
            (None, Some(_)) => Err(self.malformed("'ref' must not be empty", element)),
            (None, None) => Err(self.malformed(
                "element must carry either 'value' or 'ref'",
                element,
            )),
        }
    }
}

impl ElementParser for DefaultElementParser {
    fn parse_definition(
        &self,
        element: &Element,
        defaults: &ParseDefaults<'_>,
        registry: &Arc<DefinitionRegistry>,
    ) -> Result<DefinitionHolder> {
        let mut definition = Definition::new();

        definition.class_name = element.attribute("class").map(str::to_string);

        definition.scope = match element.attribute("scope") {
            None | Some("") => None,
            Some("singleton") => Some(Scope::Singleton),
            Some("prototype") => Some(Scope::Prototype),
            Some(other) => {
                return Err(self.malformed(format!("unknown scope '{other}'"), element));
            }
        };

        definition.lazy_init = match element.attribute("lazy-init") {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => Some(defaults.lazy_init()),
        };
        definition.autowire = Some(defaults.autowire());
        definition.is_abstract = element.attribute("abstract") == Some("true");
        definition.parent = element
            .attribute("parent")
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string);

        for child in element.children().iter().filter(|c| c.is_default_namespace()) {
            match child.name() {
                CONSTRUCTOR_ARG_ELEMENT => {
                    definition.constructor_args.push(self.parse_value_or_ref(child)?);
                }
                PROPERTY_ELEMENT => {
                    let name = child
                        .attribute("name")
                        .filter(|n| !n.trim().is_empty())
                        .ok_or_else(|| self.malformed("property requires a 'name'", child))?;
                    let spec = self.parse_value_or_ref(child)?;
                    definition.property_values.insert(name.to_string(), spec);
                }
                META_ELEMENT => {
                    let key = child
                        .attribute("key")
                        .ok_or_else(|| self.malformed("meta requires a 'key'", child))?;
                    let value = child
                        .attribute("value")
                        .ok_or_else(|| self.malformed("meta requires a 'value'", child))?;
                    definition.attributes.insert(key.to_string(), value.to_string());
                }
                // Custom-namespace children are handled by decoration;
                // anything else in the default vocabulary is unknown.
                other => {
                    return Err(self.malformed(
                        format!("unexpected child element '{other}'"),
                        element,
                    ));
                }
            }
        }

        // Naming: explicit id, else the first token of 'name' (the
        // rest become aliases), else a generated name.
        let id = element.attribute("id").filter(|v| !v.trim().is_empty());
        let mut name_tokens: Vec<String> = element
            .attribute("name")
            .map(|names| {
                names
                    .split(MULTI_VALUE_DELIMITERS)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let name = match id {
            Some(id) => id.to_string(),
            None if !name_tokens.is_empty() => name_tokens.remove(0),
            None => {
                let class = definition.class_name.as_deref().ok_or_else(|| {
                    self.malformed("definition requires an 'id', 'name' or 'class'", element)
                })?;
                registry.generate_name(class)
            }
        };

        Ok(DefinitionHolder::new(name, definition).with_aliases(name_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(element: &Element) -> Result<DefinitionHolder> {
        let registry = Arc::new(DefinitionRegistry::new());
        DefaultElementParser.parse_definition(element, &ParseDefaults::default(), &registry)
    }

    #[test]
    fn parses_full_bean_element() {
        let element = Element::new("bean")
            .attr("id", "userService")
            .attr("name", "users accounts")
            .attr("class", "app.UserService")
            .attr("scope", "prototype")
            .attr("lazy-init", "true")
            .child(Element::new("constructor-arg").attr("ref", "dataSource"))
            .child(Element::new("constructor-arg").attr("value", "42"))
            .child(Element::new("property").attr("name", "logger").attr("ref", "logger"))
            .child(Element::new("meta").attr("key", "origin").attr("value", "test"));

        let holder = parse(&element).unwrap();
        assert_eq!(holder.name, "userService");
        assert_eq!(holder.aliases, vec!["users", "accounts"]);

        let def = &holder.definition;
        assert_eq!(def.class_name.as_deref(), Some("app.UserService"));
        assert_eq!(def.effective_scope(), Scope::Prototype);
        assert_eq!(def.lazy_init, Some(true));
        assert_eq!(
            def.constructor_args,
            vec![ValueSpec::Ref("dataSource".into()), ValueSpec::Value("42".into())]
        );
        assert_eq!(
            def.property_values.get("logger"),
            Some(&ValueSpec::Ref("logger".into()))
        );
        assert_eq!(def.attributes.get("origin").map(String::as_str), Some("test"));
    }

    #[test]
    fn name_attribute_without_id_names_the_bean() {
        let element = Element::new("bean").attr("name", "first,second").attr("class", "app.A");
        let holder = parse(&element).unwrap();
        assert_eq!(holder.name, "first");
        assert_eq!(holder.aliases, vec!["second"]);
    }

    #[test]
    fn anonymous_bean_gets_generated_name() {
        let element = Element::new("bean").attr("class", "app.Task");
        let holder = parse(&element).unwrap();
        assert!(holder.name.starts_with("app.Task#"));
    }

    #[test]
    fn nameless_classless_bean_is_malformed() {
        let element = Element::new("bean");
        assert!(matches!(
            parse(&element),
            Err(RegistryError::MalformedDefinition(_))
        ));
    }

    #[test]
    fn unknown_scope_is_malformed() {
        let element = Element::new("bean").attr("id", "a").attr("scope", "request");
        assert!(parse(&element).is_err());
    }

    #[test]
    fn property_requires_value_or_ref() {
        let element = Element::new("bean")
            .attr("id", "a")
            .child(Element::new("property").attr("name", "x"));
        assert!(parse(&element).is_err());

        let both = Element::new("bean").attr("id", "a").child(
            Element::new("property")
                .attr("name", "x")
                .attr("value", "1")
                .attr("ref", "b"),
        );
        assert!(parse(&both).is_err());
    }

    #[test]
    fn defaults_chain_falls_back_to_parent() {
        let outer_root = Element::new("beans").attr("default-lazy-init", "true");
        let outer = ParseDefaults::from_element(&outer_root, None);

        let inner_root = Element::new("beans");
        let inner = ParseDefaults::from_element(&inner_root, Some(&outer));
        assert!(inner.lazy_init());

        let overriding_root = Element::new("beans").attr("default-lazy-init", "false");
        let overriding = ParseDefaults::from_element(&overriding_root, Some(&outer));
        assert!(!overriding.lazy_init());
    }

    #[test]
    fn bean_inherits_default_lazy_init() {
        let root = Element::new("beans").attr("default-lazy-init", "true");
        let defaults = ParseDefaults::from_element(&root, None);
        let registry = Arc::new(DefinitionRegistry::new());

        let element = Element::new("bean").attr("id", "a");
        let holder = DefaultElementParser
            .parse_definition(&element, &defaults, &registry)
            .unwrap();
        assert_eq!(holder.definition.lazy_init, Some(true));
    }
}
