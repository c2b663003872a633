//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to format dependency and alias chains, component
//! class names, and "did you mean?" suggestions in error output.

/// Renders a dependency or alias chain as a readable string.
///
/// # Examples
/// ```
/// use armature_support::rendering::render_chain;
///
/// let chain = vec!["userService", "userRepository", "dataSource", "userService"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "userService → userRepository → dataSource → userService");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Shortens a fully qualified component class name for display.
///
/// Handles both dotted and `::`-separated paths.
///
/// ```
/// use armature_support::rendering::shorten_class_name;
///
/// assert_eq!(shorten_class_name("app.services.UserService"), "UserService");
/// assert_eq!(shorten_class_name("app::proxy::AutoProxyCreator"), "AutoProxyCreator");
/// assert_eq!(shorten_class_name("UserService"), "UserService");
/// ```
pub fn shorten_class_name(full_name: &str) -> String {
    full_name
        .rsplit(['.', ':'])
        .next()
        .unwrap_or(full_name)
        .to_string()
}

/// Generates "did you mean?" suggestions for an unknown component name.
///
/// Compares the requested name against the registered names and returns
/// the closest matches, best first.
pub fn suggest_similar(
    requested: &str,
    available: &[impl AsRef<str>],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .map(|n| n.as_ref())
        .filter_map(|name| {
            if name == requested {
                return None;
            }
            let name_lower = name.to_lowercase();

            // Exact substring match (highest priority)
            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            // Common prefix
            let common = name_lower
                .chars()
                .zip(requested_lower.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_simple_chain() {
        let chain = vec!["a", "b", "c", "a"];
        assert_eq!(render_chain(&chain), "a → b → c → a");
    }

    #[test]
    fn render_single_element_chain() {
        let chain = vec!["a"];
        assert_eq!(render_chain(&chain), "a");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn shorten_dotted_path() {
        assert_eq!(
            shorten_class_name("app.services.UserService"),
            "UserService"
        );
    }

    #[test]
    fn shorten_rust_path() {
        assert_eq!(
            shorten_class_name("app::services::UserService"),
            "UserService"
        );
    }

    #[test]
    fn shorten_no_path() {
        assert_eq!(shorten_class_name("dataSource"), "dataSource");
    }

    #[test]
    fn suggest_similar_names() {
        let available = vec!["userService", "userRepository", "logger", "dataSource"];

        let suggestions = suggest_similar("userServise", &available, 3);
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions[0], "userService");
    }

    #[test]
    fn suggest_no_match() {
        let available = vec!["dataSource"];
        let suggestions = suggest_similar("xyzAbc", &available, 3);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn suggest_skips_exact_name() {
        let available = vec!["dataSource"];
        let suggestions = suggest_similar("dataSource", &available, 3);
        assert!(suggestions.is_empty());
    }
}
