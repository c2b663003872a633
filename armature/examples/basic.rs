//! Basic example of the Armature registry.
//!
//! Assembles a configuration document programmatically, reads it into
//! a registry and resolves the wired object graph.

use std::sync::Arc;

use armature::{
    Container, DefinitionRegistry, Document, DocumentReader, Element, InMemoryResourceLoader,
    NamespaceHandlerRegistry, ReaderContext, Result, StandardEnvironment,
};
use armature_registry::events::{CollectingReporter, NullListener};

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("armature=debug")
        .init();

    // The document an XML (or other markup) front end would produce.
    let root = Element::new("beans")
        .child(
            Element::new("bean")
                .attr("id", "dataSource")
                .attr("class", "app.DataSource")
                .child(
                    Element::new("property")
                        .attr("name", "url")
                        .attr("value", "postgres://localhost/myapp"),
                ),
        )
        .child(
            Element::new("bean")
                .attr("id", "userRepository")
                .attr("class", "app.UserRepository")
                .child(
                    Element::new("constructor-arg").attr("ref", "dataSource"),
                ),
        )
        .child(
            Element::new("bean")
                .attr("id", "userService")
                .attr("class", "app.UserService")
                .child(Element::new("property").attr("name", "repo").attr("ref", "userRepository")),
        )
        .child(Element::new("alias").attr("name", "userService").attr("alias", "users"));

    let registry = Arc::new(DefinitionRegistry::new());
    let reporter = Arc::new(CollectingReporter::new());
    let reader = DocumentReader::new(ReaderContext {
        registry: registry.clone(),
        environment: Arc::new(StandardEnvironment::new()),
        loader: Arc::new(InMemoryResourceLoader::new()),
        listener: Arc::new(NullListener),
        reporter: reporter.clone(),
        namespaces: Arc::new(NamespaceHandlerRegistry::new()),
    });
    reader.register_definitions(&Document::new("examples/basic.xml", root));

    for problem in reporter.problems() {
        eprintln!("problem: {}", problem.message);
    }

    // Wire the graph.
    let container = Container::new(registry);
    container.instantiate_singletons()?;

    let service = container.get("users")?;
    println!("resolved {} ({:?})", service.name(), service.class_name());

    let repo = service.reference("repo").expect("repo is wired");
    let data_source = repo.constructor_args()[0]
        .as_instance()
        .expect("dataSource is wired");
    println!(
        "repo {} uses {} at {:?}",
        repo.name(),
        data_source.name(),
        data_source.property("url").and_then(|v| v.as_str().map(String::from)),
    );

    Ok(())
}
