//! Diagnostic channel: problem reporting and reader events.
//!
//! Structural problems found during parsing are reported here and
//! parsing continues with the remaining siblings; a single bad
//! fragment never aborts the whole document. The event listener is
//! emit-only; the reader never blocks on it.

use parking_lot::Mutex;
use tracing::warn;

use crate::element::Element;
use crate::error::RegistryError;

/// A non-fatal problem found while reading a document.
#[derive(Debug, Clone)]
pub struct Problem {
    pub message: String,
    /// Compact rendering of the offending element.
    pub element: Option<String>,
    pub cause: Option<String>,
}

/// Accumulating sink for element-level problems.
pub trait ProblemReporter: Send + Sync {
    fn error(&self, message: &str, element: Option<&Element>, cause: Option<&RegistryError>);
}

/// Events fired as definitions, aliases and imports are processed.
pub trait ReaderEventListener: Send + Sync {
    fn component_registered(&self, _name: &str) {}

    fn alias_registered(&self, _name: &str, _alias: &str) {}

    /// `resolved` carries the exact locations the import loaded.
    fn import_processed(&self, _location: &str, _resolved: &[String]) {}
}

/// Listener that ignores all events.
#[derive(Debug, Default)]
pub struct NullListener;

impl ReaderEventListener for NullListener {}

/// Reporter that collects problems for later inspection, logging each
/// one as it arrives.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    problems: Mutex<Vec<Problem>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> Vec<Problem> {
        self.problems.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.lock().is_empty()
    }
}

impl ProblemReporter for CollectingReporter {
    fn error(&self, message: &str, element: Option<&Element>, cause: Option<&RegistryError>) {
        let problem = Problem {
            message: message.to_string(),
            element: element.map(Element::describe),
            cause: cause.map(|c| c.to_string()),
        };
        warn!(
            message = %problem.message,
            element = problem.element.as_deref().unwrap_or("<none>"),
            "document problem"
        );
        self.problems.lock().push(problem);
    }
}

/// One recorded reader event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    ComponentRegistered {
        name: String,
    },
    AliasRegistered {
        name: String,
        alias: String,
    },
    ImportProcessed {
        location: String,
        resolved: Vec<String>,
    },
}

/// Listener that records every event, used by tests and tooling.
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: Mutex<Vec<ReaderEvent>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReaderEvent> {
        self.events.lock().clone()
    }
}

impl ReaderEventListener for CollectingListener {
    fn component_registered(&self, name: &str) {
        self.events.lock().push(ReaderEvent::ComponentRegistered {
            name: name.to_string(),
        });
    }

    fn alias_registered(&self, name: &str, alias: &str) {
        self.events.lock().push(ReaderEvent::AliasRegistered {
            name: name.to_string(),
            alias: alias.to_string(),
        });
    }

    fn import_processed(&self, location: &str, resolved: &[String]) {
        self.events.lock().push(ReaderEvent::ImportProcessed {
            location: location.to_string(),
            resolved: resolved.to_vec(),
        });
    }
}
