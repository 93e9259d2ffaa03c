//! Engine context.
//!
//! The context bundles everything the interpreter needs that is not part
//! of the tree itself: the blossom registry, the template engine, the
//! named trees subtree calls resolve against, and the diagnostic sink.
//! It is passed explicitly; there are no process-wide globals.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::item::SakuraItem;
use crate::registry::BlossomRegistry;
use crate::report::{ReportSink, StdoutSink};
use sakura_values::{BraceTemplates, TemplateEngine};

/// Shared, read-only collaborators of one engine instance.
pub struct EngineContext {
    /// Blossom implementations, looked up by `(group, type)`.
    pub registry: BlossomRegistry,
    /// Template renderer for value strings.
    pub templates: Box<dyn TemplateEngine>,
    /// Named trees resolvable by subtree calls.
    pub trees: IndexMap<String, SakuraItem>,
    /// Sink for blossom diagnostic records; shared so embedders can keep
    /// a handle for inspection.
    pub sink: Arc<dyn ReportSink>,
}

impl core::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EngineContext")
            .field("registry", &self.registry)
            .field("trees", &self.trees.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(BlossomRegistry::new())
    }
}

impl EngineContext {
    /// Creates a context over the given registry with the built-in
    /// template engine and the stdout sink.
    #[must_use]
    pub fn new(registry: BlossomRegistry) -> Self {
        Self {
            registry,
            templates: Box::new(BraceTemplates),
            trees: IndexMap::new(),
            sink: Arc::new(StdoutSink::new()),
        }
    }

    /// Replaces the template engine.
    #[must_use]
    pub fn with_templates(mut self, templates: impl TemplateEngine + 'static) -> Self {
        self.templates = Box::new(templates);
        self
    }

    /// Replaces the diagnostic sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Registers a named tree for subtree calls.
    #[must_use]
    pub fn with_tree(mut self, name: impl Into<String>, tree: SakuraItem) -> Self {
        self.trees.insert(name.into(), tree);
        self
    }
}
