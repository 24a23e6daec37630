// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pluggable per-node content renderers.
//!
//! A node's [`RenderSpec`] resolves against this registry: static markup is
//! injected verbatim, named templates are looked up, callback renderers are
//! invoked with the node's context. Malformed usage (unknown names) is
//! reported to the diagnostic channel and resolves to `false`; the editor
//! stays interactive.

use flowdeck_graph::{Node, RenderSpec};
use indexmap::IndexMap;
use std::fmt;

/// Sink the render surface exposes for a node's content region
pub trait ContentRegion {
    /// Replace the region's content with markup
    fn set_markup(&mut self, markup: &str);
}

/// A callback renderer: populates a node's content region
pub trait ContentRenderer {
    /// Fill the content region for this node
    fn render(&self, node: &Node, region: &mut dyn ContentRegion);
}

impl<F> ContentRenderer for F
where
    F: Fn(&Node, &mut dyn ContentRegion),
{
    fn render(&self, node: &Node, region: &mut dyn ContentRegion) {
        self(node, region);
    }
}

/// Registry of named templates and callback renderers
#[derive(Default)]
pub struct RenderRegistry {
    templates: IndexMap<String, String>,
    callbacks: IndexMap<String, Box<dyn ContentRenderer>>,
}

impl RenderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a markup template under a name
    pub fn register_template(&mut self, name: impl Into<String>, markup: impl Into<String>) {
        self.templates.insert(name.into(), markup.into());
    }

    /// Register a callback renderer under a name
    pub fn register_callback(
        &mut self,
        name: impl Into<String>,
        renderer: impl ContentRenderer + 'static,
    ) {
        self.callbacks.insert(name.into(), Box::new(renderer));
    }

    /// Look up a template's markup
    pub fn template(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Resolve a node's render spec into its content region.
    ///
    /// Returns `false` (after a diagnostic report) when a named template or
    /// callback is not registered.
    pub fn populate(&self, node: &Node, region: &mut dyn ContentRegion) -> bool {
        match &node.render {
            RenderSpec::Markup(markup) => {
                region.set_markup(markup);
                true
            }
            RenderSpec::Template(name) => match self.templates.get(name) {
                Some(markup) => {
                    region.set_markup(markup);
                    true
                }
                None => {
                    tracing::warn!(node = %node.id, template = %name, "unknown render template");
                    false
                }
            },
            RenderSpec::Callback(name) => match self.callbacks.get(name) {
                Some(renderer) => {
                    renderer.render(node, region);
                    true
                }
                None => {
                    tracing::warn!(node = %node.id, callback = %name, "unknown render callback");
                    false
                }
            },
        }
    }
}

impl fmt::Debug for RenderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRegistry")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_graph::{NodeSpec, RenderSpec};

    #[derive(Default)]
    struct Buffer(String);

    impl ContentRegion for Buffer {
        fn set_markup(&mut self, markup: &str) {
            self.0 = markup.to_owned();
        }
    }

    fn node_with(render: RenderSpec) -> Node {
        let mut store = flowdeck_graph::GraphStore::default();
        let id = store.add_node(NodeSpec::new("n", 0, 0).with_render(render));
        store.node(&id).unwrap().clone()
    }

    #[test]
    fn test_static_markup_is_verbatim() {
        let registry = RenderRegistry::new();
        let mut region = Buffer::default();
        let node = node_with(RenderSpec::Markup("<b>hi</b>".into()));
        assert!(registry.populate(&node, &mut region));
        assert_eq!(region.0, "<b>hi</b>");
    }

    #[test]
    fn test_template_lookup() {
        let mut registry = RenderRegistry::new();
        registry.register_template("card", "<div class=\"card\"></div>");
        let mut region = Buffer::default();

        let node = node_with(RenderSpec::Template("card".into()));
        assert!(registry.populate(&node, &mut region));
        assert_eq!(region.0, "<div class=\"card\"></div>");

        let missing = node_with(RenderSpec::Template("nope".into()));
        assert!(!registry.populate(&missing, &mut region));
    }

    #[test]
    fn test_callback_receives_node_context() {
        let mut registry = RenderRegistry::new();
        registry.register_callback("title", |node: &Node, region: &mut dyn ContentRegion| {
            region.set_markup(&format!("<h1>{}</h1>", node.name));
        });
        let mut region = Buffer::default();
        let node = node_with(RenderSpec::Callback("title".into()));
        assert!(registry.populate(&node, &mut region));
        assert_eq!(region.0, "<h1>n</h1>");
    }
}
