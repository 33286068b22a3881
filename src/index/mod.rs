//! Hooks for external secondary indexes.
//!
//! Attribute columns, time indexes and spatial indexes live outside the
//! graph core. They follow structural changes through [`GraphListener`],
//! which the store calls synchronously while holding the write lock.
//! Listeners must not call back into the graph.

use std::fmt;
use std::sync::Arc;

use crate::model::{Edge, Node, Value};
use crate::view::View;

/// Structural change notifications. Every method defaults to a no-op.
pub trait GraphListener: Send + Sync {
    fn on_node_added(&self, _node: &Node) {}
    fn on_node_removed(&self, _node: &Node) {}
    fn on_edge_added(&self, _edge: &Edge) {}
    fn on_edge_removed(&self, _edge: &Edge) {}
    /// The view is gone; drop any per-view structure kept for it.
    fn on_view_destroyed(&self, _view: &View) {}
    /// Every edge was removed at once.
    fn on_clear_edges(&self) {}
    /// Every node and edge was removed at once.
    fn on_clear(&self) {}
}

/// Default attribute values, owned by the attribute subsystem.
///
/// The graph never consults it; it only forwards lookups.
pub trait DefaultValueProvider: Send + Sync {
    fn default_value(&self, key: &str) -> Option<Value>;
}

/// Registered hooks of one store.
#[derive(Default, Clone)]
pub(crate) struct Listeners {
    listeners: Vec<Arc<dyn GraphListener>>,
    defaults: Option<Arc<dyn DefaultValueProvider>>,
}

impl Listeners {
    pub fn register(&mut self, listener: Arc<dyn GraphListener>) {
        self.listeners.push(listener);
    }

    /// Remove a listener by identity. Returns whether it was registered.
    pub fn unregister(&mut self, listener: &Arc<dyn GraphListener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        before != self.listeners.len()
    }

    pub fn set_defaults(&mut self, provider: Option<Arc<dyn DefaultValueProvider>>) {
        self.defaults = provider;
    }

    pub fn default_value(&self, key: &str) -> Option<Value> {
        self.defaults.as_ref().and_then(|p| p.default_value(key))
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn each(&self, mut f: impl FnMut(&dyn GraphListener)) {
        for listener in &self.listeners {
            f(listener.as_ref());
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("listeners", &self.listeners.len())
            .field("defaults", &self.defaults.is_some())
            .finish()
    }
}
