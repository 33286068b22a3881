//! End-to-end tests for observers, diffs and index hooks.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use propgraph::{DefaultValueProvider, Edge, Error, Graph, GraphListener, Node, Value, View};

// ============================================================================
// 1. Change detection
// ============================================================================

#[test]
fn test_one_shot_per_batch() {
    let graph = Graph::new();
    let obs = graph.create_observer(false).unwrap();
    assert!(!obs.has_changed().unwrap());

    let a = Node::new("a");
    let b = Node::new("b");
    graph.add_nodes([&a, &b]).unwrap();
    graph.add_edge(&Edge::directed(1, &a, &b, "T")).unwrap();
    assert!(obs.has_changed().unwrap());
    assert!(!obs.has_changed().unwrap());

    a.set_property("touched", true);
    assert!(!obs.has_changed().unwrap(), "property edits are not structural");

    graph.remove_node(&b).unwrap();
    assert!(obs.has_changed().unwrap());
    assert!(!obs.has_changed().unwrap());
}

#[test]
fn test_view_observer_sees_membership_only() {
    let graph = Graph::new();
    let view = graph.create_view().unwrap();
    let sub = graph.view(&view).unwrap();
    let obs = sub.create_observer(false).unwrap();

    let a = Node::new("a");
    graph.add_node(&a).unwrap();
    assert!(!obs.has_changed().unwrap(), "store change outside the view");

    sub.add_node(&a).unwrap();
    assert!(obs.has_changed().unwrap());
    assert!(!obs.has_changed().unwrap());

    graph.remove_node(&a).unwrap();
    assert!(obs.has_changed().unwrap(), "removing a member changes the view");
}

#[test]
fn test_collapse_is_a_change() {
    let graph = Graph::new();
    let (a, b) = (Node::new("a"), Node::new("b"));
    graph.add_nodes([&a, &b]).unwrap();
    let view = graph.create_hierarchical_view().unwrap();
    let sub = graph.view(&view).unwrap();
    sub.fill().unwrap();
    sub.group(&a, &[b.clone()]).unwrap();
    let obs = sub.create_observer(true).unwrap();

    sub.collapse(&a).unwrap();
    assert!(obs.has_changed().unwrap());
    let diff = obs.diff().unwrap();
    assert_eq!(diff.removed_nodes, vec![b.clone()]);
    assert!(diff.added_nodes.is_empty());

    sub.expand(&a).unwrap();
    assert!(obs.has_changed().unwrap());
    assert_eq!(obs.diff().unwrap().added_nodes, vec![b]);
}

// ============================================================================
// 2. Diffs
// ============================================================================

#[test]
fn test_diff_lists_are_sorted() {
    let graph = Graph::new();
    let obs = graph.create_observer(true).unwrap();
    let nodes: Vec<Node> = [5, 3, 9, 1].into_iter().map(Node::new).collect();
    graph.add_nodes(&nodes).unwrap();
    let e = Edge::directed("e", &nodes[0], &nodes[1], "T");
    graph.add_edge(&e).unwrap();

    assert!(obs.has_changed().unwrap());
    let diff = obs.diff().unwrap();
    let ids: Vec<String> = diff.added_nodes.iter().map(|n| n.id().to_string()).collect();
    assert_eq!(ids, vec!["1", "3", "5", "9"]);
    assert_eq!(diff.added_edges, vec![e.clone()]);
    assert!(diff.removed_nodes.is_empty());

    graph.remove_node(&nodes[0]).unwrap();
    assert!(obs.has_changed().unwrap());
    let diff = obs.diff().unwrap();
    assert_eq!(diff.removed_nodes, vec![nodes[0].clone()]);
    assert_eq!(diff.removed_edges, vec![e]);
    assert!(diff.added_nodes.is_empty());
}

#[test]
fn test_diff_without_positive_poll_is_usage_fault() {
    let graph = Graph::new();
    let obs = graph.create_observer(true).unwrap();
    graph.add_node(&Node::new(1)).unwrap();
    assert!(matches!(obs.diff(), Err(Error::Usage(_))));
    assert!(obs.has_changed().unwrap());
    assert!(!obs.has_changed().unwrap());
    assert!(matches!(obs.diff(), Err(Error::Usage(_))), "negative poll drops the pending diff");
}

// ============================================================================
// 3. Lifecycle
// ============================================================================

#[test]
fn test_destroy_detaches() {
    let graph = Graph::new();
    let obs = graph.create_observer(false).unwrap();
    assert_eq!(graph.observer_count(None).unwrap(), 1);
    obs.destroy().unwrap();
    assert_eq!(graph.observer_count(None).unwrap(), 0);
    assert!(matches!(obs.has_changed(), Err(Error::Usage(_))));
    assert!(matches!(obs.diff(), Err(Error::Usage(_))));
}

#[test]
fn test_view_destroy_destroys_observers() {
    let graph = Graph::new();
    let view = graph.create_view().unwrap();
    let obs = graph.create_view_observer(&view, false).unwrap();
    assert_eq!(obs.view(), Some(&view));
    assert_eq!(graph.observer_count(Some(&view)).unwrap(), 1);
    graph.destroy_view(&view).unwrap();
    assert!(obs.is_destroyed());
    assert!(matches!(obs.destroy(), Err(Error::Usage(_))));
}

// ============================================================================
// 4. Index hooks
// ============================================================================

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl GraphListener for Recorder {
    fn on_node_added(&self, node: &Node) {
        self.events.lock().push(format!("+n{}", node.id()));
    }

    fn on_node_removed(&self, node: &Node) {
        self.events.lock().push(format!("-n{}", node.id()));
    }

    fn on_edge_added(&self, edge: &Edge) {
        self.events.lock().push(format!("+e{}", edge.id()));
    }

    fn on_edge_removed(&self, edge: &Edge) {
        self.events.lock().push(format!("-e{}", edge.id()));
    }

    fn on_view_destroyed(&self, view: &View) {
        self.events.lock().push(format!("-v{}", view.store_id()));
    }

    fn on_clear(&self) {
        self.events.lock().push("clear".into());
    }
}

struct Defaults;

impl DefaultValueProvider for Defaults {
    fn default_value(&self, key: &str) -> Option<Value> {
        (key == "color").then(|| Value::from("grey"))
    }
}

#[test]
fn test_listener_sees_every_notification() {
    let graph = Graph::new();
    let recorder = Arc::new(Recorder::default());
    graph.register_listener(recorder.clone()).unwrap();

    let (a, b) = (Node::new("a"), Node::new("b"));
    graph.add_nodes([&a, &b]).unwrap();
    graph.add_edge(&Edge::directed("ab", &a, &b, "T")).unwrap();
    graph.remove_node(&a).unwrap();
    let view = graph.create_view().unwrap();
    graph.destroy_view(&view).unwrap();
    graph.clear().unwrap();

    assert_eq!(
        *recorder.events.lock(),
        vec!["+na", "+nb", "+eab", "-eab", "-na", "-v0", "clear"]
    );

    let listener: Arc<dyn GraphListener> = recorder.clone();
    assert!(graph.unregister_listener(&listener).unwrap());
    assert!(!graph.unregister_listener(&listener).unwrap());
    assert_eq!(graph.listener_count(), 0);
    graph.add_node(&Node::new("c")).unwrap();
    assert_eq!(recorder.events.lock().len(), 7, "no events after unregistering");
}

#[test]
fn test_default_values_are_forwarded() {
    let graph = Graph::new();
    assert_eq!(graph.default_value("color"), None);
    graph.set_default_value_provider(Some(Arc::new(Defaults))).unwrap();
    assert_eq!(graph.default_value("color"), Some(Value::from("grey")));
    assert_eq!(graph.default_value("size"), None);
}
