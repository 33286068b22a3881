//! End-to-end tests for node and edge storage through the locked facade.
//!
//! Each test builds a fresh `Graph`, mutates it, and checks arena
//! accounting, adjacency and the fault taxonomy.

use pretty_assertions::assert_eq;
use propgraph::{Direction, Edge, ElementId, Error, Graph, GraphConfig, GraphKind, MAX_EDGE_TYPES, Node, Phase};

fn nodes(graph: &Graph, n: usize) -> Vec<Node> {
    let handles: Vec<Node> = (0..n).map(Node::new).collect();
    graph.add_nodes(&handles).unwrap();
    handles
}

// ============================================================================
// 1. Add / get / remove
// ============================================================================

#[test]
fn test_add_and_lookup() {
    let graph = Graph::new();
    let ada = Node::new("ada").with_property("name", "Ada");
    assert!(graph.add_node(&ada).unwrap());
    assert!(!graph.add_node(&ada).unwrap(), "same instance is not a fault");

    let sid = ada.store_id();
    assert_eq!(graph.node(sid).unwrap(), Some(ada.clone()));
    assert_eq!(graph.node_by_id("ada"), Some(ada.clone()));
    assert_eq!(graph.node_by_id("nobody"), None);
    assert!(matches!(graph.node(sid + 1), Err(Error::NotFound(_))));
    assert!(matches!(graph.node(-1), Err(Error::NotFound(_))));
    assert_eq!(ada.property("name"), Some("Ada".into()));
}

#[test]
fn test_fault_taxonomy() {
    let graph = Graph::new();
    let other = Graph::new();
    let a = Node::new("a");
    let b = Node::new("b");
    graph.add_nodes([&a, &b]).unwrap();

    assert!(matches!(graph.add_node(&Node::new("")), Err(Error::NullInput(_))));
    assert!(matches!(graph.add_node(&Node::new("a")), Err(Error::Duplicate(_))));
    assert!(matches!(other.add_node(&a), Err(Error::Ownership(_))));
    assert!(matches!(other.remove_node(&a), Err(Error::Ownership(_))));
    assert!(!graph.remove_node(&Node::new("never-added")).unwrap());

    let stray = Node::new("stray");
    assert!(matches!(
        graph.add_edge(&Edge::directed(1, &a, &stray, "T")),
        Err(Error::Ownership(_))
    ));
    graph.add_edge(&Edge::directed(1, &a, &b, "T")).unwrap();
    assert!(matches!(
        graph.add_edge(&Edge::directed(1, &b, &a, "T")),
        Err(Error::Duplicate(_))
    ));
    assert!(matches!(graph.add_edge(&Edge::directed("", &b, &a, "T")), Err(Error::NullInput(_))));
}

#[test]
fn test_remove_node_removes_incident_edges() {
    let graph = Graph::new();
    let n = nodes(&graph, 3);
    let ab = Edge::directed("ab", &n[0], &n[1], "T");
    let cb = Edge::directed("cb", &n[2], &n[1], "T");
    let ac = Edge::directed("ac", &n[0], &n[2], "T");
    graph.add_edges([&ab, &cb, &ac]).unwrap();

    assert!(graph.remove_node(&n[1]).unwrap());
    assert!(!ab.is_stored());
    assert!(!cb.is_stored());
    assert!(ac.is_stored());
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.out_degree(&n[0]).unwrap(), 1);
}

// ============================================================================
// 2. Directed, undirected, mutual, self-loops
// ============================================================================

#[test]
fn test_undirected_contains_both_orientations() {
    let graph = Graph::new();
    let n = nodes(&graph, 2);
    let e = Edge::undirected("uv", &n[0], &n[1], "LINK");
    graph.add_edge(&e).unwrap();

    assert_eq!(graph.get_edge(&n[0], &n[1], "LINK").unwrap(), Some(e.clone()));
    assert_eq!(graph.get_edge(&n[1], &n[0], "LINK").unwrap(), Some(e.clone()));
    assert!(!graph.has_edge(&n[0], &n[1], "OTHER").unwrap());
    assert_eq!(graph.get_edge_any_type(&n[1], &n[0]).unwrap(), Some(e));
}

#[test]
fn test_directed_lookup_is_one_way() {
    let graph = Graph::new();
    let n = nodes(&graph, 2);
    graph.add_edge(&Edge::directed("uv", &n[0], &n[1], "T")).unwrap();
    assert!(graph.has_edge(&n[0], &n[1], "T").unwrap());
    assert!(!graph.has_edge(&n[1], &n[0], "T").unwrap());
}

#[test]
fn test_mutual_pair_tie_break() {
    let graph = Graph::new();
    let n = nodes(&graph, 2);
    let (u, v) = (&n[0], &n[1]);
    let uv = Edge::directed("uv", u, v, "T");
    let vu = Edge::directed("vu", v, u, "T");
    graph.add_edges([&uv, &vu]).unwrap();

    assert_eq!(graph.mutual_edge_count(), 1);
    assert_eq!(graph.undirected_edge_count(), 1);
    assert_eq!(graph.mutual_degree(u).unwrap(), 1);
    assert_eq!(graph.undirected_degree(u).unwrap(), 1);

    let folded: Vec<Edge> = graph.undirected_edges().collect();
    assert_eq!(folded, vec![vu.clone()], "source store id 1 > target store id 0");

    let around: Vec<Edge> = graph.adjacent_edges(u, Direction::Both, None, true).unwrap().collect();
    assert_eq!(around, vec![vu]);
}

#[test]
fn test_self_loop() {
    let graph = Graph::new();
    let n = nodes(&graph, 1);
    let u = &n[0];
    let before = graph.degree(u).unwrap();
    graph.add_edge(&Edge::directed("loop", u, u, "SELF")).unwrap();

    assert_eq!(graph.out_degree(u).unwrap(), 1);
    assert_eq!(graph.in_degree(u).unwrap(), 1);
    assert_eq!(graph.degree(u).unwrap(), before + 2);
    assert!(matches!(
        graph.add_edge(&Edge::directed("loop2", u, u, "SELF")),
        Err(Error::Duplicate(_))
    ));

    let mut it = graph.adjacent_edges(u, Direction::Both, None, true).unwrap();
    assert!(it.next().is_some());
    assert_eq!(it.phase(), Some(Phase::Out));
    assert!(it.next().is_none(), "self-loop emitted once in an undirected walk");
}

#[test]
fn test_graph_kind_admission() {
    let directed = Graph::with_config(GraphConfig::directed()).unwrap();
    let n = nodes(&directed, 2);
    assert!(matches!(
        directed.add_edge(&Edge::undirected(1, &n[0], &n[1], "T")),
        Err(Error::Usage(_))
    ));

    let undirected = Graph::with_config(GraphConfig::undirected()).unwrap();
    assert_eq!(undirected.kind(), GraphKind::Undirected);
    let m = nodes(&undirected, 2);
    assert!(matches!(
        undirected.add_edge(&Edge::directed(1, &m[0], &m[1], "T")),
        Err(Error::Usage(_))
    ));
}

#[test]
fn test_neighbors_and_typed_walks() {
    let graph = Graph::new();
    let n = nodes(&graph, 4);
    graph.add_edge(&Edge::directed("01", &n[0], &n[1], "A")).unwrap();
    graph.add_edge(&Edge::directed("02", &n[0], &n[2], "B")).unwrap();
    graph.add_edge(&Edge::directed("30", &n[3], &n[0], "A")).unwrap();
    graph.add_edge(&Edge::directed("01b", &n[0], &n[1], "B")).unwrap();

    let mut out = graph.neighbors(&n[0], Direction::Outgoing).unwrap();
    out.sort_by(|a, b| a.id().cmp(b.id()));
    assert_eq!(out, vec![n[1].clone(), n[2].clone()]);
    assert_eq!(graph.neighbors(&n[0], Direction::Incoming).unwrap(), vec![n[3].clone()]);

    let typed: Vec<Edge> = graph.adjacent_edges(&n[0], Direction::Outgoing, Some("A"), false).unwrap().collect();
    assert_eq!(typed.len(), 1);
    assert_eq!(typed[0].id(), &ElementId::from("01"));
    assert_eq!(graph.degree_of_type(&n[0], Direction::Both, "A").unwrap(), 2);
    assert_eq!(graph.edge_count_of_type("B"), 2);
}

// ============================================================================
// 3. Arena accounting
// ============================================================================

#[test]
fn test_reverse_readd_restores_order() {
    let graph = Graph::new();
    let n = nodes(&graph, 10);
    let mut all = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            if (i + j) % 3 == 0 && i != j {
                let e = Edge::directed(format!("{i}-{j}"), &n[i], &n[j], "T");
                graph.add_edge(&e).unwrap();
                all.push(e);
            }
        }
    }
    let original: Vec<Edge> = graph.edges().collect();

    let removed: Vec<Edge> = all.iter().step_by(3).cloned().collect();
    for e in &removed {
        graph.remove_edge(e).unwrap();
    }
    for e in removed.iter().rev() {
        graph.add_edge(e).unwrap();
    }
    let restored: Vec<Edge> = graph.edges().collect();
    assert_eq!(restored, original);
    assert_eq!(graph.mutual_edge_count(), all.len() - graph.undirected_edge_count());
}

#[test]
fn test_reverse_readd_across_reclaimed_block() {
    let graph = Graph::with_config(GraphConfig::default().with_block_sizes(4, 2)).unwrap();
    let n = nodes(&graph, 3);
    let edges: Vec<Edge> = (0..4)
        .map(|i| Edge::directed(i, &n[i % 3], &n[(i + 1) % 3], format!("T{i}")))
        .collect();
    graph.add_edges(&edges).unwrap();
    let original: Vec<Edge> = graph.edges().collect();

    graph.remove_edge(&edges[2]).unwrap();
    graph.remove_edge(&edges[3]).unwrap();
    assert_eq!(graph.with_store(|s| s.edges().block_count()), 1);

    graph.add_edge(&edges[3]).unwrap();
    graph.add_edge(&edges[2]).unwrap();
    assert_eq!(graph.with_store(|s| s.edges().block_count()), 2);
    assert_eq!(edges[2].store_id(), 2);
    assert_eq!(edges[3].store_id(), 3);
    let restored: Vec<Edge> = graph.edges().collect();
    assert_eq!(restored, original);
}

#[test]
fn test_bulk_add_keeps_prefix_before_fault() {
    let graph = Graph::new();
    let obs = graph.create_observer(false).unwrap();
    let batch = [Node::new("a"), Node::new("b"), Node::new("a"), Node::new("c")];

    assert!(matches!(graph.add_nodes(&batch), Err(Error::Duplicate(_))));
    assert_eq!(graph.node_count(), 2);
    assert!(batch[0].is_stored() && batch[1].is_stored());
    assert!(!batch[2].is_stored() && !batch[3].is_stored());
    assert!(obs.has_changed().unwrap(), "the applied prefix is a change");

    let a = &batch[0];
    let stray = Node::new("stray");
    let edges = [Edge::directed(1, a, &batch[1], "T"), Edge::directed(2, a, &stray, "T")];
    assert!(matches!(graph.add_edges(&edges), Err(Error::Ownership(_))));
    assert_eq!(graph.edge_count(), 1);
    assert!(graph.contains_edge(&edges[0]));
}

#[test]
fn test_block_accounting() {
    let graph = Graph::with_config(GraphConfig::default().with_block_sizes(4, 4)).unwrap();
    let n = nodes(&graph, 6);
    let edges: Vec<Edge> = (0..10)
        .map(|i| Edge::directed(i, &n[i % 6], &n[(i + 1) % 6], format!("T{}", i / 6)))
        .collect();
    graph.add_edges(&edges).unwrap();
    assert_eq!(graph.with_store(|s| s.edges().block_count()), 3);

    graph.remove_edges(&edges[8..]).unwrap();
    assert_eq!(graph.with_store(|s| s.edges().block_count()), 2);
    assert_eq!(graph.with_store(|s| s.edges().garbage_len()), 2);

    graph.remove_edge(&edges[2]).unwrap();
    assert_eq!(graph.with_store(|s| s.edges().garbage_len()), 3);

    graph.clear().unwrap();
    graph.with_store(|s| {
        assert_eq!(s.nodes().block_count(), 1);
        assert_eq!(s.edges().block_count(), 1);
        assert_eq!(s.node_count(), 0);
        assert_eq!(s.edge_count(), 0);
        assert_eq!(s.nodes().garbage_len(), 0);
        assert_eq!(s.edges().garbage_len(), 0);
    });
    assert!(n.iter().all(|node| !node.is_stored()));
    assert_eq!(graph.edge_type_count(), 2, "edge types survive clear()");
}

#[test]
fn test_clear_edges_then_rebuild() {
    let graph = Graph::new();
    let n = nodes(&graph, 3);
    graph.add_edge(&Edge::directed("a", &n[0], &n[1], "T")).unwrap();
    graph.add_edge(&Edge::directed("b", &n[1], &n[0], "T")).unwrap();
    graph.clear_edges().unwrap();
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.mutual_edge_count(), 0);
    assert_eq!(graph.mutual_degree(&n[0]).unwrap(), 0);
    assert!(graph.out_edges(&n[0]).unwrap().next().is_none());
    assert!(graph.add_edge(&Edge::directed("a2", &n[0], &n[1], "T")).unwrap());
}

// ============================================================================
// 4. Edge types
// ============================================================================

#[test]
fn test_edge_type_capacity() {
    let graph = Graph::new();
    for i in 0..MAX_EDGE_TYPES {
        graph.add_edge_type(&i.to_string()).unwrap();
    }
    assert_eq!(graph.edge_type_count(), 65_534);
    assert!(matches!(graph.add_edge_type("65534"), Err(Error::Capacity(_))));
    assert_eq!(graph.add_edge_type("17").unwrap(), 17, "existing labels are still idempotent");

    assert_eq!(graph.remove_edge_type("100").unwrap(), Some(100));
    assert_eq!(graph.add_edge_type("fresh").unwrap(), 100);
}

#[test]
fn test_edge_type_lookup() {
    let graph = Graph::new();
    let id = graph.add_edge_type("KNOWS").unwrap();
    assert_eq!(graph.edge_type_id("KNOWS"), Some(id));
    assert_eq!(graph.edge_type_label(id).unwrap(), "KNOWS");
    assert!(matches!(graph.edge_type_label(id + 1), Err(Error::NotFound(_))));
    assert_eq!(graph.remove_edge_type("NOPE").unwrap(), None);
}

#[test]
fn test_remove_edge_type_by_id() {
    let graph = Graph::new();
    let n = nodes(&graph, 2);
    let e = Edge::directed("ab", &n[0], &n[1], "KNOWS");
    graph.add_edge(&e).unwrap();
    let id = graph.edge_type_id("KNOWS").unwrap();

    assert!(matches!(graph.remove_edge_type_id(id), Err(Error::Usage(_))));
    assert_eq!(graph.remove_edge_type_id(-1).unwrap(), None);
    graph.remove_edge(&e).unwrap();
    assert_eq!(graph.remove_edge_type_id(id).unwrap(), Some("KNOWS".to_string()));
    assert_eq!(graph.edge_type_id("KNOWS"), None);
    assert_eq!(graph.edge_type_count(), 0);
}

// ============================================================================
// 5. Payload
// ============================================================================

#[test]
fn test_weight_and_properties_mutate_in_place() {
    let graph = Graph::new();
    let n = nodes(&graph, 2);
    let e = Edge::directed("w", &n[0], &n[1], "T").with_weight(2.5);
    graph.add_edge(&e).unwrap();

    let fetched = graph.edge_by_id("w").unwrap();
    assert_eq!(fetched.weight(), 2.5);
    fetched.set_weight(4.0);
    fetched.set_property("since", 2020i64);
    assert_eq!(e.weight(), 4.0);
    assert_eq!(e.property("since"), Some(2020i64.into()));
}
