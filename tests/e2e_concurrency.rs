//! End-to-end tests for the graph lock protocol across threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use propgraph::{Edge, Error, Graph, GraphConfig, Node};

// ============================================================================
// 1. Holds on one thread
// ============================================================================

#[test]
fn test_reads_nest_on_one_thread() {
    let graph = Graph::new();
    graph.add_node(&Node::new(1)).unwrap();

    let outer = graph.lock().read();
    let nodes = graph.nodes();
    assert_eq!(graph.read_hold_count(), 2);
    assert_eq!(graph.node_count(), 1, "plain reads nest under held reads");
    drop(nodes);
    drop(outer);
    assert_eq!(graph.read_hold_count(), 0);
}

#[test]
fn test_read_then_write_is_concurrency_fault() {
    let graph = Graph::new();
    let _read = graph.lock().read();
    assert!(matches!(graph.add_node(&Node::new(1)), Err(Error::Concurrency(_))));
    assert!(matches!(graph.clear(), Err(Error::Concurrency(_))));
    assert!(matches!(graph.create_view(), Err(Error::Concurrency(_))));
}

#[test]
fn test_writer_may_read_and_mutate() {
    let graph = Graph::new();
    let _write = graph.lock().write().unwrap();
    let (a, b) = (Node::new("a"), Node::new("b"));
    graph.add_nodes([&a, &b]).unwrap();
    graph.add_edge(&Edge::directed("ab", &a, &b, "T")).unwrap();
    assert_eq!(graph.nodes().count(), 2);
    assert!(graph.is_write_locked_by_current_thread());
}

#[test]
fn test_abandoned_iterator_released_by_unlock_all() {
    let graph = Graph::new();
    for i in 0..3 {
        graph.add_node(&Node::new(i)).unwrap();
    }

    let mut nodes = graph.nodes();
    assert!(nodes.next().is_some());
    assert!(matches!(graph.add_node(&Node::new(9)), Err(Error::Concurrency(_))));

    graph.lock().read_unlock_all();
    assert_eq!(graph.read_hold_count(), 0);
    assert!(graph.add_node(&Node::new(9)).unwrap());
    drop(nodes);
    assert_eq!(graph.read_hold_count(), 0);
}

#[test]
fn test_disowned_iterator_drop_keeps_newer_hold() {
    let graph = Graph::new();
    for i in 0..3 {
        graph.add_node(&Node::new(i)).unwrap();
    }

    let stale = graph.nodes();
    graph.lock().read_unlock_all();
    let mut fresh = graph.nodes();
    drop(stale);

    assert_eq!(graph.read_hold_count(), 1, "fresh iterator still holds its read");
    assert!(matches!(graph.add_node(&Node::new(9)), Err(Error::Concurrency(_))));

    let blocked = Arc::new(AtomicUsize::new(0));
    let handle = {
        let graph = graph.clone();
        let blocked = Arc::clone(&blocked);
        thread::spawn(move || {
            graph.add_node(&Node::new("other")).unwrap();
            blocked.store(1, Ordering::SeqCst);
        })
    };
    thread::sleep(Duration::from_millis(50));
    assert_eq!(blocked.load(Ordering::SeqCst), 0, "writer waits for the fresh hold");
    assert_eq!(fresh.by_ref().count(), 3);
    drop(fresh);

    handle.join().unwrap();
    assert_eq!(graph.node_count(), 4);
}

#[test]
fn test_unlocked_graph_accepts_everything() {
    let graph = Graph::with_config(GraphConfig::default().with_locking(false)).unwrap();
    for i in 0..4 {
        graph.add_node(&Node::new(i)).unwrap();
    }
    assert!(graph.is_write_locked_by_current_thread());
    assert_eq!(graph.read_hold_count(), 0);

    let mut nodes = graph.nodes();
    while nodes.next().is_some() {
        nodes.remove().unwrap();
    }
    drop(nodes);
    assert_eq!(graph.node_count(), 0);
}

// ============================================================================
// 2. Across threads
// ============================================================================

#[test]
fn test_writer_blocks_readers_on_other_threads() {
    let graph = Graph::new();
    let seen = Arc::new(AtomicUsize::new(usize::MAX));
    let write = graph.lock().write().unwrap();

    let handle = {
        let graph = graph.clone();
        let seen = Arc::clone(&seen);
        thread::spawn(move || {
            seen.store(graph.node_count(), Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert_eq!(seen.load(Ordering::SeqCst), usize::MAX, "reader must wait");
    for i in 0..5 {
        graph.add_node(&Node::new(i)).unwrap();
    }
    drop(write);

    handle.join().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 5, "reader sees the whole batch");
}

#[test]
fn test_parallel_writers_serialise() {
    let graph = Graph::new();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let graph = graph.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    graph.add_node(&Node::new(format!("t{t}-{i}"))).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(graph.node_count(), 1000);
    let mut sids: Vec<_> = graph.nodes().map(|n| n.store_id()).collect();
    sids.sort_unstable();
    assert_eq!(sids, (0..1000).collect::<Vec<_>>(), "store ids are dense");
}

#[test]
fn test_readers_run_alongside_each_other() {
    let graph = Graph::new();
    for i in 0..10 {
        graph.add_node(&Node::new(i)).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let graph = graph.clone();
            thread::spawn(move || graph.nodes().count())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 10);
    }
}
