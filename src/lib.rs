//! # propgraph: In-Memory Property Graph Store
//!
//! A mutable property graph held entirely in memory: nodes and edges live in
//! block-allocated arenas with dense, recyclable integer identities, and
//! adjacency is threaded through the edge records themselves.
//!
//! ## Design Principles
//!
//! 1. **Arenas, not heaps**: every entity is a slot in a [`storage::SlotAllocator`];
//!    adjacency chains are `next`/`prev` indices inside edge slots
//! 2. **Handles are instances**: [`Node`] and [`Edge`] are shared handles; the
//!    store decides "already present" by instance identity
//! 3. **Views are bitsets**: a [`View`] filters the graph without copying it
//! 4. **One lock discipline**: [`GraphLock`] brackets every public call
//!
//! ## Quick Start
//!
//! ```rust
//! use propgraph::{Edge, Graph, Node};
//!
//! # fn example() -> propgraph::Result<()> {
//! let graph = Graph::new();
//!
//! let ada = Node::new("ada").with_property("name", "Ada");
//! let bob = Node::new("bob");
//! graph.add_node(&ada)?;
//! graph.add_node(&bob)?;
//! graph.add_edge(&Edge::directed(1, &ada, &bob, "KNOWS"))?;
//!
//! assert_eq!(graph.out_degree(&ada)?, 1);
//! for edge in graph.out_edges(&ada)? {
//!     println!("{} -> {}", edge.source().id(), edge.target().id());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! | Layer | Module | Description |
//! |-------|--------|-------------|
//! | Locked facade | [`graph`] | `Graph`, `Subgraph`, lock-holding iterators |
//! | Composite store | [`storage`] | arenas, adjacency chains, edge types |
//! | Views | [`view`] | bitset membership, node groups, observers |
//! | Hooks | [`index`] | notifications for external secondary indexes |

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod graph;
pub mod index;
pub mod lock;
pub mod model;
pub mod storage;
pub mod view;

// ============================================================================
// Re-exports: Model (the handles)
// ============================================================================

pub use model::{Direction, Edge, ElementId, Interval, Node, Phase, PropertyMap, Value};

// ============================================================================
// Re-exports: Storage, views, locking
// ============================================================================

pub use config::{GraphConfig, GraphKind};
pub use graph::{EdgeIter, Graph, NodeIter, Subgraph};
pub use index::{DefaultValueProvider, GraphListener};
pub use lock::{GraphLock, ReadGuard, WriteGuard};
pub use storage::{EdgeTypeRegistry, GraphStore, SlotAllocator, MAX_EDGE_TYPES};
pub use view::{GraphDiff, GraphObserver, View};

// ============================================================================
// Identity vocabulary
// ============================================================================

/// Dense arena index of a live entity, view or edge type.
pub type StoreId = i32;

/// Sentinel store id meaning "not currently stored" / "end of chain".
pub const NULL_ID: StoreId = -1;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Null input: {0}")]
    NullInput(String),

    #[error("Ownership error: {0}")]
    Ownership(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("Concurrency error: {0}")]
    Concurrency(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
