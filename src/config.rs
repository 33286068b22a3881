//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default number of slots per arena block.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Which edge kinds a graph admits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    /// Directed edges only.
    Directed,
    /// Undirected edges only.
    Undirected,
    /// Both kinds side by side.
    #[default]
    Mixed,
}

impl GraphKind {
    /// Whether an edge with the given directedness may be stored.
    pub fn admits(self, directed: bool) -> bool {
        match self {
            GraphKind::Directed => directed,
            GraphKind::Undirected => !directed,
            GraphKind::Mixed => true,
        }
    }
}

/// Configuration for a [`GraphStore`](crate::GraphStore).
///
/// Every field has a default, so partial JSON documents are accepted:
///
/// ```rust
/// use propgraph::{GraphConfig, GraphKind};
///
/// let config = GraphConfig::from_json(r#"{"kind": "undirected", "edge_block_size": 64}"#).unwrap();
/// assert_eq!(config.kind, GraphKind::Undirected);
/// assert_eq!(config.edge_block_size, 64);
/// assert!(config.locking);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub kind: GraphKind,
    /// When false, [`GraphLock`](crate::GraphLock) is a pass-through.
    pub locking: bool,
    pub node_block_size: usize,
    pub edge_block_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            kind: GraphKind::Mixed,
            locking: true,
            node_block_size: DEFAULT_BLOCK_SIZE,
            edge_block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl GraphConfig {
    pub fn directed() -> Self {
        Self { kind: GraphKind::Directed, ..Self::default() }
    }

    pub fn undirected() -> Self {
        Self { kind: GraphKind::Undirected, ..Self::default() }
    }

    pub fn with_locking(mut self, locking: bool) -> Self {
        self.locking = locking;
        self
    }

    pub fn with_block_sizes(mut self, nodes: usize, edges: usize) -> Self {
        self.node_block_size = nodes;
        self.edge_block_size = edges;
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: GraphConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_block_size == 0 {
            return Err(Error::Config("node_block_size must be positive".into()));
        }
        if self.edge_block_size == 0 {
            return Err(Error::Config("edge_block_size must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.kind, GraphKind::Mixed);
        assert!(config.locking);
        assert_eq!(config.node_block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_from_json_partial() {
        let config = GraphConfig::from_json(r#"{"kind": "directed", "locking": false}"#).unwrap();
        assert_eq!(config.kind, GraphKind::Directed);
        assert!(!config.locking);
        assert_eq!(config.edge_block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_rejects_zero_block_size() {
        let err = GraphConfig::from_json(r#"{"node_block_size": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(GraphConfig::from_json("{kind"), Err(Error::Config(_))));
    }

    #[test]
    fn test_kind_admission() {
        assert!(GraphKind::Directed.admits(true));
        assert!(!GraphKind::Directed.admits(false));
        assert!(GraphKind::Undirected.admits(false));
        assert!(!GraphKind::Undirected.admits(true));
        assert!(GraphKind::Mixed.admits(true) && GraphKind::Mixed.admits(false));
    }
}
