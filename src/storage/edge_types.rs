//! Edge type registry: label ↔ dense id.

use hashbrown::HashMap;
use tracing::trace;

use super::SlotAllocator;
use crate::{Error, Result, StoreId};

/// Most edge types that may be registered at once.
pub const MAX_EDGE_TYPES: usize = 65_534;

/// Bijective table between edge type labels and dense ids.
///
/// Ids index the per-type adjacency heads of every node, so they are kept
/// dense by recycling freed ids.
#[derive(Debug, Clone)]
pub struct EdgeTypeRegistry {
    labels: SlotAllocator<String>,
    ids: HashMap<String, StoreId>,
}

impl EdgeTypeRegistry {
    pub fn new() -> Self {
        Self { labels: SlotAllocator::linear(), ids: HashMap::new() }
    }

    /// Register `label`, or return its id when already registered.
    pub fn add_type(&mut self, label: &str) -> Result<StoreId> {
        if let Some(&id) = self.ids.get(label) {
            return Ok(id);
        }
        if self.labels.size() >= MAX_EDGE_TYPES {
            return Err(Error::Capacity(format!(
                "edge type registry is limited to {MAX_EDGE_TYPES} types"
            )));
        }
        let id = self.labels.alloc(label.to_owned())?;
        self.ids.insert(label.to_owned(), id);
        trace!(id, label, "edge_types.add");
        Ok(id)
    }

    /// Unregister `label`, returning the freed id. Unknown labels yield `None`.
    pub fn remove_type(&mut self, label: &str) -> Option<StoreId> {
        let id = self.ids.remove(label)?;
        self.labels.free(id);
        trace!(id, label, "edge_types.remove");
        Some(id)
    }

    /// Unregister by id, returning the freed label. Unknown ids yield `None`.
    pub fn remove_type_id(&mut self, id: StoreId) -> Option<String> {
        let label = self.labels.free(id)?;
        self.ids.remove(&label);
        Some(label)
    }

    pub fn id_of(&self, label: &str) -> Option<StoreId> {
        self.ids.get(label).copied()
    }

    /// Label for `id`; unknown or out-of-range ids are a fault.
    pub fn label_of(&self, id: StoreId) -> Result<&str> {
        self.labels.check_range(id)?;
        self.labels
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| Error::NotFound(format!("edge type {id} is not registered")))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.ids.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.labels.size()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// One past the highest id ever handed out.
    pub fn id_bound(&self) -> usize {
        self.labels.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StoreId, &str)> + '_ {
        self.labels.iter().map(|(id, label)| (id, label.as_str()))
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        self.ids.clear();
    }
}

impl Default for EdgeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut reg = EdgeTypeRegistry::new();
        let a = reg.add_type("KNOWS").unwrap();
        let b = reg.add_type("LIKES").unwrap();
        assert_ne!(a, b);
        assert_eq!(reg.add_type("KNOWS").unwrap(), a);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.label_of(b).unwrap(), "LIKES");
        assert_eq!(reg.id_of("KNOWS"), Some(a));
    }

    #[test]
    fn test_remove_recycles_id() {
        let mut reg = EdgeTypeRegistry::new();
        let a = reg.add_type("a").unwrap();
        reg.add_type("b").unwrap();
        assert_eq!(reg.remove_type("a"), Some(a));
        assert_eq!(reg.remove_type("a"), None);
        assert_eq!(reg.add_type("c").unwrap(), a);
        assert_eq!(reg.remove_type_id(a), Some("c".to_string()));
        assert_eq!(reg.remove_type_id(a), None);
        assert_eq!(reg.remove_type_id(500), None);
    }

    #[test]
    fn test_label_of_unknown_is_fault() {
        let mut reg = EdgeTypeRegistry::new();
        assert!(matches!(reg.label_of(0), Err(Error::NotFound(_))));
        let id = reg.add_type("x").unwrap();
        reg.remove_type("x");
        assert!(matches!(reg.label_of(id), Err(Error::NotFound(_))));
        assert!(matches!(reg.label_of(-3), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_capacity_limit() {
        let mut reg = EdgeTypeRegistry::new();
        for i in 0..MAX_EDGE_TYPES {
            reg.add_type(&i.to_string()).unwrap();
        }
        assert_eq!(reg.len(), MAX_EDGE_TYPES);
        assert!(matches!(reg.add_type("overflow"), Err(Error::Capacity(_))));
        // existing labels still resolve
        assert_eq!(reg.add_type("0").unwrap(), 0);
        reg.remove_type("17");
        assert_eq!(reg.add_type("overflow").unwrap(), 17);
    }
}
