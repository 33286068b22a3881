//! Node groups of hierarchical views.
//!
//! A group is a representative node with child nodes; children may be groups
//! themselves. Collapsing a group hides every descendant, so a node is hidden
//! exactly when one of its ancestors is collapsed.

use hashbrown::{HashMap, HashSet};

use crate::{Error, Result, StoreId};

/// Forest of node groups, keyed by node store id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeGroupTree {
    parent: HashMap<StoreId, StoreId>,
    children: HashMap<StoreId, Vec<StoreId>>,
    collapsed: HashSet<StoreId>,
}

impl NodeGroupTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `members` children of `representative`.
    ///
    /// A member already in another group moves. A member that is the
    /// representative or one of its ancestors would close a cycle and is
    /// rejected before anything changes.
    pub fn group(&mut self, representative: StoreId, members: &[StoreId]) -> Result<()> {
        for &m in members {
            if m == representative || self.is_ancestor(m, representative) {
                return Err(Error::Usage(format!(
                    "node {m} cannot join the group of {representative}: it would contain itself"
                )));
            }
        }
        for &m in members {
            self.detach(m);
            self.parent.insert(m, representative);
            self.children.entry(representative).or_default().push(m);
        }
        Ok(())
    }

    /// Dissolve the group of `representative`; its children move to its parent.
    pub fn ungroup(&mut self, representative: StoreId) -> bool {
        let Some(kids) = self.children.remove(&representative) else {
            return false;
        };
        self.collapsed.remove(&representative);
        let grand = self.parent.get(&representative).copied();
        for kid in kids {
            match grand {
                Some(g) => {
                    self.parent.insert(kid, g);
                    self.children.entry(g).or_default().push(kid);
                }
                None => {
                    self.parent.remove(&kid);
                }
            }
        }
        true
    }

    pub fn is_group(&self, node: StoreId) -> bool {
        self.children.contains_key(&node)
    }

    /// Hide every descendant of `representative`. False if not a group or already collapsed.
    pub fn collapse(&mut self, representative: StoreId) -> bool {
        self.is_group(representative) && self.collapsed.insert(representative)
    }

    /// Show the children of `representative` again. False if it was not collapsed.
    pub fn expand(&mut self, representative: StoreId) -> bool {
        self.collapsed.remove(&representative)
    }

    pub fn is_collapsed(&self, node: StoreId) -> bool {
        self.collapsed.contains(&node)
    }

    /// Whether a collapsed ancestor hides `node`.
    pub fn is_hidden(&self, node: StoreId) -> bool {
        self.ancestors(node).any(|a| self.collapsed.contains(&a))
    }

    pub fn parent(&self, node: StoreId) -> Option<StoreId> {
        self.parent.get(&node).copied()
    }

    pub fn children(&self, node: StoreId) -> &[StoreId] {
        self.children.get(&node).map_or(&[], Vec::as_slice)
    }

    /// The node that currently stands in for `node`: its outermost collapsed
    /// ancestor, or `node` itself.
    pub fn map_to_visible(&self, node: StoreId) -> StoreId {
        let mut visible = node;
        for a in self.ancestors(node) {
            if self.collapsed.contains(&a) {
                visible = a;
            }
        }
        visible
    }

    /// The raw nodes `node` stands in for: itself, plus every descendant when
    /// it is a collapsed group.
    pub fn map_with_hidden(&self, node: StoreId) -> Vec<StoreId> {
        let mut out = vec![node];
        if self.collapsed.contains(&node) {
            self.collect_descendants(node, &mut out);
        }
        out
    }

    pub fn descendants(&self, node: StoreId) -> Vec<StoreId> {
        let mut out = Vec::new();
        self.collect_descendants(node, &mut out);
        out
    }

    /// Forget a node that left the store. Its children become roots.
    pub fn remove_node(&mut self, node: StoreId) {
        self.detach(node);
        self.collapsed.remove(&node);
        if let Some(kids) = self.children.remove(&node) {
            for kid in kids {
                self.parent.remove(&kid);
            }
        }
    }

    pub fn clear(&mut self) {
        self.parent.clear();
        self.children.clear();
        self.collapsed.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn detach(&mut self, node: StoreId) {
        if let Some(old) = self.parent.remove(&node) {
            if let Some(siblings) = self.children.get_mut(&old) {
                siblings.retain(|&s| s != node);
                if siblings.is_empty() {
                    self.children.remove(&old);
                    self.collapsed.remove(&old);
                }
            }
        }
    }

    fn collect_descendants(&self, node: StoreId, out: &mut Vec<StoreId>) {
        let mut stack: Vec<StoreId> = self.children(node).to_vec();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend_from_slice(self.children(n));
        }
    }

    fn is_ancestor(&self, candidate: StoreId, node: StoreId) -> bool {
        self.ancestors(node).any(|a| a == candidate)
    }

    fn ancestors(&self, node: StoreId) -> impl Iterator<Item = StoreId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }
}
