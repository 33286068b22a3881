//! # Views
//!
//! A view is a filter over the stored nodes and edges, kept as two bitsets
//! indexed by store id. Views are created and destroyed independently of the
//! entities they filter; destroying one only drops the filter and its
//! observers.
//!
//! | Item | Module | Description |
//! |------|--------|-------------|
//! | `ViewStore` | here | view arena, visible-view pointer |
//! | `GraphView` | `graph_view` | bitsets, algebra, version counters |
//! | `NodeGroupTree` | `hierarchy` | collapse / expand of node groups |
//! | `GraphObserver` | `observer` | change detection and diffs |

pub mod graph_view;
pub mod hierarchy;
pub mod observer;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use tracing::debug;

use crate::storage::{SlotAllocator, StoreToken};
use crate::{Error, NULL_ID, Result, StoreId};

pub use graph_view::{GraphView, Membership, Version, ViewKind};
pub use hierarchy::NodeGroupTree;
pub use observer::{GraphDiff, GraphObserver};

// ============================================================================
// View handle
// ============================================================================

/// Handle to a view. Cheap to clone; compared by identity.
///
/// A destroyed handle stays destroyed even after its id is recycled for a
/// new view.
#[derive(Clone)]
pub struct View {
    inner: Arc<ViewInner>,
}

struct ViewInner {
    store_id: AtomicI32,
    owner: StoreToken,
    hierarchical: bool,
    destroyed: AtomicBool,
}

impl View {
    fn new(owner: StoreToken, hierarchical: bool) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                store_id: AtomicI32::new(NULL_ID),
                owner,
                hierarchical,
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub fn store_id(&self) -> StoreId {
        self.inner.store_id.load(Ordering::Acquire)
    }

    pub fn is_hierarchical(&self) -> bool {
        self.inner.hierarchical
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn owner(&self) -> StoreToken {
        self.inner.owner
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for View {}

impl Hash for View {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("store_id", &self.store_id())
            .field("hierarchical", &self.inner.hierarchical)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

// ============================================================================
// ViewStore
// ============================================================================

/// Arena of live views plus the visible-view pointer.
#[derive(Debug)]
pub struct ViewStore {
    token: StoreToken,
    views: SlotAllocator<GraphView>,
    /// `None` means the main (unfiltered) graph is visible.
    visible: Option<View>,
}

impl ViewStore {
    pub(crate) fn new(token: StoreToken) -> Self {
        Self { token, views: SlotAllocator::linear(), visible: None }
    }

    /// Allocate a view, copying the membership of `base` at creation time.
    pub(crate) fn create(&mut self, hierarchical: bool, base: Option<&View>) -> Result<View> {
        let seed = match base {
            Some(b) => Some(self.get(b)?.clone()),
            None => None,
        };
        let handle = View::new(self.token, hierarchical);
        let kind = if hierarchical {
            ViewKind::Hierarchical(NodeGroupTree::new())
        } else {
            ViewKind::Flat
        };
        let mut record = GraphView::new(handle.clone(), kind);
        if let Some(seed) = &seed {
            record.copy_membership(seed);
        }
        let sid = self.views.alloc(record)?;
        handle.inner.store_id.store(sid, Ordering::Release);
        debug!(view = sid, hierarchical, "views.create");
        Ok(handle)
    }

    fn check(&self, view: &View) -> Result<StoreId> {
        if view.owner() != self.token {
            return Err(Error::Ownership("view belongs to another store".into()));
        }
        if view.is_destroyed() {
            return Err(Error::Usage(format!("view {} is destroyed", view.store_id())));
        }
        Ok(view.store_id())
    }

    pub fn get(&self, view: &View) -> Result<&GraphView> {
        let sid = self.check(view)?;
        self.views
            .get(sid)
            .ok_or_else(|| Error::NotFound(format!("view {sid}")))
    }

    pub(crate) fn get_mut(&mut self, view: &View) -> Result<&mut GraphView> {
        let sid = self.check(view)?;
        self.views
            .get_mut(sid)
            .ok_or_else(|| Error::NotFound(format!("view {sid}")))
    }

    /// Free the view and hand back its record; resets the visible view if
    /// it was this one.
    pub(crate) fn destroy(&mut self, view: &View) -> Result<GraphView> {
        let sid = self.check(view)?;
        let record = self
            .views
            .free(sid)
            .ok_or_else(|| Error::NotFound(format!("view {sid}")))?;
        view.inner.destroyed.store(true, Ordering::Release);
        if self.visible.as_ref() == Some(view) {
            self.visible = None;
        }
        debug!(view = sid, "views.destroy");
        Ok(record)
    }

    pub fn visible(&self) -> Option<&View> {
        self.visible.as_ref()
    }

    /// Select the visible view; `None` selects the main graph.
    pub(crate) fn set_visible(&mut self, view: Option<&View>) -> Result<()> {
        if let Some(v) = view {
            self.check(v)?;
        }
        self.visible = view.cloned();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.views.size()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphView> + '_ {
        self.views.iter().map(|(_, v)| v)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut GraphView> + '_ {
        self.views.iter_mut().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::next_store_token;

    #[test]
    fn test_create_and_destroy() {
        let mut views = ViewStore::new(next_store_token());
        let a = views.create(false, None).unwrap();
        let b = views.create(true, None).unwrap();
        assert_eq!(views.len(), 2);
        assert!(b.is_hierarchical());
        views.destroy(&a).unwrap();
        assert!(a.is_destroyed());
        assert!(matches!(views.destroy(&a), Err(Error::Usage(_))));
        assert!(matches!(views.get(&a), Err(Error::Usage(_))));
        let c = views.create(false, None).unwrap();
        assert_eq!(c.store_id(), a.store_id(), "id recycled");
        assert!(matches!(views.get(&a), Err(Error::Usage(_))), "old handle stays dead");
        assert!(views.get(&c).is_ok());
    }

    #[test]
    fn test_foreign_view_rejected() {
        let mut left = ViewStore::new(next_store_token());
        let mut right = ViewStore::new(next_store_token());
        let v = left.create(false, None).unwrap();
        assert!(matches!(right.get(&v), Err(Error::Ownership(_))));
        assert!(matches!(right.destroy(&v), Err(Error::Ownership(_))));
        assert!(matches!(right.set_visible(Some(&v)), Err(Error::Ownership(_))));
    }

    #[test]
    fn test_visible_reset_on_destroy() {
        let mut views = ViewStore::new(next_store_token());
        let v = views.create(false, None).unwrap();
        views.set_visible(Some(&v)).unwrap();
        assert_eq!(views.visible(), Some(&v));
        views.destroy(&v).unwrap();
        assert_eq!(views.visible(), None);
    }
}
