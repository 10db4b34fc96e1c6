//! Ownership handles for nodes.
//!
//! - [`Owned`]: a standalone node, not held by any container.
//! - [`NodeRef`]: a non-owning reference to a node, usually a child.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::domain::error::{CompositionError, CompositionResult};
use crate::domain::node::Node;

/// A standalone node owned by the caller.
///
/// Created with [`Owned::new`] or returned by `separate`. Passing it to
/// `adopt` transfers ownership into a container.
pub struct Owned<T: Node> {
    inner: Arc<T>,
}

impl<T: Node> Owned<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: bind(value),
        }
    }

    pub(crate) fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    pub(crate) fn into_arc(self) -> Arc<T> {
        self.inner
    }

    /// Non-owning reference to this node.
    pub fn downgrade(&self) -> NodeRef<T> {
        NodeRef::new(&self.inner)
    }
}

impl<T: Node> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Node> AsRef<T> for Owned<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

impl<T: Node + fmt::Debug> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&*self.inner).finish()
    }
}

/// Non-owning reference to a node.
///
/// Stays valid while anything owns the node (a container or an [`Owned`]),
/// so a reference taken from a child survives `separate` and `adopt`.
pub struct NodeRef<T: Node> {
    inner: Weak<T>,
}

impl<T: Node> NodeRef<T> {
    pub(crate) fn new(node: &Arc<T>) -> Self {
        Self {
            inner: Arc::downgrade(node),
        }
    }

    pub fn upgrade(&self) -> Option<Arc<T>> {
        self.inner.upgrade()
    }

    pub fn try_upgrade(&self) -> CompositionResult<Arc<T>> {
        self.upgrade().ok_or(CompositionError::Expired {
            type_name: std::any::type_name::<T>(),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Runs `f` on the node if it still exists.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.upgrade().map(|node| f(&node))
    }

    pub fn ptr_eq(&self, other: &NodeRef<T>) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Node> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: Node> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("type", &std::any::type_name::<T>())
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Moves `value` into an `Arc` and gives its core a handle to itself.
pub(crate) fn bind<T: Node>(value: T) -> Arc<T> {
    let node = Arc::new(value);
    let erased: Arc<dyn Node> = node.clone();
    node.core().bind(Arc::downgrade(&erased));
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node_core::NodeCore;

    #[derive(Debug, Default)]
    struct Leaf {
        core: NodeCore,
    }

    impl Node for Leaf {
        fn core(&self) -> &NodeCore {
            &self.core
        }
    }

    #[test]
    fn given_owned_when_new_then_core_knows_its_handle() {
        let owned = Owned::new(Leaf::default());
        let handle = owned.core().handle().unwrap();
        assert!(handle.is::<Leaf>());
        assert!(!owned.core().is_attached());
    }

    #[test]
    fn given_owned_dropped_when_upgrade_then_expired() {
        let owned = Owned::new(Leaf::default());
        let weak = owned.downgrade();
        assert!(weak.is_alive());
        assert_eq!(weak.with(|leaf| leaf.core().is_attached()), Some(false));

        drop(owned);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
        assert!(matches!(
            weak.try_upgrade(),
            Err(CompositionError::Expired { .. })
        ));
    }

    #[test]
    fn given_two_refs_to_same_node_when_ptr_eq_then_true() {
        let owned = Owned::new(Leaf::default());
        let a = owned.downgrade();
        let b = a.clone();
        let other = Owned::new(Leaf::default());
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&other.downgrade()));
    }
}
