//! Structural operations available on every node.

use std::collections::hash_map;
use std::sync::Arc;

use parking_lot::RwLockReadGuard;
use tracing::{error, instrument, trace};

use crate::domain::node_core::{self, ChildMap};
use crate::domain::error::{CompositionError, CompositionResult};
use crate::domain::handle::{bind, NodeRef, Owned};
use crate::domain::key::TypeKey;
use crate::domain::node::{downcast_arc, Node};

/// Type-keyed composition API, implemented for every [`Node`] (and for
/// `dyn Node`).
///
/// At most one child per concrete type is held. Installing a second child of
/// the same type replaces the first.
pub trait Compose {
    /// Whether a child of exact type `T` exists.
    fn has<T: Node>(&self) -> bool;

    /// Non-owning reference to the child of type `T`.
    fn get<T: Node>(&self) -> Option<NodeRef<T>>;

    /// Like [`Compose::get`], but absence is an error and the child is
    /// returned as a strong handle.
    fn require<T: Node>(&self) -> CompositionResult<Arc<T>>;

    /// Installs `value` as the child of type `T`, replacing any previous one.
    ///
    /// Replacement fires, in order: the owner's `on_component_detached(old)`,
    /// the old child's `on_detached_from_component`, then, once the new child
    /// is in the map and points back to the owner, the owner's
    /// `on_component_attached(new)` and the new child's
    /// `on_attached_to_component`.
    ///
    /// Fails with [`CompositionError::Unbound`] when `self` was never wrapped
    /// in a handle ([`Owned::new`] or a previous `add`), since the child could
    /// not point back to it.
    fn add<T: Node>(&self, value: T) -> CompositionResult<NodeRef<T>>;

    /// Installs a standalone node exactly as [`Compose::add`] would.
    ///
    /// Also fails with [`CompositionError::CycleDetected`] when `node`'s
    /// subtree already contains `self`.
    fn adopt<T: Node>(&self, node: Owned<T>) -> CompositionResult<NodeRef<T>>;

    /// The existing child of type `T`, or a default one installed via `add`.
    fn acquire<T: Node + Default>(&self) -> CompositionResult<NodeRef<T>>;

    /// Detaches and drops the child of type `T`. No-op when absent.
    fn remove<T: Node>(&self);

    /// Takes the child of type `T` out of the map as a standalone node.
    fn separate<T: Node>(&self) -> Option<Owned<T>>;

    /// Detaches every child; returns how many there were.
    fn clear(&self) -> usize;

    /// Read-only view of all children.
    ///
    /// Holds this node's map lock for reading: structural operations on the
    /// same node wait until the view is dropped.
    fn components(&self) -> Components<'_>;
}

impl<N: Node + ?Sized> Compose for N {
    fn has<T: Node>(&self) -> bool {
        self.core().contains(&TypeKey::of::<T>())
    }

    fn get<T: Node>(&self) -> Option<NodeRef<T>> {
        let key = TypeKey::of::<T>();
        let child = self.core().child(&key)?;
        trace!(component = key.name(), "get");
        match downcast_arc::<T>(child) {
            Some(node) => Some(NodeRef::new(&node)),
            None => {
                error!(component = key.name(), "stored child does not match its key");
                None
            }
        }
    }

    fn require<T: Node>(&self) -> CompositionResult<Arc<T>> {
        self.get::<T>()
            .and_then(|node| node.upgrade())
            .ok_or(CompositionError::NotFound {
                type_name: std::any::type_name::<T>(),
            })
    }

    #[instrument(level = "debug", skip(self, value), fields(component = std::any::type_name::<T>()))]
    fn add<T: Node>(&self, value: T) -> CompositionResult<NodeRef<T>> {
        let node = bind(value);
        let reference = NodeRef::new(&node);
        node_core::install(self.as_node(), TypeKey::of::<T>(), node)?;
        Ok(reference)
    }

    #[instrument(level = "debug", skip(self, node), fields(component = std::any::type_name::<T>()))]
    fn adopt<T: Node>(&self, node: Owned<T>) -> CompositionResult<NodeRef<T>> {
        let node = node.into_arc();
        let reference = NodeRef::new(&node);
        node_core::install(self.as_node(), TypeKey::of::<T>(), node)?;
        Ok(reference)
    }

    fn acquire<T: Node + Default>(&self) -> CompositionResult<NodeRef<T>> {
        let _guard = self.core().structural_guard();
        match self.get::<T>() {
            Some(existing) => Ok(existing),
            None => self.add(T::default()),
        }
    }

    #[instrument(level = "debug", skip(self), fields(component = std::any::type_name::<T>()))]
    fn remove<T: Node>(&self) {
        node_core::remove(self.as_node(), TypeKey::of::<T>());
    }

    #[instrument(level = "debug", skip(self), fields(component = std::any::type_name::<T>()))]
    fn separate<T: Node>(&self) -> Option<Owned<T>> {
        let key = TypeKey::of::<T>();
        let child = node_core::separate(self.as_node(), key)?;
        match downcast_arc::<T>(child) {
            Some(node) => Some(Owned::from_arc(node)),
            None => {
                error!(component = key.name(), "separated child does not match its key");
                None
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    fn clear(&self) -> usize {
        node_core::clear(self.as_node())
    }

    fn components(&self) -> Components<'_> {
        Components {
            children: self.core().read_children(),
        }
    }
}

/// Read-only view of a node's children, see [`Compose::components`].
pub struct Components<'a> {
    children: RwLockReadGuard<'a, ChildMap>,
}

impl<'a> Components<'a> {
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.children.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.children.keys().copied()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, TypeKey, Arc<dyn Node>> {
        self.children.iter()
    }
}

impl<'a, 'b> IntoIterator for &'b Components<'a> {
    type Item = (&'b TypeKey, &'b Arc<dyn Node>);
    type IntoIter = hash_map::Iter<'b, TypeKey, Arc<dyn Node>>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}
