//! The `Node` trait: the single composition primitive.
//!
//! A node embeds a [`NodeCore`] (its children map and container
//! back-reference) and may override any of the four lifecycle hooks.

use std::any::Any;
use std::sync::Arc;

use crate::domain::node_core::NodeCore;
use crate::domain::key::TypeKey;

/// Anything that can host sub-components and be hosted as one.
///
/// Implementors embed a [`NodeCore`] and hand it out from [`Node::core`]:
///
/// ```
/// use nodecomp::domain::{Node, NodeCore};
///
/// #[derive(Default)]
/// struct Health {
///     core: NodeCore,
/// }
///
/// impl Node for Health {
///     fn core(&self) -> &NodeCore {
///         &self.core
///     }
/// }
/// ```
///
/// Hooks run without the owner's map lock held, so a hook may call back into
/// the structural operations of its own node from the same thread.
pub trait Node: NodeExt {
    /// The embedded composition container.
    fn core(&self) -> &NodeCore;

    /// Called on this node right after it became a child of some owner.
    ///
    /// The container back-reference is already set.
    fn on_attached_to_component(&self) {}

    /// Called on this node when it leaves its owner.
    ///
    /// The container back-reference is still set, except during the owner's
    /// own destruction.
    fn on_detached_from_component(&self) {}

    /// Called on the owner before the new child's `on_attached_to_component`.
    fn on_component_attached(&self, _component: &dyn Node) {}

    /// Called on the owner when a child leaves its map.
    fn on_component_detached(&self, _component: &dyn Node) {}

    /// Label used when rendering a composition tree.
    fn describe(&self) -> String {
        self.type_key().short_name().to_string()
    }
}

/// Object-safe helpers implemented for every [`Node`].
pub trait NodeExt: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn as_node(&self) -> &dyn Node;
    fn type_key(&self) -> TypeKey;
}

impl<T: Node> NodeExt for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn as_node(&self) -> &dyn Node {
        self
    }

    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }
}

impl dyn Node {
    pub fn is<T: Node>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Node>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Checked conversion of a type-erased node into its concrete type.
pub(crate) fn downcast_arc<T: Node>(node: Arc<dyn Node>) -> Option<Arc<T>> {
    node.into_any().downcast::<T>().ok()
}

/// Identity comparison of two nodes, ignoring vtables.
pub(crate) fn same_node(a: &dyn Node, b: &dyn Node) -> bool {
    std::ptr::eq(
        a as *const dyn Node as *const (),
        b as *const dyn Node as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Plain {
        core: NodeCore,
    }

    impl Node for Plain {
        fn core(&self) -> &NodeCore {
            &self.core
        }
    }

    #[derive(Default)]
    struct Other {
        core: NodeCore,
    }

    impl Node for Other {
        fn core(&self) -> &NodeCore {
            &self.core
        }
    }

    #[test]
    fn given_dyn_node_when_downcast_then_only_exact_type_matches() {
        let plain = Plain::default();
        let node: &dyn Node = &plain;

        assert!(node.is::<Plain>());
        assert!(!node.is::<Other>());
        assert!(node.downcast_ref::<Plain>().is_some());
        assert!(node.downcast_ref::<Other>().is_none());
    }

    #[test]
    fn given_arc_when_downcast_arc_then_checks_type() {
        let node: Arc<dyn Node> = Arc::new(Plain::default());
        assert!(downcast_arc::<Other>(Arc::clone(&node)).is_none());
        assert!(downcast_arc::<Plain>(node).is_some());
    }

    #[test]
    fn given_two_nodes_when_same_node_then_compares_identity() {
        let a = Plain::default();
        let b = Plain::default();
        assert!(same_node(&a, &a));
        assert!(!same_node(&a, &b));
    }

    #[test]
    fn given_default_describe_then_uses_short_type_name() {
        assert_eq!(Plain::default().describe(), "Plain");
    }
}
