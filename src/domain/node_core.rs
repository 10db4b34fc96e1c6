//! `NodeCore`: the container embedded in every node.
//!
//! Holds the children map (one child per type), the non-owning
//! back-reference to the current container, and the per-node guards.
//!
//! Locking:
//! - `children` is a `RwLock` held only for the map access itself, never
//!   across a hook call.
//! - `mutation` is a reentrant mutex held for a whole structural operation
//!   (hook dispatch included). Other threads are serialized; the owning
//!   thread may re-enter from inside a hook.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock, RwLockReadGuard};
use tracing::{debug, instrument, trace, warn};

use crate::domain::error::{CompositionError, CompositionResult};
use crate::domain::key::TypeKey;
use crate::domain::node::{downcast_arc, same_node, Node};

/// Map from type identity to the owned child.
pub type ChildMap = HashMap<TypeKey, Arc<dyn Node>>;

/// Which hooks fire when a child leaves through `separate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookPolicy {
    /// Fire `on_detached_from_component` / `on_component_detached` on separate.
    pub notify_on_separate: bool,
}

impl Default for HookPolicy {
    fn default() -> Self {
        Self {
            notify_on_separate: true,
        }
    }
}

impl HookPolicy {
    /// Separate silently, leaving hooks to remove and replace only.
    pub fn silent_separate() -> Self {
        Self {
            notify_on_separate: false,
        }
    }
}

/// Composition state embedded in a [`Node`].
pub struct NodeCore {
    children: RwLock<ChildMap>,
    mutation: ReentrantMutex<()>,
    container: RwLock<Option<Weak<dyn Node>>>,
    this: OnceLock<Weak<dyn Node>>,
    departing: AtomicBool,
    policy: HookPolicy,
}

impl Default for NodeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeCore {
    pub fn new() -> Self {
        Self::with_policy(HookPolicy::default())
    }

    pub fn with_policy(policy: HookPolicy) -> Self {
        Self {
            children: RwLock::new(HashMap::new()),
            mutation: ReentrantMutex::new(()),
            container: RwLock::new(None),
            this: OnceLock::new(),
            departing: AtomicBool::new(false),
            policy,
        }
    }

    pub fn policy(&self) -> HookPolicy {
        self.policy
    }

    /// The node currently owning this one, if attached and still alive.
    pub fn container(&self) -> Option<Arc<dyn Node>> {
        self.container.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_attached(&self) -> bool {
        self.container().is_some()
    }

    /// The container as its concrete type.
    ///
    /// `None` when detached or when the container is not a `T`.
    pub fn parent<T: Node>(&self) -> Option<Arc<T>> {
        self.container().and_then(downcast_arc::<T>)
    }

    pub fn try_parent<T: Node>(&self) -> CompositionResult<Arc<T>> {
        let container = self.container().ok_or(CompositionError::Detached {
            type_name: std::any::type_name::<T>(),
        })?;
        let found = container.type_key().name();
        downcast_arc::<T>(container).ok_or(CompositionError::ParentTypeMismatch {
            expected: std::any::type_name::<T>(),
            found,
        })
    }

    /// Strong handle to the node embedding this core, if it lives in an `Arc`.
    pub fn handle(&self) -> Option<Arc<dyn Node>> {
        self.this.get().and_then(Weak::upgrade)
    }

    pub(crate) fn bind(&self, this: Weak<dyn Node>) {
        if self.this.set(this).is_err() {
            warn!("node handle already bound, keeping the first one");
        }
    }

    /// Serializes a compound operation on this node with other mutators.
    pub(crate) fn structural_guard(&self) -> ReentrantMutexGuard<'_, ()> {
        self.mutation.lock()
    }

    pub(crate) fn read_children(&self) -> RwLockReadGuard<'_, ChildMap> {
        self.children.read()
    }

    pub(crate) fn child(&self, key: &TypeKey) -> Option<Arc<dyn Node>> {
        self.children.read().get(key).cloned()
    }

    pub(crate) fn contains(&self, key: &TypeKey) -> bool {
        self.children.read().contains_key(key)
    }

    fn set_container(&self, owner: Option<Weak<dyn Node>>) {
        *self.container.write() = owner;
    }

    fn clear_container(&self) {
        *self.container.write() = None;
    }

    /// Claims this node's departure; `false` when one is already running.
    fn begin_departure(&self) -> bool {
        !self.departing.swap(true, Ordering::AcqRel)
    }

    fn end_departure(&self) {
        self.clear_container();
        self.departing.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let children = self.children.read();
        let mut names: Vec<&'static str> = children.keys().map(TypeKey::name).collect();
        names.sort_unstable();
        f.debug_struct("NodeCore")
            .field("children", &names)
            .field("attached", &self.is_attached())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Drop for NodeCore {
    fn drop(&mut self) {
        let children = std::mem::take(self.children.get_mut());
        for (key, child) in children {
            trace!(component = key.name(), "owner dropped, detaching");
            child.on_detached_from_component();
            child.core().clear_container();
        }
    }
}

/// True when `target` is `root` or one of its descendants.
fn subtree_contains(root: &Arc<dyn Node>, target: &dyn Node) -> bool {
    let mut stack = vec![Arc::clone(root)];
    while let Some(node) = stack.pop() {
        if same_node(&*node, target) {
            return true;
        }
        stack.extend(node.core().read_children().values().cloned());
    }
    false
}

/// Fires the departure hooks in remove order, then erases the entry.
///
/// A departure requested from inside the hooks of one already running is
/// absorbed by the outer one, so each hook fires once per departure.
fn detach(owner: &dyn Node, key: &TypeKey, child: &Arc<dyn Node>) -> bool {
    if !child.core().begin_departure() {
        trace!(component = key.name(), "already departing");
        return false;
    }
    child.on_detached_from_component();
    owner.on_component_detached(&**child);
    erase_if_same(owner, key, child);
    child.core().end_departure();
    debug!(component = key.name(), owner = owner.type_key().name(), "detached");
    true
}

/// Fires the departure hooks in replace order, leaving the map untouched.
fn displace(owner: &dyn Node, key: &TypeKey, old: &Arc<dyn Node>) -> bool {
    if !old.core().begin_departure() {
        trace!(component = key.name(), "already departing");
        return false;
    }
    owner.on_component_detached(&**old);
    old.on_detached_from_component();
    debug!(component = key.name(), "replacing existing component");
    true
}

fn erase_if_same(owner: &dyn Node, key: &TypeKey, child: &Arc<dyn Node>) {
    let mut children = owner.core().children.write();
    if children.get(key).is_some_and(|current| Arc::ptr_eq(current, child)) {
        children.remove(key);
    }
}

/// Installs `child` under `key`, replacing any previous child of that type.
#[instrument(level = "trace", skip(owner, child), fields(owner = owner.type_key().name()))]
pub(crate) fn install(
    owner: &dyn Node,
    key: TypeKey,
    child: Arc<dyn Node>,
) -> CompositionResult<()> {
    let core = owner.core();
    let _guard = core.mutation.lock();

    let Some(this) = core.this.get().cloned() else {
        warn!(component = key.name(), "refusing install into a node without a handle");
        return Err(CompositionError::Unbound {
            owner: owner.type_key().name(),
        });
    };

    if subtree_contains(&child, owner) {
        warn!(component = key.name(), "refusing install that would form a cycle");
        return Err(CompositionError::CycleDetected {
            child: key.name(),
            owner: owner.type_key().name(),
        });
    }

    let departing = core
        .child(&key)
        .filter(|old| displace(owner, &key, old));

    // Hooks above may have re-entered and installed another child here.
    let displaced = core.children.write().insert(key, Arc::clone(&child));
    if let Some(other) = displaced {
        let ours = departing.as_ref().is_some_and(|old| Arc::ptr_eq(old, &other));
        if !ours && displace(owner, &key, &other) {
            other.core().end_departure();
        }
    }
    if let Some(old) = departing {
        old.core().end_departure();
    }

    child.core().set_container(Some(this));
    owner.on_component_attached(&*child);
    child.on_attached_to_component();
    debug!(component = key.name(), "attached");
    Ok(())
}

/// Destroys the child under `key`; no-op when absent.
#[instrument(level = "trace", skip(owner), fields(owner = owner.type_key().name()))]
pub(crate) fn remove(owner: &dyn Node, key: TypeKey) -> bool {
    let _guard = owner.core().mutation.lock();
    match owner.core().child(&key) {
        Some(child) => detach(owner, &key, &child),
        None => {
            trace!(component = key.name(), "remove: not present");
            false
        }
    }
}

/// Takes the child under `key` out of the map as a standalone node.
#[instrument(level = "trace", skip(owner), fields(owner = owner.type_key().name()))]
pub(crate) fn separate(owner: &dyn Node, key: TypeKey) -> Option<Arc<dyn Node>> {
    let core = owner.core();
    let _guard = core.mutation.lock();
    let child = core.child(&key)?;

    if core.policy.notify_on_separate {
        if !detach(owner, &key, &child) {
            return None;
        }
    } else {
        if !child.core().begin_departure() {
            return None;
        }
        erase_if_same(owner, &key, &child);
        child.core().end_departure();
        debug!(component = key.name(), "separated silently");
    }
    Some(child)
}

/// Detaches every child in remove order; returns how many left.
///
/// Children already departing through an enclosing operation are skipped.
#[instrument(level = "trace", skip(owner), fields(owner = owner.type_key().name()))]
pub(crate) fn clear(owner: &dyn Node) -> usize {
    let _guard = owner.core().mutation.lock();
    let snapshot: Vec<(TypeKey, Arc<dyn Node>)> = owner
        .core()
        .read_children()
        .iter()
        .map(|(key, child)| (*key, Arc::clone(child)))
        .collect();

    snapshot
        .iter()
        .filter(|(key, child)| detach(owner, key, child))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Host {
        core: NodeCore,
    }

    impl Node for Host {
        fn core(&self) -> &NodeCore {
            &self.core
        }
    }

    #[derive(Debug, Default)]
    struct Leaf {
        core: NodeCore,
    }

    impl Node for Leaf {
        fn core(&self) -> &NodeCore {
            &self.core
        }
    }

    use crate::domain::handle::bind as bound;

    #[test]
    fn given_bound_owner_when_install_then_child_points_back() {
        let host = bound(Host::default());
        let leaf: Arc<dyn Node> = bound(Leaf::default());

        install(&*host, TypeKey::of::<Leaf>(), Arc::clone(&leaf)).unwrap();

        assert!(host.core().contains(&TypeKey::of::<Leaf>()));
        assert!(leaf.core().parent::<Host>().is_some());
        assert!(leaf.core().parent::<Leaf>().is_none());
    }

    #[test]
    fn given_unbound_owner_when_install_then_refused_and_map_untouched() {
        let host = Host::default();
        let leaf: Arc<dyn Node> = bound(Leaf::default());

        let err = install(&host, TypeKey::of::<Leaf>(), Arc::clone(&leaf)).unwrap_err();

        assert_eq!(
            err,
            CompositionError::Unbound {
                owner: std::any::type_name::<Host>()
            }
        );
        assert!(!host.core().contains(&TypeKey::of::<Leaf>()));
        assert!(!leaf.core().is_attached());
    }

    #[test]
    fn given_departure_claimed_when_claimed_again_then_refused_until_ended() {
        let leaf = Leaf::default();
        assert!(leaf.core().begin_departure());
        assert!(!leaf.core().begin_departure());
        leaf.core().end_departure();
        assert!(leaf.core().begin_departure());
    }

    #[test]
    fn given_owner_inside_child_subtree_when_install_then_cycle_detected() {
        let host = bound(Host::default());
        let leaf = bound(Leaf::default());
        install(&*leaf, TypeKey::of::<Host>(), Arc::clone(&host) as Arc<dyn Node>).unwrap();

        let err = install(&*host, TypeKey::of::<Leaf>(), leaf as Arc<dyn Node>).unwrap_err();
        assert!(matches!(err, CompositionError::CycleDetected { .. }));
        assert!(!host.core().contains(&TypeKey::of::<Leaf>()));
    }

    #[test]
    fn given_self_when_install_then_cycle_detected() {
        let host = bound(Host::default());
        let err = install(&*host, TypeKey::of::<Host>(), Arc::clone(&host) as Arc<dyn Node>)
            .unwrap_err();
        assert!(matches!(err, CompositionError::CycleDetected { .. }));
    }

    #[test]
    fn given_detached_core_when_try_parent_then_detached_error() {
        let leaf = Leaf::default();
        assert_eq!(
            leaf.core().try_parent::<Host>().unwrap_err(),
            CompositionError::Detached {
                type_name: std::any::type_name::<Host>()
            }
        );
    }

    #[test]
    fn given_wrong_parent_type_when_try_parent_then_mismatch_error() {
        let host = bound(Host::default());
        let leaf: Arc<dyn Node> = bound(Leaf::default());
        install(&*host, TypeKey::of::<Leaf>(), Arc::clone(&leaf)).unwrap();

        let err = leaf.core().try_parent::<Leaf>().unwrap_err();
        assert!(matches!(err, CompositionError::ParentTypeMismatch { .. }));
    }

    #[test]
    fn given_children_when_clear_then_all_detached() {
        let host = bound(Host::default());
        let leaf: Arc<dyn Node> = bound(Leaf::default());
        install(&*host, TypeKey::of::<Leaf>(), Arc::clone(&leaf)).unwrap();

        assert_eq!(clear(&*host), 1);
        assert!(host.core().read_children().is_empty());
        assert!(!leaf.core().is_attached());
        assert_eq!(clear(&*host), 0);
    }

    #[test]
    fn given_silent_policy_when_separate_then_back_reference_cleared() {
        let host = bound(Host {
            core: NodeCore::with_policy(HookPolicy::silent_separate()),
        });
        let leaf: Arc<dyn Node> = bound(Leaf::default());
        install(&*host, TypeKey::of::<Leaf>(), Arc::clone(&leaf)).unwrap();

        let separated = separate(&*host, TypeKey::of::<Leaf>()).unwrap();
        assert!(Arc::ptr_eq(&separated, &leaf));
        assert!(!leaf.core().is_attached());
        assert!(separate(&*host, TypeKey::of::<Leaf>()).is_none());
    }
}
