//! Sample node types used by the demo command and the tests.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::domain::{Node, NodeCore};

/// Node carrying a single integer.
#[derive(Debug, Default)]
pub struct Value {
    core: NodeCore,
    value: AtomicI64,
}

impl Value {
    pub fn new(value: i64) -> Self {
        Self {
            core: NodeCore::new(),
            value: AtomicI64::new(value),
        }
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }
}

impl Node for Value {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn describe(&self) -> String {
        format!("Value({})", self.value())
    }
}

/// Node without state of its own.
#[derive(Debug, Default)]
pub struct Marker {
    core: NodeCore,
}

impl Node for Marker {
    fn core(&self) -> &NodeCore {
        &self.core
    }
}

/// One lifecycle hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    AttachedToComponent { node: String },
    DetachedFromComponent { node: String },
    ComponentAttached { owner: String, component: String },
    ComponentDetached { owner: String, component: String },
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookEvent::AttachedToComponent { node } => write!(f, "{node}: attached to component"),
            HookEvent::DetachedFromComponent { node } => {
                write!(f, "{node}: detached from component")
            }
            HookEvent::ComponentAttached { owner, component } => {
                write!(f, "{owner}: component attached: {component}")
            }
            HookEvent::ComponentDetached { owner, component } => {
                write!(f, "{owner}: component detached: {component}")
            }
        }
    }
}

/// Shared, append-only record of hook events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<HookEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: HookEvent) {
        info!(%event, "hook");
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }

    /// Returns the recorded events and starts over.
    pub fn take(&self) -> Vec<HookEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Node that records every hook fired on it into an [`EventLog`].
#[derive(Debug)]
pub struct Recorder {
    core: NodeCore,
    name: String,
    log: EventLog,
}

impl Recorder {
    pub fn new(name: impl Into<String>, log: &EventLog) -> Self {
        Self::with_core(name, log, NodeCore::new())
    }

    pub fn with_core(name: impl Into<String>, log: &EventLog, core: NodeCore) -> Self {
        Self {
            core,
            name: name.into(),
            log: log.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Node for Recorder {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn on_attached_to_component(&self) {
        self.log.push(HookEvent::AttachedToComponent {
            node: self.name.clone(),
        });
    }

    fn on_detached_from_component(&self) {
        self.log.push(HookEvent::DetachedFromComponent {
            node: self.name.clone(),
        });
    }

    fn on_component_attached(&self, component: &dyn Node) {
        self.log.push(HookEvent::ComponentAttached {
            owner: self.name.clone(),
            component: component.describe(),
        });
    }

    fn on_component_detached(&self, component: &dyn Node) {
        self.log.push(HookEvent::ComponentDetached {
            owner: self.name.clone(),
            component: component.describe(),
        });
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
