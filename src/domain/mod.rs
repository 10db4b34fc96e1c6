//! Domain layer: the composition primitive
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod compose;
pub mod error;
pub mod handle;
pub mod key;
pub mod node;
pub mod node_core;

pub use compose::{Components, Compose};
pub use error::{CompositionError, CompositionResult};
pub use handle::{NodeRef, Owned};
pub use key::TypeKey;
pub use node::{Node, NodeExt};
pub use node_core::{ChildMap, HookPolicy, NodeCore};
