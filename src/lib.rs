//! nodecomp: type-keyed component composition.
//!
//! Every [`Node`] can own at most one child per concrete type, keeps a
//! non-owning reference to the node that owns it, and is told about
//! structural changes through four lifecycle hooks.
//!
//! Architecture:
//! - `domain`: the composition primitive (`Node`, `NodeCore`, `Compose`, handles)
//! - `tree_traits`: rendering and metrics over a composition tree
//! - `config`: layered settings (defaults, global file, explicit file, env)
//! - `cli`: the demo command line
//!
//! ```
//! use nodecomp::{Compose, Node, NodeCore, Owned};
//!
//! #[derive(Default)]
//! struct Entity {
//!     core: NodeCore,
//! }
//!
//! impl Node for Entity {
//!     fn core(&self) -> &NodeCore {
//!         &self.core
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Health {
//!     core: NodeCore,
//! }
//!
//! impl Node for Health {
//!     fn core(&self) -> &NodeCore {
//!         &self.core
//!     }
//! }
//!
//! let entity = Owned::new(Entity::default());
//! let health = entity.add(Health::default()).unwrap();
//! assert!(entity.has::<Health>());
//! assert!(health.upgrade().unwrap().core().parent::<Entity>().is_some());
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod exitcode;
pub mod samples;
pub mod tree_traits;
pub mod util;

pub use domain::{
    Components, Compose, CompositionError, CompositionResult, HookPolicy, Node, NodeCore,
    NodeExt, NodeRef, Owned, TypeKey,
};
