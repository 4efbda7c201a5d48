//! Director Runtime - Execution engine for Director scripts
//!
//! This crate contains the node and graph model, the tick-driven stack-frame
//! scheduler, the node registry with the built-in node library, the game
//! message bridge, and script load/save.

pub use director_types;

mod director;
mod error;
mod graph;
mod message;
mod node;
pub mod nodes;
mod registry;
mod script;

pub use director::*;
pub use error::*;
pub use graph::*;
pub use message::*;
pub use node::*;
pub use registry::*;
