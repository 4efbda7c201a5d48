//! Director Types - Core type definitions for the Director scripting system
//!
//! This crate contains the pure data structures shared between the runtime
//! and external tools: the universal `Value` type, stable identifiers, node
//! type descriptors, and the serialized script data model.

mod types;
mod value;

pub use types::*;
pub use value::*;
