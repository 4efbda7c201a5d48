//! Built-in node library
//!
//! Everything registers under the "Core" category. Game-specific node
//! libraries register their own types alongside these.

mod actions;
mod events;
mod values;

pub use actions::*;
pub use events::*;
pub use values::*;

use crate::NodeRegistry;

/// Register the whole built-in library
pub fn register_builtins(registry: &mut NodeRegistry) {
    events::register(registry);
    actions::register(registry);
    values::register(registry);
}
