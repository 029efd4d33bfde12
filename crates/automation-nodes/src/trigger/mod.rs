//! Trigger nodes
//!
//! Nodes that seed a run with an initial payload.

mod clipboard;
mod manual;

pub use clipboard::ClipboardTrigger;
pub use manual::ManualTrigger;
