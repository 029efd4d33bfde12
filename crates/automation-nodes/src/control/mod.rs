//! Control nodes
//!
//! Utility nodes that record decisions, gather payloads or pace a branch.
//! None of them change the payload.

mod delay;
mod gate;
mod merge;

pub use delay::Delay;
pub use gate::Gate;
pub use merge::Merge;
