//! Engine-wide constants
//!
//! Single source of truth for magic numbers and configuration defaults.

/// View transform limits
pub mod zoom {
    /// Smallest allowed view scale
    pub const MIN_ZOOM: f64 = 0.2;
    /// Largest allowed view scale
    pub const MAX_ZOOM: f64 = 3.0;
    /// Scale factor applied per wheel notch
    pub const STEP: f64 = 1.1;
}

/// Node geometry in graph units
pub mod layout {
    /// Width of a node body
    pub const NODE_WIDTH: f64 = 180.0;
    /// Height of the node header above the first port row
    pub const HEADER_HEIGHT: f64 = 28.0;
    /// Vertical distance between port rows
    pub const PORT_SPACING: f64 = 22.0;
    /// Hit radius of a port handle
    pub const PORT_HIT_RADIUS: f64 = 8.0;
    /// Horizontal reach of edge curve control points
    pub const EDGE_CURVATURE: f64 = 80.0;
}

/// Undo history
pub mod history {
    /// Default number of snapshots kept
    pub const CAPACITY: usize = 200;
    /// zstd level used for snapshots
    pub const COMPRESSION_LEVEL: i32 = 3;
}

/// Execution defaults
pub mod execution {
    /// Upper bound for a delay node, in milliseconds
    pub const MAX_DELAY_MS: u64 = 60_000;
    /// Default timeout for HTTP hooks, in seconds
    pub const HTTP_TIMEOUT_SECS: u64 = 30;
    /// Default timeout for external commands, in seconds
    pub const COMMAND_TIMEOUT_SECS: u64 = 60;
}

/// Default values for config-less nodes
pub mod defaults {
    /// Context key gate results are recorded under
    pub const GATE_RESULT_KEY: &str = "gate";
    /// Context key merge nodes append to
    pub const MERGE_COLLECTION: &str = "merged";
    /// Context key collect outputs append to
    pub const COLLECT_COLLECTION: &str = "collected";
}
