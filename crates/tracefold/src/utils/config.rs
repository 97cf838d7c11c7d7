//! Configuration and constants for the engine and the CLI.

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Floor applied to every call duration so that no record ends up with a
/// zero or negative width
pub const EPSILON: f64 = 1e-9;

/// Resource type emitted by the call-stack reconstructor
pub const RESOURCE_TYPE: &str = "time";

/// Unit of the timestamps found in the event log
pub const TIME_UNIT: &str = "s";

/// Name recorded in the profile's collector info
pub const COLLECTOR_NAME: &str = "python";

// Event kind tokens, kept verbatim for compatibility with the collector
pub const EVENT_KIND_TOKENS: &[&str] = &[
    "PY_START",
    "PY_RESUME",
    "PY_RETURN",
    "PY_YIELD",
    "PY_THROW",
    "PY_UNWIND",
];

// Render defaults (pixels)
pub const DEFAULT_IMAGE_WIDTH: f64 = 1200.0;
pub const DEFAULT_FRAME_HEIGHT: f64 = 16.0;
pub const DEFAULT_MIN_WIDTH: f64 = 0.1;
pub const X_PADDING: f64 = 10.0;
pub const FONT_SIZE: f64 = 12.0;
pub const FONT_WIDTH: f64 = 0.59;
pub const Y_PADDING_TITLE: f64 = FONT_SIZE * 3.0;
pub const Y_PADDING_SUBTITLE: f64 = FONT_SIZE * 2.0;

/// Default number of rows in terminal hot path tables
pub const DEFAULT_TOP_PATHS: usize = 10;
