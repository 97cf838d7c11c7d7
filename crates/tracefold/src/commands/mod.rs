//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod analyze;
pub mod diff;
pub mod models;
pub mod render;
pub mod utils;

// Re-export main command functions
pub use analyze::{execute_analyze, validate_args};
pub use diff::{execute_diff, DiffReport};
pub use models::{AnalyzeArgs, DiffArgs, FlamegraphArgs};
pub use render::execute_flamegraph;
pub use utils::{display_schema, display_version, validate_profile_file};
