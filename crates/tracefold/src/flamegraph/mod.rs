//! Flamegraph layout and SVG rendering.
//!
//! This module converts flame trees into pixel geometry and then into SVG
//! flamegraphs, for a single profile or the difference of two.

pub mod diff_generator;
pub mod generator;
pub mod layout;

// Re-export main types
pub use diff_generator::generate_diff_flamegraph;
pub use generator::{generate_flamegraph, generate_text_summary, FlamegraphConfig};
pub use layout::{layout, FrameRect, Layout, LayoutConfig, Orientation};
