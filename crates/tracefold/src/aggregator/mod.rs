//! Aggregation of resources into collapsed stacks, flame trees and metrics.
//!
//! This module transforms extracted resources into:
//! - Collapsed stack format (the flame input stream)
//! - A merged flame tree, single or differential
//! - Hot path analysis and time distribution statistics

pub mod flow;
pub mod metrics;
pub mod stack_builder;

// Re-export main types and functions
pub use flow::{
    aggregate, aggregate_diff, compare_trees, AggregatedNode, FlameTree, FlowAggregator,
    FrameComparison, NodeKey,
};
pub use metrics::{calculate_hot_paths, calculate_time_distribution, simplify_trace, HotPath};
pub use stack_builder::{build_collapsed_stacks, CollapsedStack};
