//! Calculate hot paths and time distribution from collapsed stacks.
//!
//! Hot paths are the call paths with the largest exclusive time.
//! These are the primary targets for optimization.

use super::stack_builder::{by_weight, CollapsedStack};
use log::debug;
use serde::Serialize;

/// A path ranked by exclusive time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotPath {
    /// Frames below the root, recursion collapsed
    pub frames: Vec<String>,

    /// Exclusive time spent in the leaf
    pub weight: f64,

    /// Share of the total weight
    pub percentage: f64,

    pub call_count: u64,

    pub has_exception: bool,
}

impl HotPath {
    /// Frames joined for display, e.g. "main -> ... fib (x3) -> add"
    pub fn display_stack(&self) -> String {
        self.frames.join(" -> ")
    }

    /// Innermost frame
    pub fn leaf(&self) -> &str {
        self.frames.last().map(String::as_str).unwrap_or("all")
    }
}

/// Calculate hot paths from collapsed stacks
///
/// **Public** - main entry point for metrics calculation
///
/// # Arguments
/// * `stacks` - Collapsed stacks from stack_builder
/// * `top_n` - Number of top paths to return (e.g., 10)
///
/// # Returns
/// Vector of hot paths, sorted by weight (descending)
pub fn calculate_hot_paths(stacks: &[CollapsedStack], top_n: usize) -> Vec<HotPath> {
    debug!(
        "Calculating top {} hot paths from {} stacks",
        top_n,
        stacks.len()
    );

    let total: f64 = stacks.iter().map(|s| s.weight).sum();

    by_weight(stacks)
        .iter()
        .take(top_n)
        .map(|stack| create_hot_path(stack, total))
        .collect()
}

/// Create a HotPath from a CollapsedStack
pub fn create_hot_path(stack: &CollapsedStack, denominator: f64) -> HotPath {
    let percentage = if denominator > 0.0 {
        stack.weight / denominator * 100.0
    } else {
        0.0
    };

    HotPath {
        frames: simplify_trace(stack.frames()),
        weight: stack.weight,
        percentage,
        call_count: stack.call_count,
        has_exception: stack.has_exception,
    }
}

/// Collapse consecutive repeated frames
///
/// `["main", "fib", "fib", "fib"]` becomes `["main", "... fib (x3)"]`.
pub fn simplify_trace<S: AsRef<str>>(trace: &[S]) -> Vec<String> {
    let mut simplified = Vec::new();
    let mut iter = trace.iter().map(AsRef::as_ref).peekable();

    while let Some(item) = iter.next() {
        let mut count = 1;
        while iter.peek() == Some(&item) {
            iter.next();
            count += 1;
        }

        if count > 1 {
            simplified.push(format!("... {} (x{})", item, count));
        } else {
            simplified.push(item.to_string());
        }
    }

    simplified
}

/// Calculate time distribution statistics
///
/// **Public** - provides summary statistics
///
/// # Arguments
/// * `stacks` - Collapsed stacks
///
/// # Returns
/// Statistics about how exclusive time is spread over paths
pub fn calculate_time_distribution(stacks: &[CollapsedStack]) -> TimeDistribution {
    if stacks.is_empty() {
        return TimeDistribution::default();
    }

    let total: f64 = stacks.iter().map(|s| s.weight).sum();
    let count = stacks.len();

    let mut weights: Vec<f64> = stacks.iter().map(|s| s.weight).collect();
    weights.sort_by(|a, b| a.total_cmp(b));
    let median = weights[weights.len() / 2];

    // Top 10% of stacks
    let top_count = (count as f64 * 0.1).ceil() as usize;
    let top_weight: f64 = weights.iter().rev().take(top_count).sum();

    TimeDistribution {
        total_time: total,
        stack_count: count,
        mean_time_per_stack: total / count as f64,
        median_time_per_stack: median,
        top_10_percent_percentage: if total > 0.0 {
            top_weight / total * 100.0
        } else {
            0.0
        },
        exception_stacks: stacks.iter().filter(|s| s.has_exception).count(),
    }
}

/// Time distribution statistics
///
/// **Public** - returned from calculate_time_distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeDistribution {
    /// Total exclusive time across all stacks
    pub total_time: f64,

    /// Number of unique stacks
    pub stack_count: usize,

    pub mean_time_per_stack: f64,

    pub median_time_per_stack: f64,

    /// Percentage of total time in the heaviest 10% of stacks
    pub top_10_percent_percentage: f64,

    /// Stacks that saw at least one exception
    pub exception_stacks: usize,
}

impl TimeDistribution {
    /// Get human-readable summary
    ///
    /// **Public** - for logging and terminal output
    pub fn summary(&self, unit: &str) -> String {
        format!(
            "Total: {:.6}{} | Stacks: {} | Mean: {:.6}{} | Median: {:.6}{} | Top 10%: {:.1}% | With exceptions: {}",
            self.total_time,
            unit,
            self.stack_count,
            self.mean_time_per_stack,
            unit,
            self.median_time_per_stack,
            unit,
            self.top_10_percent_percentage,
            self.exception_stacks
        )
    }
}
