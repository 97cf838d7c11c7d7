//! Build the flame input stream from resource records.
//!
//! Every resource contributes one path: the synthetic root `""`, the
//! function names of its callers, then its own function name.
//! Collapsed form: "parent;child;grandchild weight"
//!
//! Example: ";main;handle;parse 0.25"
//! This means: main called handle which called parse, spending 0.25s in parse itself.

use crate::parser::schema::Resource;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Label of the synthetic root frame
pub const ROOT_LABEL: &str = "";

/// A single collapsed stack entry
///
/// **Public** - used by the flow aggregator and metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapsedStack {
    /// Frame labels from the root down to the measured function
    pub path: Vec<String>,

    /// Accumulated exclusive time of this path
    pub weight: f64,

    /// Largest call count among the coalesced resources
    pub call_count: u64,

    /// Whether any coalesced resource saw an exception
    pub has_exception: bool,
}

impl CollapsedStack {
    /// Create a new collapsed stack
    ///
    /// **Public** - constructor
    pub fn new(path: Vec<String>, weight: f64, call_count: u64, has_exception: bool) -> Self {
        Self {
            path,
            weight,
            call_count,
            has_exception,
        }
    }

    /// Path joined with ';', root included
    pub fn stack(&self) -> String {
        self.path.join(";")
    }

    /// Measured function, the last frame of the path
    pub fn leaf(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or(ROOT_LABEL)
    }

    /// Path without the synthetic root frame
    pub fn frames(&self) -> &[String] {
        match self.path.split_first() {
            Some((first, rest)) if first == ROOT_LABEL => rest,
            _ => &self.path,
        }
    }
}

impl fmt::Display for CollapsedStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.stack(), self.weight)
    }
}

/// Path of a resource in the flame graph
pub fn resource_path(resource: &Resource) -> Vec<String> {
    std::iter::once(ROOT_LABEL.to_string())
        .chain(resource.trace.iter().map(|uid| uid.function.clone()))
        .chain(std::iter::once(resource.uid.function.clone()))
        .collect()
}

/// Build collapsed stacks from resources
///
/// **Public** - main entry point for stack building
///
/// # Arguments
/// * `resources` - Resources extracted from a reconstruction or loaded from a profile
///
/// # Returns
/// One collapsed stack per unique path, sorted lexicographically by path
pub fn build_collapsed_stacks(resources: &[Resource]) -> Vec<CollapsedStack> {
    debug!("Building collapsed stacks from {} resources", resources.len());

    let mut stack_map: HashMap<Vec<String>, CollapsedStack> = HashMap::new();

    for resource in resources {
        let path = resource_path(resource);
        let has_exception = !resource.exceptions.is_empty();

        stack_map
            .entry(path.clone())
            .and_modify(|stack| {
                stack.weight += resource.amount;
                stack.call_count = stack.call_count.max(resource.call_count);
                stack.has_exception |= has_exception;
            })
            .or_insert_with(|| {
                CollapsedStack::new(path, resource.amount, resource.call_count, has_exception)
            });
    }

    let mut stacks: Vec<CollapsedStack> = stack_map.into_values().collect();
    sort_stacks(&mut stacks);

    debug!("Built {} unique collapsed stacks", stacks.len());
    stacks
}

/// Sort stacks lexicographically by path, the order the flow aggregator expects
pub fn sort_stacks(stacks: &mut [CollapsedStack]) {
    stacks.sort_by(|a, b| a.path.cmp(&b.path));
}

/// Stacks ordered by weight, heaviest first
pub fn by_weight(stacks: &[CollapsedStack]) -> Vec<CollapsedStack> {
    let mut sorted = stacks.to_vec();
    sorted.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    sorted
}
