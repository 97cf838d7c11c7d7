//! Common-prefix merge of sorted stack paths into a flame tree.
//!
//! The aggregator walks a lexicographically sorted stream of paths and keeps
//! one open node per depth of the previous path. For each new path:
//!
//! 1. Find the length `L` of the common prefix with the previous path
//! 2. Close open nodes from the deepest down to depth `L`, stamping them
//!    with the current offset as their end
//! 3. Open nodes for the new path from depth `L` onward at the current
//!    offset, each carrying the path's call count, exception marker and delta
//! 4. Advance the offset by the path's weight
//!
//! A final flush with an empty path closes everything. Closed nodes are
//! stored in an arena keyed by `(label, depth, end_offset)`.

use super::stack_builder::{sort_stacks, CollapsedStack, ROOT_LABEL};
use crate::utils::error::FlamegraphError;
use log::debug;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Arena key of a closed node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub label: String,
    pub depth: usize,
    end_bits: u64,
}

impl NodeKey {
    pub fn new(label: impl Into<String>, depth: usize, end_offset: f64) -> Self {
        Self {
            label: label.into(),
            depth,
            end_bits: end_offset.to_bits(),
        }
    }

    pub fn end_offset(&self) -> f64 {
        f64::from_bits(self.end_bits)
    }
}

/// One merged frame of the flame graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedNode {
    pub label: String,
    pub depth: usize,

    /// Offset where the node was opened; `None` only for malformed input
    pub start_offset: Option<f64>,

    pub end_offset: f64,

    /// Call count of the path that opened this frame
    pub call_count: u64,

    /// Exception seen in the path that opened this frame
    pub has_exception: bool,

    /// Target-minus-baseline weight of the path that opened this frame,
    /// differential mode only
    pub delta: Option<f64>,
}

impl AggregatedNode {
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.label.clone(), self.depth, self.end_offset)
    }

    /// `end - start`, zero when the start is unknown
    pub fn width(&self) -> f64 {
        self.start_offset
            .map(|start| self.end_offset - start)
            .unwrap_or(0.0)
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0 && self.label == ROOT_LABEL
    }
}

/// Collapsed call tree produced by one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct FlameTree {
    nodes: Vec<AggregatedNode>,
    index: HashMap<NodeKey, usize>,
    total_weight: f64,
}

impl FlameTree {
    /// Build a tree from already closed nodes
    pub fn from_nodes(nodes: Vec<AggregatedNode>, total_weight: f64) -> Self {
        let mut tree = Self {
            total_weight,
            ..Self::default()
        };
        for node in nodes {
            tree.insert(node);
        }
        tree
    }

    fn insert(&mut self, node: AggregatedNode) {
        let key = node.key();
        match self.index.get(&key) {
            // Zero-width frames can close twice at the same offset; last one wins
            Some(&slot) => {
                debug!(
                    "Node '{}' at depth {} closed twice at {}",
                    node.label, node.depth, node.end_offset
                );
                self.nodes[slot] = node;
            }
            None => {
                self.index.insert(key, self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    /// Nodes in closing order
    pub fn nodes(&self) -> &[AggregatedNode] {
        &self.nodes
    }

    pub fn get(&self, label: &str, depth: usize, end_offset: f64) -> Option<&AggregatedNode> {
        self.index
            .get(&NodeKey::new(label, depth, end_offset))
            .map(|&slot| &self.nodes[slot])
    }

    pub fn root(&self) -> Option<&AggregatedNode> {
        self.nodes.iter().find(|node| node.is_root())
    }

    /// Sum of all pushed weights, the final offset
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Largest absolute delta of any node, 0 outside differential mode
    pub fn max_abs_delta(&self) -> f64 {
        self.nodes
            .iter()
            .filter_map(|node| node.delta)
            .fold(0.0, |max, delta| max.max(delta.abs()))
    }
}

#[derive(Debug, Clone)]
struct OpenNode {
    label: String,
    start_offset: f64,
    call_count: u64,
    has_exception: bool,
    delta: Option<f64>,
}

/// Streaming common-prefix merge
///
/// **Public** - low level primitive behind [`aggregate`] and [`aggregate_diff`]
#[derive(Debug, Default)]
pub struct FlowAggregator {
    previous_path: Vec<String>,
    open: Vec<OpenNode>,
    offset: f64,
    tree: FlameTree,
}

impl FlowAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the next stack of a sorted stream
    pub fn push(&mut self, stack: &CollapsedStack) -> Result<(), FlamegraphError> {
        self.advance(stack, stack.weight, None)
    }

    /// Merge the next stack with a differential delta
    ///
    /// Only frames opened by this stack take the delta; shared prefix
    /// frames keep the delta of the stack that opened them.
    pub fn push_with_delta(
        &mut self,
        stack: &CollapsedStack,
        delta: f64,
    ) -> Result<(), FlamegraphError> {
        self.advance(stack, stack.weight, Some(delta))
    }

    /// Current offset, the sum of the weights pushed so far
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Close every open node and return the tree
    pub fn finish(mut self) -> FlameTree {
        self.close_from(0);
        self.tree.total_weight = self.offset;
        debug!(
            "Flow aggregation finished: {} nodes, total weight {}",
            self.tree.len(),
            self.offset
        );
        self.tree
    }

    fn advance(
        &mut self,
        stack: &CollapsedStack,
        weight: f64,
        delta: Option<f64>,
    ) -> Result<(), FlamegraphError> {
        let path = &stack.path;
        if path.as_slice() < self.previous_path.as_slice() {
            return Err(FlamegraphError::UnsortedInput {
                previous: self.previous_path.clone(),
                current: path.clone(),
            });
        }

        let common = self
            .previous_path
            .iter()
            .zip(path)
            .take_while(|(a, b)| a == b)
            .count();

        self.close_from(common);

        if common == path.len() {
            // Same path again: the leaf is still open and keeps growing
            if let Some(leaf) = self.open.last_mut() {
                leaf.call_count = leaf.call_count.max(stack.call_count);
                leaf.has_exception |= stack.has_exception;
                if let Some(delta) = delta {
                    leaf.delta = Some(leaf.delta.unwrap_or(0.0) + delta);
                }
            }
        }

        // Frames kept open from the previous path are left untouched
        for label in &path[common..] {
            self.open.push(OpenNode {
                label: label.clone(),
                start_offset: self.offset,
                call_count: stack.call_count,
                has_exception: stack.has_exception,
                delta,
            });
        }

        self.offset += weight;
        self.previous_path.clone_from(path);
        Ok(())
    }

    /// Close open nodes at `depth` and deeper, deepest first
    fn close_from(&mut self, depth: usize) {
        while self.open.len() > depth {
            let Some(open) = self.open.pop() else {
                break;
            };
            let node_depth = self.open.len();
            self.tree.insert(AggregatedNode {
                label: open.label,
                depth: node_depth,
                start_offset: Some(open.start_offset),
                end_offset: self.offset,
                call_count: open.call_count,
                has_exception: open.has_exception,
                delta: open.delta,
            });
        }
        self.previous_path.truncate(depth);
    }
}

/// Aggregate stacks into a flame tree
///
/// **Public** - main entry point for the single-profile flame graph
///
/// # Arguments
/// * `stacks` - Collapsed stacks in any order; a sorted copy is streamed
///
/// # Returns
/// The merged tree with its total weight
pub fn aggregate(stacks: &[CollapsedStack]) -> Result<FlameTree, FlamegraphError> {
    let mut sorted = stacks.to_vec();
    sort_stacks(&mut sorted);

    let mut flow = FlowAggregator::new();
    for stack in &sorted {
        flow.push(stack)?;
    }
    Ok(flow.finish())
}

/// Aggregate two profiles into one differential tree
///
/// Widths come from the target. Each frame carries the `target - baseline`
/// weight of the path that opened it. Paths only present in the baseline
/// get zero width.
pub fn aggregate_diff(
    baseline: &[CollapsedStack],
    target: &[CollapsedStack],
) -> Result<FlameTree, FlamegraphError> {
    let mut union: HashMap<Vec<String>, (CollapsedStack, f64)> = HashMap::new();

    for stack in target {
        union
            .entry(stack.path.clone())
            .and_modify(|(merged, _)| {
                merged.weight += stack.weight;
                merged.call_count = merged.call_count.max(stack.call_count);
                merged.has_exception |= stack.has_exception;
            })
            .or_insert_with(|| (stack.clone(), 0.0));
    }

    for stack in baseline {
        union
            .entry(stack.path.clone())
            .and_modify(|(_, baseline_weight)| *baseline_weight += stack.weight)
            .or_insert_with(|| {
                let empty = CollapsedStack::new(stack.path.clone(), 0.0, stack.call_count, false);
                (empty, stack.weight)
            });
    }

    let mut entries: Vec<(CollapsedStack, f64)> = union.into_values().collect();
    entries.sort_by(|a, b| a.0.path.cmp(&b.0.path));

    debug!("Differential aggregation over {} unique paths", entries.len());

    let mut flow = FlowAggregator::new();
    for (stack, baseline_weight) in &entries {
        flow.push_with_delta(stack, stack.weight - baseline_weight)?;
    }
    Ok(flow.finish())
}

/// Width of one frame in two independently aggregated trees
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameComparison {
    pub label: String,
    pub depth: usize,
    pub baseline_width: f64,
    pub target_width: f64,
}

impl FrameComparison {
    pub fn delta(&self) -> f64 {
        self.target_width - self.baseline_width
    }

    /// Change relative to the baseline width, `None` for new frames
    pub fn percent_change(&self) -> Option<f64> {
        (self.baseline_width > 0.0).then(|| self.delta() / self.baseline_width * 100.0)
    }
}

/// Compare two trees frame by frame
///
/// Widths of all nodes sharing a `(label, depth)` are summed. Results are
/// ordered by absolute change, largest first.
pub fn compare_trees(baseline: &FlameTree, target: &FlameTree) -> Vec<FrameComparison> {
    let mut frames: HashMap<(String, usize), (f64, f64)> = HashMap::new();

    for node in baseline.nodes() {
        frames
            .entry((node.label.clone(), node.depth))
            .or_insert((0.0, 0.0))
            .0 += node.width();
    }
    for node in target.nodes() {
        frames
            .entry((node.label.clone(), node.depth))
            .or_insert((0.0, 0.0))
            .1 += node.width();
    }

    let mut comparisons: Vec<FrameComparison> = frames
        .into_iter()
        .map(|((label, depth), (baseline_width, target_width))| FrameComparison {
            label,
            depth,
            baseline_width,
            target_width,
        })
        .collect();

    comparisons.sort_by(|a, b| {
        b.delta()
            .abs()
            .partial_cmp(&a.delta().abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.depth.cmp(&b.depth))
            .then_with(|| a.label.cmp(&b.label))
    });
    comparisons
}
