//! Diff command implementation.
//! Orchestrates the comparison of two profiles and reports per-frame deltas.

use super::models::DiffArgs;
use crate::aggregator::{aggregate, build_collapsed_stacks, compare_trees, FrameComparison};
use crate::flamegraph::generate_diff_flamegraph;
use crate::output::json::read_profile;
use crate::output::write_svg;
use crate::parser::schema::Profile;
use anyhow::{Context, Result};
use colored::*;
use log::info;
use serde::Serialize;
use std::fs;

/// Result of comparing two profiles
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub unit: String,
    pub baseline_total: f64,
    pub target_total: f64,
    /// Frames ordered by absolute change, the root excluded
    pub frames: Vec<FrameComparison>,
}

impl DiffReport {
    pub fn delta(&self) -> f64 {
        self.target_total - self.baseline_total
    }

    pub fn percent_change(&self) -> Option<f64> {
        (self.baseline_total > 0.0).then(|| self.delta() / self.baseline_total * 100.0)
    }
}

/// Compare two profiles frame by frame
pub fn generate_diff(baseline: &Profile, target: &Profile) -> Result<DiffReport> {
    let baseline_tree = aggregate(&build_collapsed_stacks(&baseline.resources))
        .context("Failed to aggregate baseline stacks")?;
    let target_tree = aggregate(&build_collapsed_stacks(&target.resources))
        .context("Failed to aggregate target stacks")?;

    let frames = compare_trees(&baseline_tree, &target_tree)
        .into_iter()
        .filter(|frame| frame.depth > 0)
        .collect();

    Ok(DiffReport {
        unit: target.unit().to_string(),
        baseline_total: baseline_tree.total_weight(),
        target_total: target_tree.total_weight(),
        frames,
    })
}

/// Execute the diff command
pub fn execute_diff(args: DiffArgs) -> Result<DiffReport> {
    // Step 1: Load profiles
    let baseline = read_profile(&args.baseline).context("Failed to read baseline profile")?;
    let target = read_profile(&args.target).context("Failed to read target profile")?;

    // Step 2: Compare independent aggregations
    let report = generate_diff(&baseline, &target).context("Failed to generate diff")?;

    // Step 3: Differential flamegraph
    if let Some(svg_path) = &args.output_svg {
        let config = args
            .flamegraph_config
            .clone()
            .unwrap_or_default()
            .with_unit(target.unit());
        let svg = generate_diff_flamegraph(
            &build_collapsed_stacks(&baseline.resources),
            &build_collapsed_stacks(&target.resources),
            Some(&config),
        )
        .context("Failed to generate diff flamegraph")?;
        write_svg(&svg, svg_path).context("Failed to write diff flamegraph SVG")?;
        info!("✓ Diff flamegraph written to: {}", svg_path.display());
    }

    // Step 4: Write report if requested
    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).context("Failed to write diff report JSON")?;
        println!(
            "📊 Diff report written to {}",
            path.display().to_string().cyan()
        );
    }

    // Step 5: Terminal summary
    if args.summary {
        println!("{}", render_terminal_diff(&report, args.top));
    }

    Ok(report)
}

/// Render the report as a colored terminal table
pub fn render_terminal_diff(report: &DiffReport, top: usize) -> String {
    let unit = &report.unit;
    let mut lines = Vec::new();
    let rule = "━".repeat(80);

    lines.push(rule.clone());
    lines.push(format!("  {}", "PROFILE DIFF".bold()));
    lines.push(rule.clone());

    let change = match report.percent_change() {
        Some(pct) => format!("{:+.6} {} ({:+.2}%)", report.delta(), unit, pct),
        None => format!("{:+.6} {}", report.delta(), unit),
    };
    lines.push(format!(
        "  Total time: {:.6} {} -> {:.6} {}  {}",
        report.baseline_total,
        unit,
        report.target_total,
        unit,
        color_change(report.delta(), &change)
    ));
    lines.push(String::new());
    lines.push(format!(
        "  {:<40} {:>5} {:>14} {:>14} {:>10}",
        "Frame", "DEPTH", "BASELINE", "TARGET", "CHANGE"
    ));

    for frame in report.frames.iter().take(top) {
        let pct = match frame.percent_change() {
            Some(pct) => format!("{:+.1}%", pct),
            None => "NEW".to_string(),
        };
        lines.push(format!(
            "  {:<40} {:>5} {:>14.6} {:>14.6} {}",
            truncate(&frame.label, 40),
            frame.depth,
            frame.baseline_width,
            frame.target_width,
            color_change(frame.delta(), &format!("{:>10}", pct))
        ));
    }

    if report.frames.len() > top {
        lines.push(format!(
            "   (Showing top {} of {} changed frames)",
            top,
            report.frames.len()
        ));
    }
    lines.push(rule);

    lines.join("\n")
}

fn color_change(delta: f64, text: &str) -> String {
    if delta > 0.0 {
        text.red().to_string()
    } else if delta < 0.0 {
        text.green().to_string()
    } else {
        text.normal().to_string()
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
