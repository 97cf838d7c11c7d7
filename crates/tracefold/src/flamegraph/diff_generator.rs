//! SVG flamegraph generation for diffing two profiles.
//!
//! Frame widths follow the target profile. Colors follow the change:
//! - Red: Regression (Target > Baseline)
//! - Green: Improvement (Target < Baseline)
//! - Gray: No change

use super::generator::{render_svg, FlamegraphConfig};
use super::layout::layout;
use crate::aggregator::flow::aggregate_diff;
use crate::aggregator::stack_builder::CollapsedStack;
use crate::utils::error::FlamegraphError;
use log::info;

/// Relative change below which a frame counts as unchanged
const STABLE_THRESHOLD: f64 = 0.01;

/// Generate a comparison SVG flamegraph
///
/// **Public** - main entry point for differential rendering
///
/// # Arguments
/// * `baseline_stacks` - Collapsed stacks of the reference profile
/// * `target_stacks` - Collapsed stacks of the profile under test
/// * `config` - Render configuration, defaults if None
pub fn generate_diff_flamegraph(
    baseline_stacks: &[CollapsedStack],
    target_stacks: &[CollapsedStack],
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    info!(
        "Generating diff flamegraph (B:{} stacks, T:{} stacks)",
        baseline_stacks.len(),
        target_stacks.len()
    );

    let config = config.cloned().unwrap_or_default();
    let tree = aggregate_diff(baseline_stacks, target_stacks)?;
    let geometry = layout(&tree, tree.total_weight(), &config.layout_config())?;
    let max_delta = tree.max_abs_delta();

    let title = format!("{} (Diff)", config.title);
    let config = config.with_title(title);

    let svg = render_svg(&geometry, &config, |frame| {
        diff_color(frame.delta.unwrap_or(0.0), frame.weight, max_delta)
    });

    info!("Diff flamegraph generated successfully ({} bytes)", svg.len());
    Ok(svg)
}

/// Fill color for a frame of width `weight` that changed by `delta`
///
/// Intensity grows with the change relative to the largest change in the graph.
pub fn diff_color(delta: f64, weight: f64, max_delta: f64) -> String {
    let baseline = weight - delta;
    let relative = if baseline > 0.0 {
        delta / baseline
    } else if delta > 0.0 {
        1.0
    } else {
        0.0
    };

    if relative.abs() <= STABLE_THRESHOLD || max_delta <= 0.0 {
        return "rgb(240, 240, 240)".into();
    }

    let intensity = ((delta.abs() / max_delta).min(1.0) * 155.0) as u8;
    if delta > 0.0 {
        format!("rgb(255, {}, {})", 200 - intensity, 200 - intensity)
    } else {
        format!("rgb({}, 255, {})", 200 - intensity, 200 - intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_color() {
        assert_eq!(diff_color(0.0, 1.0, 2.0), "rgb(240, 240, 240)");
        assert_eq!(diff_color(2.0, 3.0, 2.0), "rgb(255, 45, 45)");
        assert_eq!(diff_color(-2.0, 1.0, 2.0), "rgb(45, 255, 45)");
        assert_eq!(diff_color(1.0, 1.0, 0.0), "rgb(240, 240, 240)");
    }
}
