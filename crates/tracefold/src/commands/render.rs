//! Flamegraph command implementation.
//! Renders an existing profile without re-reading the event log.

use super::models::FlamegraphArgs;
use crate::aggregator::{aggregate, build_collapsed_stacks};
use crate::flamegraph::generate_flamegraph;
use crate::output::{read_profile, write_svg};
use anyhow::{Context, Result};
use log::info;

/// Execute the flamegraph command
pub fn execute_flamegraph(args: FlamegraphArgs) -> Result<()> {
    let profile = read_profile(&args.profile)
        .with_context(|| format!("Failed to read profile {}", args.profile.display()))?;

    let stacks = build_collapsed_stacks(&profile.resources);
    let tree = aggregate(&stacks).context("Failed to aggregate stacks")?;

    // Tooltips follow the unit recorded in the profile
    let config = args
        .flamegraph_config
        .unwrap_or_default()
        .with_unit(profile.unit());

    let svg = generate_flamegraph(&tree, Some(&config)).context("Failed to generate flamegraph")?;
    write_svg(&svg, &args.output_svg).context("Failed to write flamegraph SVG")?;

    info!("✓ Flamegraph written to: {}", args.output_svg.display());
    Ok(())
}
