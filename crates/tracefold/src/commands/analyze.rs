//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Reads and parses the event log
//! 2. Reconstructs per-thread call stacks
//! 3. Extracts resources and writes the profile
//! 4. Builds collapsed stacks and aggregates them
//! 5. Renders the flamegraph and prints the summary when requested

use crate::aggregator::stack_builder::CollapsedStack;
use crate::aggregator::{
    aggregate, build_collapsed_stacks, calculate_hot_paths, calculate_time_distribution,
};
use crate::commands::models::AnalyzeArgs;
use crate::flamegraph::{generate_flamegraph, generate_text_summary};
use crate::output::{write_profile, write_svg};
use crate::parser::schema::Profile;
use crate::parser::{extract, read_event_log, to_profile, Reconstruction, Reconstructor};
use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, info};
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Analyze command arguments
///
/// # Returns
/// The written profile, or an error naming the step that failed
///
/// # Errors
/// * Unreadable or malformed event log
/// * Empty profile when a flamegraph is requested
/// * File write errors
pub fn execute_analyze(args: AnalyzeArgs) -> Result<Profile> {
    let start_time = Instant::now();
    info!("Analyzing event log: {}", args.events.display());

    let events = read_event_log(&args.events)
        .with_context(|| format!("Failed to parse event log {}", args.events.display()))?;

    info!(
        "Reconstructing call stacks ({} parent strategy)...",
        args.parent_strategy
    );
    let reconstruction = Reconstructor::new()
        .with_strategy(args.parent_strategy.build())
        .run(&events);

    let resources = extract(&reconstruction);
    debug!("Extracted {} resources", resources.len());

    let profile = to_profile(resources, &args.cmd, &args.workload);
    write_profile(&profile, &args.output_json).context("Failed to write profile JSON")?;
    info!("✓ Profile written to: {}", args.output_json.display());

    let stacks = build_collapsed_stacks(&profile.resources);

    if let Some(svg_path) = &args.output_svg {
        info!("Generating flamegraph...");
        let tree = aggregate(&stacks).context("Failed to aggregate stacks")?;
        let svg = generate_flamegraph(&tree, args.flamegraph_config.as_ref())
            .context("Failed to generate flamegraph")?;
        write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
        info!("✓ Flamegraph written to: {}", svg_path.display());
    }

    if args.print_summary {
        print_analysis_summary(&args, &profile, &reconstruction, &stacks);
    }

    info!(
        "Analysis completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(profile)
}

/// Print a human-readable profile summary to stdout.
///
/// **Private** - internal helper for execute_analyze
fn print_analysis_summary(
    args: &AnalyzeArgs,
    profile: &Profile,
    reconstruction: &Reconstruction,
    stacks: &[CollapsedStack],
) {
    let unit = profile.unit();
    let distribution = calculate_time_distribution(stacks);
    let hot_paths = calculate_hot_paths(stacks, args.top_paths);
    let rule = "━".repeat(80);

    println!("\n{}", rule);
    println!("  {}", "CALL PROFILE SUMMARY".bold());
    println!("{}", rule);
    println!("  Event log:       {}", args.events.display());
    if !profile.command().is_empty() {
        println!("  Command:         {}", profile.command());
    }
    println!(
        "  Total time:      {:>12.6} {}",
        profile.total_amount(),
        unit
    );
    println!("  Threads:         {}", reconstruction.thread_ids().count());
    println!("  Completed calls: {}", reconstruction.completed_count());
    println!("  Open calls:      {}", reconstruction.open_count());
    if reconstruction.unmatched_events() > 0 {
        println!(
            "  Unmatched exits: {}",
            reconstruction.unmatched_events().to_string().yellow()
        );
    }
    println!("  Unique paths:    {}", stacks.len());
    println!("  {}", distribution.summary(unit).dimmed());
    println!();
    println!(
        "{}",
        generate_text_summary(&hot_paths, args.top_paths, unit)
    );
    println!("{}\n", rule);
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.events.as_os_str().is_empty() {
        anyhow::bail!("Event log path cannot be empty");
    }

    if !args.events.is_file() {
        anyhow::bail!("Event log not found: {}", args.events.display());
    }

    if args.top_paths == 0 {
        anyhow::bail!("top_paths must be greater than 0");
    }

    if args.top_paths > 1000 {
        anyhow::bail!("top_paths is too large (max 1000)");
    }

    if let Some(config) = &args.flamegraph_config {
        config.validate().context("Invalid flamegraph options")?;
    }

    Ok(())
}
