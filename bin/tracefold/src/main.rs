//! Tracefold CLI
//!
//! Rebuilds call stacks from function-level event logs and turns them into
//! profiles, flamegraphs and profile diffs.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::debug;
use std::path::PathBuf;

use tracefold::commands::{
    display_schema, display_version, execute_analyze, execute_diff, execute_flamegraph,
    validate_args, validate_profile_file, AnalyzeArgs, DiffArgs, FlamegraphArgs,
};
use tracefold::flamegraph::{FlamegraphConfig, Orientation};
use tracefold::parser::ParentStrategyKind;

/// Tracefold - call-stack reconstruction and flamegraphs for event traces
#[derive(Parser, Debug)]
#[command(name = "tracefold")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Flamegraph rendering options shared by several commands
#[derive(Args, Debug)]
struct RenderOptions {
    /// Render configuration file (TOML); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Flamegraph title
    #[arg(long)]
    title: Option<String>,

    /// Flamegraph width in pixels
    #[arg(long)]
    width: Option<f64>,

    /// Minimum visible frame width in pixels
    #[arg(long)]
    min_width: Option<f64>,

    /// Frame height in pixels
    #[arg(long)]
    frame_height: Option<f64>,

    /// Draw the root at the top (icicle graph)
    #[arg(long)]
    icicle: bool,
}

impl RenderOptions {
    fn into_config(self) -> Result<FlamegraphConfig> {
        let mut config = match &self.config {
            Some(path) => FlamegraphConfig::load(path)
                .with_context(|| format!("Failed to load render config {}", path.display()))?,
            None => FlamegraphConfig::new(),
        };

        if let Some(title) = self.title {
            config = config.with_title(title);
        }
        if let Some(width) = self.width {
            config = config.with_width(width);
        }
        if let Some(min_width) = self.min_width {
            config = config.with_min_width(min_width);
        }
        if let Some(frame_height) = self.frame_height {
            config = config.with_frame_height(frame_height);
        }
        if self.icicle {
            config = config.with_orientation(Orientation::Icicle);
        }

        config.validate().context("Invalid flamegraph options")?;
        debug!("Render config: {:?}", config);
        Ok(config)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze an event log into a profile and optional flamegraph
    Analyze {
        /// Event log written by the collector
        #[arg(short, long)]
        events: PathBuf,

        /// Output path for JSON profile
        #[arg(short, long, default_value = "profile.json")]
        output: PathBuf,

        /// Output path for SVG flamegraph
        #[arg(short, long, default_missing_value = "flamegraph.svg", num_args = 0..=1)]
        flamegraph: Option<PathBuf>,

        /// Parent thread inference: nearest or none
        #[arg(long, default_value = "nearest")]
        parent_strategy: ParentStrategyKind,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,

        /// Number of hot paths in the summary
        #[arg(long, default_value = "10")]
        top_paths: usize,

        /// Profiled command, recorded in the profile header
        #[arg(long, default_value = "")]
        cmd: String,

        /// Workload of the profiled command
        #[arg(long, default_value = "")]
        workload: String,

        #[command(flatten)]
        render: RenderOptions,
    },

    /// Render a flamegraph from an existing profile
    Flamegraph {
        /// Profile JSON file
        #[arg(short, long)]
        profile: PathBuf,

        /// Output path for SVG flamegraph
        #[arg(short, long, default_value = "flamegraph.svg")]
        output: PathBuf,

        #[command(flatten)]
        render: RenderOptions,
    },

    /// Compare two profiles
    Diff {
        /// Baseline profile JSON
        #[arg(short, long)]
        baseline: PathBuf,

        /// Target profile JSON
        #[arg(short, long)]
        target: PathBuf,

        /// Output path for the differential flamegraph SVG
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output path for the diff report JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print a summary table to stdout
        #[arg(long)]
        summary: bool,

        /// Rows in the summary table
        #[arg(long, default_value = "10")]
        top: usize,

        #[command(flatten)]
        render: RenderOptions,
    },

    /// Validate a profile JSON file
    Validate {
        /// Path to profile JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            events,
            output,
            flamegraph,
            parent_strategy,
            summary,
            top_paths,
            cmd,
            workload,
            render,
        } => {
            let args = AnalyzeArgs {
                events,
                output_json: output,
                output_svg: flamegraph,
                flamegraph_config: Some(render.into_config()?),
                parent_strategy,
                print_summary: summary,
                top_paths,
                cmd,
                workload,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Flamegraph {
            profile,
            output,
            render,
        } => {
            execute_flamegraph(FlamegraphArgs {
                profile,
                output_svg: output,
                flamegraph_config: Some(render.into_config()?),
            })?;
        }

        Commands::Diff {
            baseline,
            target,
            output,
            report,
            summary,
            top,
            render,
        } => {
            execute_diff(DiffArgs {
                baseline,
                target,
                summary,
                top,
                output: report,
                output_svg: output,
                flamegraph_config: Some(render.into_config()?),
            })?;
        }

        Commands::Validate { file } => {
            validate_profile_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
