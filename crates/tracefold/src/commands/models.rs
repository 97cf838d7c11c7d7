use crate::flamegraph::FlamegraphConfig;
use crate::parser::ParentStrategyKind;
use crate::utils::config::DEFAULT_TOP_PATHS;
use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Event log written by the collector
    pub events: PathBuf,

    /// Output path for JSON profile
    pub output_json: PathBuf,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Flamegraph configuration
    pub flamegraph_config: Option<FlamegraphConfig>,

    /// How the parent of a newly seen thread is inferred
    pub parent_strategy: ParentStrategyKind,

    /// Print text summary to stdout
    pub print_summary: bool,

    /// Number of hot paths in the summary
    pub top_paths: usize,

    /// Profiled command, recorded in the profile header
    pub cmd: String,

    /// Workload of the profiled command, recorded in the profile header
    pub workload: String,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            events: PathBuf::new(),
            output_json: PathBuf::from("profile.json"),
            output_svg: None,
            flamegraph_config: None,
            parent_strategy: ParentStrategyKind::default(),
            print_summary: false,
            top_paths: DEFAULT_TOP_PATHS,
            cmd: String::new(),
            workload: String::new(),
        }
    }
}

/// Arguments for the flamegraph command
#[derive(Debug, Clone)]
pub struct FlamegraphArgs {
    /// Profile JSON written by analyze
    pub profile: PathBuf,

    /// Output path for the SVG flamegraph
    pub output_svg: PathBuf,

    pub flamegraph_config: Option<FlamegraphConfig>,
}

/// Arguments for the diff command
#[derive(Debug, Clone)]
pub struct DiffArgs {
    /// Path to the baseline profile JSON
    pub baseline: PathBuf,

    /// Path to the target profile JSON
    pub target: PathBuf,

    /// Print a human-readable summary to the terminal
    pub summary: bool,

    /// Rows in the terminal summary
    pub top: usize,

    /// Path to write the diff report JSON
    pub output: Option<PathBuf>,

    /// Path to write the visual diff flamegraph SVG
    pub output_svg: Option<PathBuf>,

    pub flamegraph_config: Option<FlamegraphConfig>,
}

impl Default for DiffArgs {
    fn default() -> Self {
        Self {
            baseline: PathBuf::new(),
            target: PathBuf::new(),
            summary: true,
            top: DEFAULT_TOP_PATHS,
            output: None,
            output_svg: None,
            flamegraph_config: None,
        }
    }
}
