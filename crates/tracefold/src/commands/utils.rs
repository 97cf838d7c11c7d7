use crate::output::read_profile;
use crate::utils::config::{EVENT_KIND_TOKENS, SCHEMA_VERSION};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Validate a profile JSON file
pub fn validate_profile_file(file_path: PathBuf) -> Result<()> {
    println!("Validating profile: {}", file_path.display());

    let profile = read_profile(&file_path)
        .with_context(|| format!("{} is not a valid profile", file_path.display()))?;

    if let Some(bad) = profile
        .resources
        .iter()
        .find(|r| !r.amount.is_finite() || r.amount < 0.0)
    {
        anyhow::bail!(
            "Resource {} on thread {} has invalid amount {}",
            bad.uid,
            bad.thread_id,
            bad.amount
        );
    }

    let threads: BTreeSet<&str> = profile
        .resources
        .iter()
        .map(|r| r.thread_id.as_str())
        .collect();

    println!("✓ Valid profile JSON");
    println!("  Version: {}", profile.version);
    println!("  Generated: {}", profile.generated_at);
    println!("  Collector: {}", profile.collector_info.name);
    println!("  Resources: {}", profile.resources.len());
    println!("  Threads: {}", threads.len());
    println!(
        "  Total {}: {:.6} {}",
        profile.header.kind,
        profile.total_amount(),
        profile.unit()
    );

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Tracefold Profile Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Event Log (input, one event per line):");
        println!("  kind,source:function:line:thread_id,timestamp[,exception]");
        println!("  kinds: {}", EVENT_KIND_TOKENS.join(", "));
        println!();
        println!("Schema Structure:");
        println!("  version: string          - Schema version (e.g., '1.0.0')");
        println!("  header: object           - What was measured");
        println!("    type: string           - Resource type ('time')");
        println!("    units: object          - Unit per resource type");
        println!("    cmd: string            - Profiled command");
        println!("    workload: string       - Workload of the command");
        println!("  collector_info: object   - Collector name and parameters");
        println!("  generated_at: string     - ISO 8601 timestamp");
        println!("  resources: array         - One record per completed call");
        println!("    amount: number         - Exclusive time");
        println!("    uid: object            - source, function, line");
        println!("    tid: string            - Thread id");
        println!("    type: string           - Resource type");
        println!("    ncalls: number         - Calls of the function name");
        println!("    trace: array           - Callers on the stack, oldest first");
        println!("    exceptions: array      - Exceptions raised in the call");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Tracefold v{}", env!("CARGO_PKG_VERSION"));
    println!("Profile Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Call-stack reconstruction and flamegraphs for function-level event traces.");
}
