use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracefold::commands::{
    execute_analyze, execute_diff, execute_flamegraph, validate_args, validate_profile_file,
    AnalyzeArgs, DiffArgs, FlamegraphArgs,
};
use tracefold::flamegraph::FlamegraphConfig;
use tracefold::output::read_profile;
use tracefold::parser::ParentStrategyKind;

const BASELINE_LOG: &str = "\
PY_START,app.py:main:1:1,0.0,
PY_START,app.py:parse:10:1,0.1,
PY_RETURN,app.py:parse:10:1,0.3,
PY_START,app.py:render:20:1,0.4,
PY_RETURN,app.py:render:20:1,0.6,
PY_RETURN,app.py:main:1:1,1.0,
";

const TARGET_LOG: &str = "\
PY_START,app.py:main:1:1,0.0,
PY_START,app.py:parse:10:1,0.1,
PY_RETURN,app.py:parse:10:1,0.9,
PY_START,app.py:render:20:1,1.0,
PY_UNWIND,app.py:render:20:1,1.1,ValueError
PY_RETURN,app.py:main:1:1,1.5,
";

fn write_log(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn analyze(dir: &TempDir, name: &str, log: &str) -> PathBuf {
    let events = write_log(dir.path(), &format!("{name}.log"), log);
    let output_json = dir.path().join(format!("{name}.json"));
    execute_analyze(AnalyzeArgs {
        events,
        output_json: output_json.clone(),
        ..Default::default()
    })
    .unwrap();
    output_json
}

#[test]
fn test_validate_args_valid() {
    let dir = tempfile::tempdir().unwrap();
    let args = AnalyzeArgs {
        events: write_log(dir.path(), "trace.log", BASELINE_LOG),
        ..Default::default()
    };

    assert!(validate_args(&args).is_ok());
}

#[test]
fn test_validate_args_missing_log() {
    let args = AnalyzeArgs {
        events: PathBuf::from("no/such/trace.log"),
        ..Default::default()
    };

    assert!(validate_args(&args).is_err());
}

#[test]
fn test_validate_args_top_paths_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let events = write_log(dir.path(), "trace.log", BASELINE_LOG);

    let zero = AnalyzeArgs {
        events: events.clone(),
        top_paths: 0,
        ..Default::default()
    };
    assert!(validate_args(&zero).is_err());

    let large = AnalyzeArgs {
        events,
        top_paths: 2000,
        ..Default::default()
    };
    assert!(validate_args(&large).is_err());
}

#[test]
fn test_validate_args_bad_render_config() {
    let dir = tempfile::tempdir().unwrap();
    let args = AnalyzeArgs {
        events: write_log(dir.path(), "trace.log", BASELINE_LOG),
        flamegraph_config: Some(FlamegraphConfig::new().with_width(10.0)),
        ..Default::default()
    };

    assert!(validate_args(&args).is_err());
}

#[test]
fn test_analyze_writes_profile_and_flamegraph() {
    let dir = tempfile::tempdir().unwrap();
    let events = write_log(dir.path(), "trace.log", TARGET_LOG);
    let output_json = dir.path().join("out/profile.json");
    let output_svg = dir.path().join("out/flamegraph.svg");

    let profile = execute_analyze(AnalyzeArgs {
        events,
        output_json: output_json.clone(),
        output_svg: Some(output_svg.clone()),
        parent_strategy: ParentStrategyKind::None,
        cmd: "python".to_string(),
        workload: "app.py".to_string(),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(profile.resources.len(), 3);
    assert!((profile.total_amount() - 1.5).abs() < 1e-9);

    let loaded = read_profile(&output_json).unwrap();
    assert_eq!(loaded.resources.len(), 3);
    assert_eq!(loaded.command(), "python app.py");

    let render = loaded
        .resources
        .iter()
        .find(|r| r.uid.function == "render")
        .unwrap();
    assert_eq!(render.exceptions, vec!["ValueError".to_string()]);

    let svg = std::fs::read_to_string(&output_svg).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("render"));
}

#[test]
fn test_analyze_rejects_malformed_log() {
    let dir = tempfile::tempdir().unwrap();
    let events = write_log(dir.path(), "bad.log", "PY_START,app.py:main:1:1,zero,\n");

    let result = execute_analyze(AnalyzeArgs {
        events,
        output_json: dir.path().join("profile.json"),
        ..Default::default()
    });

    assert!(result.is_err());
    assert!(!dir.path().join("profile.json").exists());
}

#[test]
fn test_flamegraph_from_profile() {
    let dir = tempfile::tempdir().unwrap();
    let profile = analyze(&dir, "baseline", BASELINE_LOG);
    let output_svg = dir.path().join("rendered.svg");

    execute_flamegraph(FlamegraphArgs {
        profile,
        output_svg: output_svg.clone(),
        flamegraph_config: Some(FlamegraphConfig::new().with_title("Baseline")),
    })
    .unwrap();

    let svg = std::fs::read_to_string(&output_svg).unwrap();
    assert!(svg.contains("Baseline"));
    assert!(svg.contains("parse"));
}

#[test]
fn test_diff_reports_changed_frames() {
    let dir = tempfile::tempdir().unwrap();
    let baseline = analyze(&dir, "baseline", BASELINE_LOG);
    let target = analyze(&dir, "target", TARGET_LOG);
    let report_path = dir.path().join("diff.json");
    let svg_path = dir.path().join("diff.svg");

    let report = execute_diff(DiffArgs {
        baseline,
        target,
        summary: false,
        output: Some(report_path.clone()),
        output_svg: Some(svg_path.clone()),
        ..Default::default()
    })
    .unwrap();

    assert!((report.baseline_total - 1.0).abs() < 1e-9);
    assert!((report.target_total - 1.5).abs() < 1e-9);

    // parse grew from 0.2s to 0.8s, the largest change
    let parse = &report.frames[0];
    assert_eq!(parse.label, "parse");
    assert!((parse.delta() - 0.6).abs() < 1e-9);

    assert!(report_path.exists());
    let svg = std::fs::read_to_string(&svg_path).unwrap();
    assert!(svg.contains("(Diff)"));
}

#[test]
fn test_validate_profile_file() {
    let dir = tempfile::tempdir().unwrap();
    let profile = analyze(&dir, "baseline", BASELINE_LOG);
    assert!(validate_profile_file(profile).is_ok());

    let bogus = write_log(dir.path(), "bogus.json", "[]");
    assert!(validate_profile_file(bogus).is_err());
}
