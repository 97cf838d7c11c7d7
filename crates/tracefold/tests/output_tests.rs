use pretty_assertions::assert_eq;
use std::path::Path;
use tracefold::output::validate_path;
use tracefold::output::{profile_to_string, read_profile, write_profile, write_svg};
use tracefold::parser::schema::{Profile, Resource};
use tracefold::parser::to_profile;
use tempfile::NamedTempFile;

fn create_test_profile() -> Profile {
    let mut profile = to_profile(
        vec![
            Resource {
                amount: 0.75,
                uid: "app.py:main:1".parse().unwrap(),
                thread_id: "1".to_string(),
                kind: "time".to_string(),
                call_count: 1,
                trace: vec![],
                exceptions: vec![],
            },
            Resource {
                amount: 0.25,
                uid: "app.py:load:5".parse().unwrap(),
                thread_id: "1".to_string(),
                kind: "time".to_string(),
                call_count: 2,
                trace: vec!["app.py:main:1".parse().unwrap()],
                exceptions: vec!["KeyError".to_string()],
            },
        ],
        "python",
        "app.py",
    );
    profile.generated_at = "2024-01-01T00:00:00+00:00".to_string();
    profile
}

#[test]
fn test_write_and_read_profile() {
    let profile = create_test_profile();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    // Write
    write_profile(&profile, path).unwrap();

    // Read back
    let loaded = read_profile(path).unwrap();

    assert_eq!(loaded, profile);
}

#[test]
fn test_profile_json_layout() {
    let json = profile_to_string(&create_test_profile()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["version"], "1.0.0");
    assert_eq!(value["header"]["type"], "time");
    assert_eq!(value["header"]["units"]["time"], "s");
    assert_eq!(value["collector_info"]["name"], "python");
    assert_eq!(value["resources"][1]["ncalls"], 2);
    assert_eq!(value["resources"][1]["trace"][0]["function"], "main");
    assert!(json.contains('\n'));
}

#[test]
fn test_read_invalid_profile() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "{\"version\": 1}").unwrap();
    assert!(read_profile(temp_file.path()).is_err());
    assert!(read_profile("does/not/exist.json").is_err());
}

#[test]
fn test_validate_output_path_empty() {
    let result = validate_path(Path::new(""));
    assert!(result.is_err());
}

#[test]
fn test_validate_output_path_directory() {
    // Try to write to a directory path
    let temp_dir = tempfile::tempdir().unwrap();
    let result = validate_path(temp_dir.path());
    assert!(result.is_err());
}

#[test]
fn test_write_creates_parent_dirs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let nested_path = temp_dir.path().join("nested/dirs/profile.json");

    let profile = create_test_profile();
    write_profile(&profile, &nested_path).unwrap();

    assert!(nested_path.exists());
}

#[test]
fn test_svg_write_creates_parent_dirs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let nested_path = temp_dir.path().join("nested/dirs/flamegraph.svg");
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"></svg>"#;

    write_svg(svg, &nested_path).unwrap();

    assert_eq!(std::fs::read_to_string(&nested_path).unwrap(), svg);
}
