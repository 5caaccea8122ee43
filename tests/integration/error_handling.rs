// tests/integration/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;
use tierdag::config::load_and_validate;
use tierdag::errors::TierdagError;

fn plan_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_plan_cycle_returns_structured_error() {
    let file = plan_file(
        r#"
[task.A]
cmd = "echo A"
after = ["B"]

[task.B]
cmd = "echo B"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(TierdagError::CycleDetected(path)) => {
            assert!(path.contains(&"A".to_string()));
            assert!(path.contains(&"B".to_string()));
            assert_eq!(path.first(), path.last());
        }
        Err(e) => panic!("Expected CycleDetected error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_dependency_returns_config_error() {
    let file = plan_file(
        r#"
[task.A]
cmd = "echo A"
after = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(TierdagError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_self_dependency_is_rejected() {
    let file = plan_file(
        r#"
[task.A]
cmd = "echo A"
after = ["A"]
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(TierdagError::SelfDependency(id)) if id == "A"
    ));
}

#[test]
fn test_invalid_global_config_is_rejected() {
    for (section, needle) in [
        ("workers = 0", "workers"),
        ("max_queue_size = 0", "max_queue_size"),
    ] {
        let file = plan_file(&format!(
            "[config]\n{section}\n\n[task.A]\ncmd = \"echo A\"\n"
        ));
        match load_and_validate(file.path()) {
            Err(TierdagError::ConfigError(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("Expected ConfigError for {section}, got: {other:?}"),
        }
    }
}

#[test]
fn test_empty_plan_and_bad_input() {
    let empty = plan_file("[config]\nworkers = 2\n");
    assert!(matches!(
        load_and_validate(empty.path()),
        Err(TierdagError::ConfigError(_))
    ));

    let bad_toml = plan_file("[task.A\ncmd = ");
    assert!(matches!(
        load_and_validate(bad_toml.path()),
        Err(TierdagError::TomlError(_))
    ));

    let unknown_tier = plan_file("[task.A]\ncmd = \"x\"\npriority = \"urgent\"\n");
    assert!(matches!(
        load_and_validate(unknown_tier.path()),
        Err(TierdagError::TomlError(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_and_validate(dir.path().join("missing.toml")),
        Err(TierdagError::IoError(_))
    ));
}
