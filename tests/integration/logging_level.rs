// tests/integration/logging_level.rs

use tierdag::cli::LogLevel;
use tierdag::logging::resolve_level;
use tracing::Level;

#[test]
fn test_cli_level_wins_over_environment() {
    assert_eq!(resolve_level(Some(LogLevel::Debug), Some("error")), Level::DEBUG);
    assert_eq!(resolve_level(Some(LogLevel::Trace), None), Level::TRACE);
}

#[test]
fn test_environment_level_is_parsed_leniently() {
    assert_eq!(resolve_level(None, Some(" WARN ")), Level::WARN);
    assert_eq!(resolve_level(None, Some("warning")), Level::WARN);
    assert_eq!(resolve_level(None, Some("debug")), Level::DEBUG);
}

#[test]
fn test_missing_or_unknown_level_defaults_to_info() {
    assert_eq!(resolve_level(None, None), Level::INFO);
    assert_eq!(resolve_level(None, Some("chatty")), Level::INFO);
}
