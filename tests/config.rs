use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;

use dayflow::config::AppConfig;
use dayflow::time::time_to_minutes;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dayflow-config-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn missing_path_uses_defaults() {
    let config = AppConfig::load_or_default(None).expect("defaults load");
    assert_eq!(config, AppConfig::default());
    config.validate().expect("defaults are valid");
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let path = write_temp(
        "partial.json",
        r#"{"builder":{"day_start":"06:30","fill_gaps":true},"session":{"debounce_ms":250}}"#,
    );
    let config = AppConfig::load(&path).expect("config loads");

    assert_eq!(
        config.builder.day_start,
        time_to_minutes("06:30").expect("valid time")
    );
    assert!(config.builder.fill_gaps);
    assert_eq!(config.builder.work_chunk, 90);
    assert_eq!(config.session.debounce_ms, 250);
    assert_eq!(config.editor.snap_step, 5);
}

#[test]
fn mismatched_hour_heights_are_rejected() {
    let path = write_temp(
        "mismatch.json",
        r#"{"layout":{"hour_height":80.0},"editor":{"hour_height":60.0}}"#,
    );
    let err = AppConfig::load(&path).unwrap_err();
    assert!(
        format!("{err:#}").contains("hour_height"),
        "unexpected error: {err:?}"
    );
}

#[test]
fn invalid_section_values_name_the_section() {
    let path = write_temp("bad-editor.json", r#"{"editor":{"snap_step":0}}"#);
    let err = AppConfig::load(&path).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("[editor]"), "unexpected error: {message}");
    assert!(message.contains("snap_step"), "unexpected error: {message}");
}

#[test]
fn unreadable_config_is_an_error() {
    let missing = std::env::temp_dir().join("dayflow-config-does-not-exist.json");
    assert!(AppConfig::load(&missing).is_err());
}
