use crate::sync::paths::*;
use serial_test::serial;

#[test]
fn test_get_data_dir_ends_with_tams() {
    // Just verify the suffix (env vars are unreliable in parallel tests)
    let path = get_data_dir();
    assert!(path.ends_with("tams"));
}

#[test]
fn test_get_dump_dir_is_inside_data_dir() {
    let path = get_dump_dir();
    assert!(path.ends_with("tams/dumps"));
}

#[test]
fn test_get_db_path_ends_with_tams_db() {
    let path = get_db_path();
    assert!(path.ends_with("tams/tams.db"));
}

#[test]
fn test_get_config_path_ends_with_config_json() {
    let path = get_config_path();
    assert!(path.ends_with("tams/config.json"));
}

#[test]
#[serial]
fn test_xdg_data_home_is_respected() {
    let previous = std::env::var("XDG_DATA_HOME").ok();
    // SAFETY: serialized with the other env-mutating tests.
    unsafe { std::env::set_var("XDG_DATA_HOME", "/tmp/xdg-tams-test") };

    let path = get_data_dir();

    match previous {
        Some(value) => unsafe { std::env::set_var("XDG_DATA_HOME", value) },
        None => unsafe { std::env::remove_var("XDG_DATA_HOME") },
    }

    assert_eq!(path, std::path::PathBuf::from("/tmp/xdg-tams-test/tams"));
}
