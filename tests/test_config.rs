use filedrop::config::{Config, Limits};
use std::path::PathBuf;

#[test]
fn test_default_limits() {
    let limits = Limits::default();
    assert_eq!(limits.max_requests, 100);
    assert_eq!(limits.window_secs, 60);
    assert_eq!(limits.idle_ttl_secs, 3600);
    assert_eq!(limits.window().as_secs(), 60);
    assert_eq!(limits.idle_ttl().as_secs(), 3600);
}

#[test]
fn test_default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.listen_addr, "127.0.0.1:9999");
    assert_eq!(cfg.serve_root, PathBuf::from("."));
    assert_eq!(cfg.storage_root, PathBuf::from("./storage"));
    assert_eq!(cfg.timeout().as_secs(), 120);
}

#[test]
fn test_yaml_parsing_with_partial_keys() {
    let raw = "listen_addr: \"0.0.0.0:7000\"\nlimits:\n  max_requests: 5\n";
    let cfg: Config = serde_yaml::from_str(raw).unwrap();

    assert_eq!(cfg.listen_addr, "0.0.0.0:7000");
    assert_eq!(cfg.limits.max_requests, 5);
    // Unspecified keys fall back to defaults
    assert_eq!(cfg.limits.window_secs, 60);
    assert_eq!(cfg.timeout_secs, 120);
}

// Environment-variable behavior is covered in one test because the
// variables are process-global and tests run in parallel.
#[test]
fn test_load_env_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("filedrop.yaml");
    std::fs::write(
        &file,
        "listen_addr: \"10.0.0.1:1234\"\nstorage_root: \"/tmp/drop\"\n",
    )
    .unwrap();

    unsafe {
        std::env::set_var("FILEDROP_CONFIG", &file);
        std::env::remove_var("LISTEN");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.listen_addr, "10.0.0.1:1234");
    assert_eq!(cfg.storage_root, PathBuf::from("/tmp/drop"));

    unsafe {
        std::env::set_var("LISTEN", "127.0.0.1:4321");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.listen_addr, "127.0.0.1:4321");

    unsafe {
        std::env::set_var("FILEDROP_CONFIG", dir.path().join("absent.yaml"));
        std::env::remove_var("LISTEN");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.listen_addr, "127.0.0.1:9999");

    unsafe {
        std::env::remove_var("FILEDROP_CONFIG");
    }
}
