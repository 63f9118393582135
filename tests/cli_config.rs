use predicates::str::contains;
use serde_json::Value;

mod util;
use util::Sandbox;

#[test]
fn config_show_prints_effective_toml() {
    let sb = Sandbox::new();
    let config = sb.home().join("qrgo.toml");
    std::fs::write(
        &config,
        "[defaults]\nsize = 640\n\n[live]\nrender_debounce_ms = 250\n",
    )
    .unwrap();

    sb.cmd()
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("[live]"))
        .stdout(contains("render_debounce_ms = 250"))
        .stdout(contains("size = 640"))
        .stdout(contains("# history:"));
}

#[test]
fn config_show_json_includes_resolved_settings() {
    let sb = Sandbox::new();
    let out = sb
        .cmd()
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["config"]["live"]["render_debounce_ms"], 500);
    assert_eq!(v["settings"]["size"], 300);
    assert!(v["data_dir"].as_str().is_some());
}

#[test]
fn config_path_reports_explicit_file() {
    let sb = Sandbox::new();
    let config = sb.home().join("custom.toml");

    let out = sb
        .cmd()
        .arg("--config")
        .arg(&config)
        .args(["--json", "config", "path"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["path"], config.display().to_string());
    assert_eq!(v["exists"], false);

    sb.cmd()
        .arg("--config")
        .arg(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(contains("custom.toml"));
}
