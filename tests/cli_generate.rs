use predicates::str::contains;
use serde_json::Value;

mod util;
use util::{Sandbox, write_logo};

#[test]
fn generate_help_lists_payload_and_style_flags() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(contains("--ssid"))
        .stdout(contains("--shape"))
        .stdout(contains("--gradient"))
        .stdout(contains("--no-history"));
}

#[test]
fn generate_defaults_to_png_in_working_dir() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["generate", "url", "--url", "https://rust-lang.org"])
        .assert()
        .success()
        .stdout(contains("PNG exported to"));

    let bytes = std::fs::read(sb.work().join("qrcode.png")).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!(img.width(), 300);
    assert!(sb.history_file().exists(), "generation recorded in history");
}

#[test]
fn generate_infers_format_from_output_extension() {
    let sb = Sandbox::new();
    sb.cmd()
        .args([
            "generate", "wifi", "--ssid", "Home", "--password", "pw", "--shape", "dots", "-o",
            "out/net.svg",
        ])
        .assert()
        .success();
    let svg = std::fs::read_to_string(sb.work().join("out/net.svg")).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("<circle") || svg.contains("<path"));
}

#[test]
fn generate_pdf_document() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["generate", "sms", "--phone", "+15551234", "--message", "hi", "--format", "pdf"])
        .assert()
        .success();
    let pdf = std::fs::read(sb.work().join("qrcode.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("(QR Code)"));
    assert!(text.contains("(Generated with QRgo)"));
    assert!(text.trim_end().ends_with("%%EOF"));
}

#[test]
fn generate_json_reports_path_and_history_id() {
    let sb = Sandbox::new();
    let out = sb
        .cmd()
        .args(["--json", "generate", "email", "--to", "a@b.co", "--subject", "Hi there"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["format"], "png");
    assert_eq!(v["content"], "mailto:a@b.co?subject=Hi%20there&body=");
    assert!(v["history_id"].is_i64());
    assert!(v["modules"].as_u64().unwrap() >= 21);
}

#[test]
fn generate_no_history_leaves_store_untouched() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["generate", "url", "--url", "https://a.example", "--no-history"])
        .assert()
        .success();
    assert!(!sb.history_file().exists());
}

#[test]
fn generate_with_logo_forces_high_error_correction() {
    let sb = Sandbox::new();
    let logo = sb.work().join("logo.png");
    write_logo(&logo);

    sb.cmd()
        .args(["generate", "url", "--url", "https://a.example", "--ec", "L", "--logo"])
        .arg(&logo)
        .assert()
        .success();

    let out = sb
        .cmd()
        .args(["--json", "history", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let list: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(list[0]["has_logo"], true);
    let id = list[0]["id"].as_i64().unwrap();

    let out = sb
        .cmd()
        .args(["--json", "history", "show", &id.to_string()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let item: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(item["settings"]["errorCorrection"], "H");
    assert!(
        item["logoDataUrl"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
}

#[test]
fn generate_rejects_invalid_color() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["generate", "url", "--fg", "red"])
        .assert()
        .code(5)
        .stderr(contains("Invalid color"));
}

#[test]
fn generate_rejects_out_of_range_size() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["generate", "url", "--size", "5000"])
        .assert()
        .code(5)
        .stderr(contains("out of range"));
}

#[test]
fn generate_refuses_canvas_smaller_than_code() {
    let sb = Sandbox::new();
    let url = format!("https://a.example/{}", "x".repeat(1200));
    sb.cmd()
        .args(["generate", "url", "--url", &url, "--ec", "L", "--size", "100"])
        .assert()
        .code(4)
        .stderr(contains("too small"))
        .stderr(contains("Increase --size"));
    assert!(!sb.work().join("qrcode.png").exists());
}

#[test]
fn generate_rejects_unknown_extension() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["generate", "url", "-o", "code.gif"])
        .assert()
        .code(2)
        .stderr(contains("Cannot infer export format"));
}

#[test]
fn generate_json_error_is_structured() {
    let sb = Sandbox::new();
    let out = sb
        .cmd()
        .args(["--json", "generate", "url", "--bg", "#12"])
        .assert()
        .code(5)
        .get_output()
        .stderr
        .clone();
    let v: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["error"]["kind"], "validation");
    assert_eq!(v["error"]["code"], 5);
}

#[test]
fn generate_applies_config_defaults() {
    let sb = Sandbox::new();
    let config = sb.home().join("qrgo.toml");
    std::fs::write(&config, "[defaults]\nsize = 200\n").unwrap();

    sb.cmd()
        .arg("--config")
        .arg(&config)
        .args(["generate", "url", "--url", "https://a.example"])
        .assert()
        .success();
    let img = image::open(sb.work().join("qrcode.png")).unwrap();
    assert_eq!(img.width(), 200);
}

#[test]
fn invalid_config_fails_with_config_error() {
    let sb = Sandbox::new();
    let config = sb.home().join("qrgo.toml");
    std::fs::write(&config, "[defaults]\nlogo_size = 90\n").unwrap();

    sb.cmd()
        .arg("--config")
        .arg(&config)
        .args(["generate", "url"])
        .assert()
        .code(2)
        .stderr(contains("Validation error"));
}
