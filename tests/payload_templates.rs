use predicates::str::contains;
use qrgo::payload::{PayloadFields, PayloadKind, build_payload};
use qrgo::{Commands, parse_cli};
use serial_test::serial;

mod util;
use util::{EnvGuard, Sandbox};

#[test]
fn payload_prints_wifi_template() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["payload", "wifi", "--ssid", "Cafe", "--password", "latte", "--hidden"])
        .assert()
        .success()
        .stdout("WIFI:T:WPA;S:Cafe;P:latte;H:true;;\n");
}

#[test]
fn payload_prints_vcard_lines() {
    let sb = Sandbox::new();
    sb.cmd()
        .args([
            "payload", "vcard", "--name", "Ada Lovelace", "--org", "Engines", "--phone", "+44 1",
        ])
        .assert()
        .success()
        .stdout(contains("BEGIN:VCARD\nVERSION:3.0\nFN:Ada Lovelace\nORG:Engines\nTEL:+44 1\n"))
        .stdout(contains("END:VCARD"));
}

#[test]
fn payload_json_mode() {
    let sb = Sandbox::new();
    let out = sb
        .cmd()
        .args(["--json", "payload", "sms", "--phone", "123", "--message", "on my way"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["type"], "sms");
    assert_eq!(v["payload"], "sms:123?body=on%20my%20way");
}

#[test]
fn payload_rejects_unknown_kind() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["payload", "fax"])
        .assert()
        .code(2)
        .stderr(contains("Unknown payload type"));
}

#[test]
fn event_template_compacts_datetimes() {
    let fields = PayloadFields {
        title: Some("Launch".into()),
        location: Some("HQ".into()),
        start: Some("2024-05-01T10:00".into()),
        end: Some("2024-05-01T11:30".into()),
        description: Some("Cake".into()),
        ..Default::default()
    };
    assert_eq!(
        build_payload(PayloadKind::Event, &fields),
        "BEGIN:VEVENT\nSUMMARY:Launch\nLOCATION:HQ\nDTSTART:20240501T100000\n\
         DTEND:20240501T113000\nDESCRIPTION:Cake\nEND:VEVENT"
    );
}

#[test]
fn empty_url_falls_back() {
    assert_eq!(
        build_payload(PayloadKind::Url, &PayloadFields::default()),
        "https://example.com"
    );
}

#[test]
#[serial]
fn data_dir_comes_from_environment() {
    let _guard = EnvGuard::set("QRGO_DATA_DIR", "/tmp/qrgo-env-data");
    let parsed = parse_cli(["qrgo", "history", "list"]).unwrap();
    assert_eq!(
        parsed.cli.data_dir.as_deref(),
        Some(std::path::Path::new("/tmp/qrgo-env-data"))
    );
    assert!(matches!(parsed.cli.command, Some(Commands::History { .. })));
}

#[test]
#[serial]
fn data_dir_flag_overrides_environment() {
    let _guard = EnvGuard::set("QRGO_DATA_DIR", "/tmp/qrgo-env-data");
    let parsed = parse_cli(["qrgo", "--data-dir", "/tmp/flag", "history", "list"]).unwrap();
    assert_eq!(
        parsed.cli.data_dir.as_deref(),
        Some(std::path::Path::new("/tmp/flag"))
    );
}

#[test]
#[serial]
fn usage_errors_map_to_exit_code_two() {
    let _guard = EnvGuard::unset("QRGO_DATA_DIR");
    let err = parse_cli(["qrgo", "generate", "url", "--shape", "hexagon"]).unwrap_err();
    assert_eq!(err.code, 2);
    assert_eq!(err.kind, "usage");
    assert!(err.message.contains("hexagon"));
}
